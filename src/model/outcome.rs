//! Duration policy: classifying how long a recording ran.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a finished recording's length compares to the accepted window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationOutcome {
    /// Shorter than the minimum.
    TooShort,

    /// Longer than the maximum.
    TooLong,

    /// Within bounds, both ends inclusive.
    Acceptable,
}

impl DurationOutcome {
    pub fn is_acceptable(self) -> bool {
        self == Self::Acceptable
    }
}

/// Inclusive bounds on a recording's length, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationPolicy {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DurationPolicy {
    pub const MIN_SECS: u64 = 10;
    pub const MAX_SECS: u64 = 20;

    /// Classifies an elapsed time. Only strict comparisons reject, so
    /// exactly `min_secs` and exactly `max_secs` are acceptable.
    pub fn classify(&self, elapsed_secs: u64) -> DurationOutcome {
        if elapsed_secs < self.min_secs {
            DurationOutcome::TooShort
        } else if elapsed_secs > self.max_secs {
            DurationOutcome::TooLong
        } else {
            DurationOutcome::Acceptable
        }
    }

    /// The corrective message shown for a rejected outcome.
    pub fn message(&self, outcome: DurationOutcome) -> Option<String> {
        match outcome {
            DurationOutcome::TooShort => {
                Some(format!("Recording too short (min {}s)", self.min_secs))
            }
            DurationOutcome::TooLong => {
                Some(format!("Recording too long (max {}s)", self.max_secs))
            }
            DurationOutcome::Acceptable => None,
        }
    }
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self {
            min_secs: Self::MIN_SECS,
            max_secs: Self::MAX_SECS,
        }
    }
}

impl fmt::Display for DurationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TooShort => "too short",
            Self::TooLong => "too long",
            Self::Acceptable => "acceptable",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_minimum_is_too_short() {
        let policy = DurationPolicy::default();
        for secs in 0..=9 {
            assert_eq!(policy.classify(secs), DurationOutcome::TooShort, "{secs}s");
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        let policy = DurationPolicy::default();
        assert_eq!(policy.classify(10), DurationOutcome::Acceptable);
        assert_eq!(policy.classify(20), DurationOutcome::Acceptable);
        for secs in 11..=19 {
            assert_eq!(policy.classify(secs), DurationOutcome::Acceptable, "{secs}s");
        }
    }

    #[test]
    fn above_maximum_is_too_long() {
        let policy = DurationPolicy::default();
        assert_eq!(policy.classify(21), DurationOutcome::TooLong);
        assert_eq!(policy.classify(3_600), DurationOutcome::TooLong);
    }

    #[test]
    fn messages_name_the_violated_bound() {
        let policy = DurationPolicy::default();
        assert_eq!(
            policy.message(DurationOutcome::TooShort).as_deref(),
            Some("Recording too short (min 10s)")
        );
        assert_eq!(
            policy.message(DurationOutcome::TooLong).as_deref(),
            Some("Recording too long (max 20s)")
        );
        assert!(policy.message(DurationOutcome::Acceptable).is_none());
    }
}
