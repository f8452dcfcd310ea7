//! Ambient-noise check run before a task.
//!
//! Samples a meter a fixed number of times and judges the room by the last
//! reading. There is no real microphone metering yet; [`SimulatedMeter`]
//! produces random levels.

use std::{thread, time::Duration};

use rand::{Rng, rngs::ThreadRng};

/// A source of sound-level readings in decibels.
pub trait NoiseMeter {
    fn read_db(&mut self) -> u32;
}

/// Uniformly random readings between 20 and 65 dB.
pub struct SimulatedMeter<R: Rng = ThreadRng> {
    rng: R,
}

impl SimulatedMeter {
    pub fn new() -> Self {
        Self::with_rng(rand::thread_rng())
    }
}

impl Default for SimulatedMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> SimulatedMeter<R> {
    pub const MIN_DB: u32 = 20;
    pub const MAX_DB: u32 = 65;

    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> NoiseMeter for SimulatedMeter<R> {
    fn read_db(&mut self) -> u32 {
        self.rng.gen_range(Self::MIN_DB..=Self::MAX_DB)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseVerdict {
    Quiet,
    Noisy,
}

impl NoiseVerdict {
    pub fn message(self) -> &'static str {
        match self {
            Self::Quiet => "Good to proceed",
            Self::Noisy => "Please move to a quieter place",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseReport {
    pub final_db: u32,
    pub verdict: NoiseVerdict,
}

/// How to sample and judge.
#[derive(Debug, Clone, Copy)]
pub struct NoiseCheck {
    pub threshold_db: u32,
    pub samples: usize,
    pub interval: Duration,
}

impl NoiseCheck {
    pub fn new(threshold_db: u32) -> Self {
        Self {
            threshold_db,
            samples: 25,
            interval: Duration::from_millis(120),
        }
    }

    /// Anything strictly below the threshold is quiet.
    pub fn judge(&self, db: u32) -> NoiseVerdict {
        if db < self.threshold_db {
            NoiseVerdict::Quiet
        } else {
            NoiseVerdict::Noisy
        }
    }

    /// Takes `samples` readings, `interval` apart, passing each to
    /// `on_reading` for display, and judges the last one.
    pub fn run(&self, meter: &mut impl NoiseMeter, mut on_reading: impl FnMut(u32)) -> NoiseReport {
        let mut final_db = 0;
        for i in 0..self.samples.max(1) {
            if i > 0 {
                thread::sleep(self.interval);
            }
            final_db = meter.read_db();
            on_reading(final_db);
        }
        log::debug!("noise check finished at {final_db} dB");
        NoiseReport {
            final_db,
            verdict: self.judge(final_db),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{SeedableRng, rngs::StdRng};

    struct Scripted(Vec<u32>);

    impl NoiseMeter for Scripted {
        fn read_db(&mut self) -> u32 {
            self.0.remove(0)
        }
    }

    fn quick(threshold_db: u32, samples: usize) -> NoiseCheck {
        NoiseCheck {
            threshold_db,
            samples,
            interval: Duration::ZERO,
        }
    }

    #[test]
    fn threshold_is_exclusive() {
        let check = NoiseCheck::new(40);
        assert_eq!(check.judge(39), NoiseVerdict::Quiet);
        assert_eq!(check.judge(40), NoiseVerdict::Noisy);
    }

    #[test]
    fn verdict_uses_last_reading() {
        let mut meter = Scripted(vec![60, 55, 30]);
        let mut seen = Vec::new();

        let report = quick(40, 3).run(&mut meter, |db| seen.push(db));

        assert_eq!(seen, vec![60, 55, 30]);
        assert_eq!(
            report,
            NoiseReport {
                final_db: 30,
                verdict: NoiseVerdict::Quiet,
            }
        );
    }

    #[test]
    fn simulated_readings_stay_in_range() {
        let mut meter = SimulatedMeter::with_rng(StdRng::seed_from_u64(7));
        let mut count = 0;

        quick(40, 200).run(&mut meter, |db| {
            count += 1;
            assert!((20..=65).contains(&db));
        });

        assert_eq!(count, 200);
    }
}
