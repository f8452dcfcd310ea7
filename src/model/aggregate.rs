//! Aggregate counters for the history view.

use serde::Serialize;

use super::TaskRecord;

/// Totals over a loaded task log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    pub count: usize,
    pub total_duration_secs: u64,
}

impl Aggregate {
    /// Counts records and sums their durations. Records without audio
    /// carry a zero duration and add only to the count.
    pub fn of(records: &[TaskRecord]) -> Self {
        records.iter().fold(Self::default(), |acc, r| Self {
            count: acc.count + 1,
            total_duration_secs: acc.total_duration_secs.saturating_add(r.duration_sec),
        })
    }
}
