//! Core data model for taskcap.
//!
//! Task records and their payloads, the duration policy that gates
//! recordings, and the aggregate counters shown in history.

mod aggregate;
mod outcome;
mod record;
mod recording;

pub use aggregate::Aggregate;
pub use outcome::{DurationOutcome, DurationPolicy};
pub use record::{ReadingChecks, RecordError, Task, TaskRecord};
pub use recording::Recording;
