//! Task records: immutable entries in the task log.
//!
//! Each record is one completed task. Records are built through the
//! constructors here, which enforce the per-type submission rules. The log
//! restamps a record when it is appended, so the stored time is the moment
//! of submission. Once appended, a record is never edited.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::Recording;

/// Why a task could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("not confirmed: {}", .0.join(", "))]
    Unconfirmed(Vec<&'static str>),
}

/// The task-specific part of a record.
///
/// Serialized flat into the record with a `task_type` tag, so each log entry
/// is self-describing when read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum Task {
    /// The user read a passage aloud.
    TextReading {
        #[serde(rename = "text")]
        source_text: String,
        audio_path: String,
    },

    /// The user described a remote image aloud.
    ImageDescription { image_url: String, audio_path: String },

    /// The user took a photo and described it in writing,
    /// optionally with a spoken description as well.
    PhotoCapture {
        image_path: String,
        description: String,
        audio_path: Option<String>,
    },
}

impl Task {
    /// Human-readable task name, e.g. "Text reading".
    pub fn label(&self) -> &'static str {
        match self {
            Self::TextReading { .. } => "Text reading",
            Self::ImageDescription { .. } => "Image description",
            Self::PhotoCapture { .. } => "Photo capture",
        }
    }
}

/// One completed task as stored in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(flatten)]
    pub task: Task,

    /// Seconds of audio recorded; 0 when the task carries no audio.
    #[serde(default)]
    pub duration_sec: u64,

    /// When the record was created, as epoch milliseconds on disk.
    #[serde(with = "epoch_millis")]
    pub timestamp: Timestamp,
}

/// The reader's self-checks required before a text reading is submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadingChecks {
    pub no_background_noise: bool,
    pub no_mistakes: bool,
    pub no_errors: bool,
}

impl ReadingChecks {
    pub const ALL: Self = Self {
        no_background_noise: true,
        no_mistakes: true,
        no_errors: true,
    };

    fn unconfirmed(self) -> Vec<&'static str> {
        [
            (self.no_background_noise, "no background noise"),
            (self.no_mistakes, "no mistakes while reading"),
            (self.no_errors, "no errors in between"),
        ]
        .into_iter()
        .filter_map(|(checked, name)| (!checked).then_some(name))
        .collect()
    }
}

impl TaskRecord {
    /// Builds a text-reading record. Every reading check must be confirmed.
    pub fn text_reading(
        source_text: impl Into<String>,
        recording: &Recording,
        checks: ReadingChecks,
    ) -> Result<Self, RecordError> {
        let missing = checks.unconfirmed();
        if !missing.is_empty() {
            return Err(RecordError::Unconfirmed(missing));
        }
        let audio_path = require("audio path", recording.audio_path())?;
        Ok(Self::stamped(
            Task::TextReading {
                source_text: source_text.into(),
                audio_path,
            },
            recording.duration_secs(),
        ))
    }

    /// Builds an image-description record.
    pub fn image_description(
        image_url: impl Into<String>,
        recording: &Recording,
    ) -> Result<Self, RecordError> {
        let image_url = require("image URL", image_url.into())?;
        let audio_path = require("audio path", recording.audio_path())?;
        Ok(Self::stamped(
            Task::ImageDescription {
                image_url,
                audio_path,
            },
            recording.duration_secs(),
        ))
    }

    /// Builds a photo-capture record.
    ///
    /// The description is trimmed before storing. Without a recording the
    /// audio path is null and the duration is 0.
    pub fn photo_capture(
        image_path: impl Into<String>,
        description: &str,
        recording: Option<&Recording>,
    ) -> Result<Self, RecordError> {
        let image_path = require("image path", image_path.into())?;
        let description = require("description", description.trim().to_string())?;
        let (audio_path, duration_sec) = match recording {
            Some(r) => (Some(require("audio path", r.audio_path())?), r.duration_secs()),
            None => (None, 0),
        };
        Ok(Self::stamped(
            Task::PhotoCapture {
                image_path,
                description,
                audio_path,
            },
            duration_sec,
        ))
    }

    pub fn audio_path(&self) -> Option<&str> {
        match &self.task {
            Task::TextReading { audio_path, .. } | Task::ImageDescription { audio_path, .. } => {
                Some(audio_path)
            }
            Task::PhotoCapture { audio_path, .. } => audio_path.as_deref(),
        }
    }

    pub fn image_path(&self) -> Option<&str> {
        match &self.task {
            Task::PhotoCapture { image_path, .. } => Some(image_path),
            _ => None,
        }
    }

    /// The same record stamped with the current time.
    pub fn restamped(self) -> Self {
        Self {
            timestamp: now_millis(),
            ..self
        }
    }

    fn stamped(task: Task, duration_sec: u64) -> Self {
        Self {
            task,
            duration_sec,
            timestamp: now_millis(),
        }
    }
}

/// The current time at the precision the log keeps.
fn now_millis() -> Timestamp {
    let now = Timestamp::now();
    Timestamp::from_millisecond(now.as_millisecond()).unwrap_or(now)
}

/// Timestamps are stored as integer epoch milliseconds.
mod epoch_millis {
    use jiff::Timestamp;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub(super) fn serialize<S: Serializer>(ts: &Timestamp, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(ts.as_millisecond())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Timestamp, D::Error> {
        let millis = i64::deserialize(d)?;
        Timestamp::from_millisecond(millis).map_err(D::Error::custom)
    }
}

fn require(field: &'static str, value: String) -> Result<String, RecordError> {
    if value.is_empty() {
        Err(RecordError::MissingField(field))
    } else {
        Ok(value)
    }
}
