//! Local persistence for the task log.
//!
//! The whole log is a single JSON array, oldest record first:
//!
//! ```text
//! <root>/
//!   tasks.json                  # Append-only task log
//!   tasks.json.corrupt-<millis> # Unparseable logs moved aside on append
//!   media/                      # Recordings (see `session`)
//! ```
//!
//! Appending reads the whole array, pushes one record, and writes the whole
//! array back through a temp file that is renamed into place. Each append is
//! O(N) in the size of the log. Reads never fail: a missing or unreadable log
//! is an empty one.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use jiff::Timestamp;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::model::TaskRecord;

const LOG_FILE: &str = "tasks.json";

/// Errors that can occur while appending to the log.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// The append-only task log.
pub struct TaskLog {
    path: PathBuf,
    // Serializes the read-modify-write in `append`.
    append_lock: Mutex<()>,
}

impl TaskLog {
    /// Opens the log under `root`, creating the directory if needed.
    ///
    /// The log file itself is created on first append.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        Ok(Self {
            path: root.join(LOG_FILE),
            append_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a record as the newest entry and returns it as stored.
    ///
    /// The record is stamped with the append time. Existing entries are
    /// written back exactly as read, including any that no longer decode as
    /// records. A log that can't be parsed at all is moved aside and the new
    /// record starts a fresh one.
    pub fn append(&self, record: TaskRecord) -> Result<TaskRecord> {
        let _guard = self
            .append_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let record = record.restamped();
        let mut entries = self.read_for_append()?;
        entries.push(serde_json::to_value(&record)?);
        self.replace(&entries)?;

        log::debug!(
            "appended {} record ({} total, audio {:?}) to {}",
            record.task.label(),
            entries.len(),
            record.audio_path(),
            self.path.display()
        );
        Ok(record)
    }

    /// Loads every record, oldest first.
    ///
    /// Never fails: problems are logged and the affected entries, or the whole
    /// log, are treated as absent.
    pub fn load_all(&self) -> Vec<TaskRecord> {
        let contents = match fs::read(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("failed to read {}: {e}", self.path.display());
                return Vec::new();
            }
        };
        let entries: Vec<Value> = match serde_json::from_slice(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("ignoring unparseable log {}: {e}", self.path.display());
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .enumerate()
            .filter_map(|(i, entry)| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("skipping malformed entry {i} in {}: {e}", self.path.display());
                    None
                }
            })
            .collect()
    }

    /// Loads every record, newest first.
    pub fn load_recent(&self) -> Vec<TaskRecord> {
        let mut records = self.load_all();
        records.reverse();
        records
    }

    fn read_for_append(&self) -> Result<Vec<Value>> {
        // Bytes, not a string: invalid UTF-8 is corruption like any other.
        let contents = match fs::read(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&contents) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                let aside = self.path.with_file_name(format!(
                    "{LOG_FILE}.corrupt-{}",
                    Timestamp::now().as_millisecond()
                ));
                fs::rename(&self.path, &aside)?;
                log::warn!(
                    "unparseable log ({e}); moved to {} and starting fresh",
                    aside.display()
                );
                Ok(Vec::new())
            }
        }
    }

    /// Writes the full log to a temp file beside it and renames it over the log.
    fn replace(&self, entries: &[Value]) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec(entries)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{sync::Arc, thread};

    use tempfile::TempDir;

    use crate::model::{Aggregate, Task};

    fn test_log() -> (TempDir, TaskLog) {
        let dir = TempDir::new().unwrap();
        let log = TaskLog::open(dir.path().join("data")).unwrap();
        (dir, log)
    }

    fn reading(duration_sec: u64, millis: i64) -> TaskRecord {
        TaskRecord {
            task: Task::TextReading {
                source_text: format!("Passage {millis}"),
                audio_path: format!("/data/media/audio_{millis}.m4a"),
            },
            duration_sec,
            timestamp: Timestamp::from_millisecond(millis).unwrap(),
        }
    }

    fn photo(millis: i64) -> TaskRecord {
        TaskRecord {
            task: Task::PhotoCapture {
                image_path: format!("/data/photo_{millis}.jpg"),
                description: "A red door".into(),
                audio_path: None,
            },
            duration_sec: 0,
            timestamp: Timestamp::from_millisecond(millis).unwrap(),
        }
    }

    #[test]
    fn load_missing_log_is_empty() {
        let (_dir, log) = test_log();
        assert!(log.load_all().is_empty());
        assert!(!log.path().exists());
    }

    #[test]
    fn load_garbage_log_is_empty() {
        let (_dir, log) = test_log();
        fs::write(log.path(), "{not json").unwrap();
        assert!(log.load_all().is_empty());

        fs::write(log.path(), r#"{"task_type":"text_reading"}"#).unwrap();
        assert!(log.load_all().is_empty());
    }

    #[test]
    fn append_and_load_preserve_order() {
        let (_dir, log) = test_log();
        let stored: Vec<_> = [reading(12, 1_000), photo(2_000), reading(15, 3_000)]
            .into_iter()
            .map(|r| log.append(r).unwrap())
            .collect();

        let loaded = log.load_all();
        assert_eq!(loaded, stored);
        assert_eq!(
            Aggregate::of(&loaded),
            Aggregate {
                count: 3,
                total_duration_secs: 27,
            }
        );
    }

    #[test]
    fn load_recent_is_newest_first() {
        let (_dir, log) = test_log();
        log.append(reading(12, 1_000)).unwrap();
        log.append(photo(2_000)).unwrap();

        let recent = log.load_recent();
        assert!(matches!(recent[0].task, Task::PhotoCapture { .. }));
        assert!(matches!(recent[1].task, Task::TextReading { .. }));
    }

    #[test]
    fn append_never_touches_earlier_entries() {
        let (_dir, log) = test_log();
        log.append(reading(12, 1_000)).unwrap();
        let before = fs::read_to_string(log.path()).unwrap();

        log.append(photo(2_000)).unwrap();
        let after: Vec<Value> = serde_json::from_str(&fs::read_to_string(log.path()).unwrap()).unwrap();
        let earlier: Vec<Value> = serde_json::from_str(&before).unwrap();

        assert_eq!(after.len(), 2);
        assert_eq!(after[0], earlier[0]);
    }

    #[test]
    fn append_keeps_entries_it_cannot_decode() {
        let (_dir, log) = test_log();
        fs::write(log.path(), r#"[{"task_type":"voice_note","clip":"a.m4a"}]"#).unwrap();

        let stored = log.append(reading(12, 1_000)).unwrap();

        let raw: Vec<Value> = serde_json::from_str(&fs::read_to_string(log.path()).unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0]["task_type"], "voice_note");
        assert_eq!(log.load_all(), vec![stored]);
    }

    fn corrupt_copies(dir: &TempDir) -> Vec<String> {
        fs::read_dir(dir.path().join("data"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("tasks.json.corrupt-"))
            .collect()
    }

    #[test]
    fn append_to_corrupt_log_starts_fresh_and_keeps_copy() {
        let (dir, log) = test_log();
        fs::write(log.path(), "[{\"task_type\":").unwrap();

        let stored = log.append(photo(2_000)).unwrap();

        assert_eq!(log.load_all(), vec![stored]);
        assert_eq!(corrupt_copies(&dir).len(), 1);
    }

    #[test]
    fn append_to_non_utf8_log_starts_fresh_and_keeps_copy() {
        let (dir, log) = test_log();
        let garbage = [0xff, 0xfe, 0x00, 0x9f];
        fs::write(log.path(), garbage).unwrap();
        assert!(log.load_all().is_empty());

        let stored = log.append(photo(2_000)).unwrap();

        assert_eq!(log.load_all(), vec![stored]);
        let copies = corrupt_copies(&dir);
        assert_eq!(copies.len(), 1);
        assert_eq!(fs::read(dir.path().join("data").join(&copies[0])).unwrap(), garbage);
    }

    #[test]
    fn append_stamps_submission_time() {
        let (_dir, log) = test_log();
        let before = Timestamp::now().as_millisecond();

        let stored = log.append(reading(12, 1_000)).unwrap();

        assert!(stored.timestamp.as_millisecond() >= before);
        assert_eq!(log.load_all()[0].timestamp, stored.timestamp);
    }

    #[test]
    fn append_leaves_no_temp_files() {
        let (dir, log) = test_log();
        log.append(reading(12, 1_000)).unwrap();
        log.append(reading(13, 2_000)).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path().join("data"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![LOG_FILE]);
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let (_dir, log) = test_log();
        let log = Arc::new(log);

        let workers: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..5 {
                        log.append(reading(10, t * 100 + i)).unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        let loaded = log.load_all();
        assert_eq!(loaded.len(), 40);
        assert_eq!(Aggregate::of(&loaded).total_duration_secs, 400);
    }
}
