//! Accepted recordings: audio that passed the duration policy.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// A finished recording that is fit to attach to a task record.
///
/// Only produced by [`crate::session::SessionResult::accept`], so holding one
/// means the duration was acceptable and the file was finalized cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    path: PathBuf,
    duration_secs: u64,
}

impl Recording {
    pub(crate) fn new(path: PathBuf, duration_secs: u64) -> Self {
        Self {
            path,
            duration_secs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// The path as stored in a task record.
    pub fn audio_path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Deletes the media file, for when the user chooses to record again.
    ///
    /// A file that is already gone counts as discarded.
    pub fn discard(self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
