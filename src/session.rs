//! Recording sessions: one press-and-hold gesture turned into a classified clip.
//!
//! A session moves `Idle -> Active -> Ended`. [`SessionController::start_session`]
//! allocates a media path, starts the capture device, and returns a
//! [`SessionHandle`]; [`SessionController::end_session`] consumes that handle,
//! stops the device, and classifies the elapsed time against the
//! [`DurationPolicy`]. Only one session is active at a time, and the device's
//! capture token lives inside the controller for exactly that long.

mod clock;
mod device;

use std::{
    fs, io, mem,
    path::{Path, PathBuf},
    time::Instant,
};

use jiff::Timestamp;
use uuid::Uuid;

use crate::model::{DurationOutcome, DurationPolicy, Recording};

pub use clock::{Clock, SystemClock};
pub use device::{CaptureDevice, CaptureError, SystemDevice};

#[cfg(test)]
pub(crate) use clock::ManualClock;

/// Errors from starting or ending a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a recording session is already active")]
    AlreadyActive,

    #[error("session {0} is not the active session")]
    UnknownSession(Uuid),

    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
}

/// Where the controller is in the gesture lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active {
        started_at: Instant,
    },
    Ended {
        elapsed_secs: u64,
        outcome: DurationOutcome,
    },
}

/// Proof of an active session. Consumed by [`SessionController::end_session`].
#[derive(Debug)]
pub struct SessionHandle {
    id: Uuid,
    target_path: PathBuf,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }
}

/// What a finished session produced.
///
/// Always returned by `end_session`, even when the device failed to
/// finalize: that failure is carried in `finalize_error` instead of
/// failing the call.
#[derive(Debug)]
pub struct SessionResult {
    pub elapsed_secs: u64,
    pub outcome: DurationOutcome,
    pub target_path: PathBuf,
    pub finalize_error: Option<CaptureError>,
}

/// Why a session result can't be used for a task.
#[derive(Debug, thiserror::Error)]
pub enum Rejection {
    #[error("recording was {0}")]
    Duration(DurationOutcome),

    #[error("recording could not be finalized: {0}")]
    Capture(CaptureError),
}

impl SessionResult {
    /// Turns an acceptable, cleanly finalized result into a [`Recording`].
    pub fn accept(self) -> Result<Recording, Rejection> {
        if let Some(e) = self.finalize_error {
            return Err(Rejection::Capture(e));
        }
        if !self.outcome.is_acceptable() {
            return Err(Rejection::Duration(self.outcome));
        }
        Ok(Recording::new(self.target_path, self.elapsed_secs))
    }
}

enum Phase<H> {
    Idle,
    Active(ActiveCapture<H>),
    Ended {
        elapsed_secs: u64,
        outcome: DurationOutcome,
    },
}

struct ActiveCapture<H> {
    id: Uuid,
    started_at: Instant,
    capture: H,
}

/// Owns the capture device and runs one session at a time.
pub struct SessionController<D: CaptureDevice, C: Clock = SystemClock> {
    device: D,
    clock: C,
    media_dir: PathBuf,
    policy: DurationPolicy,
    keep_rejected: bool,
    phase: Phase<D::Handle>,
    last_stamp: i64,
}

impl<D: CaptureDevice, C: Clock> SessionController<D, C> {
    /// Creates a controller writing media under `media_dir`.
    pub fn new(device: D, clock: C, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            device,
            clock,
            media_dir: media_dir.into(),
            policy: DurationPolicy::default(),
            keep_rejected: false,
            phase: Phase::Idle,
            last_stamp: 0,
        }
    }

    /// Keep rejected recordings (wrong length or not finalized) on disk
    /// instead of deleting them.
    #[must_use]
    pub fn keep_rejected(mut self, keep: bool) -> Self {
        self.keep_rejected = keep;
        self
    }

    pub fn policy(&self) -> DurationPolicy {
        self.policy
    }

    pub fn state(&self) -> SessionState {
        match &self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Active(a) => SessionState::Active {
                started_at: a.started_at,
            },
            Phase::Ended {
                elapsed_secs,
                outcome,
            } => SessionState::Ended {
                elapsed_secs: *elapsed_secs,
                outcome: *outcome,
            },
        }
    }

    /// Starts a capture into a fresh `audio_<millis>.m4a` path.
    ///
    /// Rejected while another session is active. If the device can't start,
    /// the controller stays where it was and the error is returned.
    pub fn start_session(&mut self) -> Result<SessionHandle, SessionError> {
        if matches!(self.phase, Phase::Active(_)) {
            return Err(SessionError::AlreadyActive);
        }
        fs::create_dir_all(&self.media_dir).map_err(CaptureError::from)?;

        let stamp = self.next_stamp();
        let target_path = self.media_dir.join(format!("audio_{stamp}.m4a"));
        let capture = self.device.begin_capture(&target_path)?;

        let id = Uuid::new_v4();
        self.phase = Phase::Active(ActiveCapture {
            id,
            started_at: self.clock.now(),
            capture,
        });
        log::info!("session {id} started → {}", target_path.display());
        Ok(SessionHandle { id, target_path })
    }

    /// Whole seconds elapsed in the active session, for periodic display.
    ///
    /// Reads the clock only; never touches the device or the filesystem.
    pub fn elapsed(&self, handle: &SessionHandle) -> Option<u64> {
        match &self.phase {
            Phase::Active(a) if a.id == handle.id => Some(self.elapsed_since(a.started_at)),
            _ => None,
        }
    }

    /// Ends the session and classifies its length.
    ///
    /// A handle that isn't the active session is rejected and the active
    /// session, if any, keeps running.
    pub fn end_session(&mut self, handle: SessionHandle) -> Result<SessionResult, SessionError> {
        let active = match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Active(a) if a.id == handle.id => a,
            other => {
                self.phase = other;
                return Err(SessionError::UnknownSession(handle.id));
            }
        };

        let elapsed_secs = self.elapsed_since(active.started_at);
        let finalize_error = self.device.end_capture(active.capture).err();
        if let Some(e) = &finalize_error {
            log::warn!("session {}: failed to finalize capture: {e}", handle.id);
        }

        let outcome = self.policy.classify(elapsed_secs);
        self.phase = Phase::Ended {
            elapsed_secs,
            outcome,
        };
        log::info!("session {} ended after {elapsed_secs}s ({outcome})", handle.id);

        // Unusable either way: too short, too long, or possibly truncated.
        if (!outcome.is_acceptable() || finalize_error.is_some()) && !self.keep_rejected {
            remove_rejected(&handle.target_path);
        }

        Ok(SessionResult {
            elapsed_secs,
            outcome,
            target_path: handle.target_path,
            finalize_error,
        })
    }

    fn elapsed_since(&self, started_at: Instant) -> u64 {
        self.clock.now().saturating_duration_since(started_at).as_secs()
    }

    /// Millisecond stamp for the next media path, strictly increasing.
    fn next_stamp(&mut self) -> i64 {
        let now = Timestamp::now().as_millisecond();
        self.last_stamp = now.max(self.last_stamp + 1);
        self.last_stamp
    }
}

fn remove_rejected(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("removed rejected recording {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("failed to remove rejected recording {}: {e}", path.display()),
    }
}
