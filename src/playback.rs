//! Playback of a finished recording through an external player.
//!
//! Completion arrives on a channel owned by [`Playback`]; callers either
//! block on [`Playback::wait`] or poll [`Playback::is_finished`].

use std::{
    io,
    path::Path,
    process::{Command, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, TryRecvError},
    },
    thread,
    time::Duration,
};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a playback ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Stopped,
    Failed(String),
}

/// Runs a configured player command, e.g. `aplay -q`.
#[derive(Debug, Clone)]
pub struct Player {
    program: String,
    args: Vec<String>,
}

/// A playback in progress.
pub struct Playback {
    done: Receiver<PlaybackOutcome>,
    stop: Arc<AtomicBool>,
    finished: Option<PlaybackOutcome>,
}

impl Player {
    /// Returns `None` for an empty command line.
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Starts playing `path`.
    pub fn play(&self, path: &Path) -> io::Result<Playback> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let (tx, done) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_requested = Arc::clone(&stop);
        let program = self.program.clone();

        thread::spawn(move || {
            let outcome = loop {
                match child.try_wait() {
                    Ok(Some(status)) if status.success() => break PlaybackOutcome::Completed,
                    Ok(Some(status)) => {
                        break PlaybackOutcome::Failed(format!("`{program}` exited with {status}"));
                    }
                    Ok(None) if stop_requested.load(Ordering::Relaxed) => {
                        if let Err(e) = child.kill() {
                            log::warn!("failed to stop `{program}`: {e}");
                        }
                        let _ = child.wait();
                        break PlaybackOutcome::Stopped;
                    }
                    Ok(None) => thread::sleep(POLL_INTERVAL),
                    Err(e) => break PlaybackOutcome::Failed(e.to_string()),
                }
            };
            // The receiver may already be gone if the playback was dropped.
            let _ = tx.send(outcome);
        });

        Ok(Playback {
            done,
            stop,
            finished: None,
        })
    }
}

impl Playback {
    /// Polls for completion without blocking.
    pub fn is_finished(&mut self) -> bool {
        if self.finished.is_some() {
            return true;
        }
        match self.done.try_recv() {
            Ok(outcome) => {
                self.finished = Some(outcome);
                true
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.finished = Some(PlaybackOutcome::Failed("player thread exited".into()));
                true
            }
        }
    }

    /// Blocks until playback ends.
    pub fn wait(mut self) -> PlaybackOutcome {
        if let Some(outcome) = self.finished.take() {
            return outcome;
        }
        self.done
            .recv()
            .unwrap_or_else(|_| PlaybackOutcome::Failed("player thread exited".into()))
    }

    /// Stops playback early and waits for the player to exit.
    pub fn stop(self) -> PlaybackOutcome {
        self.stop.store(true, Ordering::Relaxed);
        self.wait()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn player(script: &str) -> Player {
        Player::new(&["sh", "-c", script, "sh"].map(String::from)).unwrap()
    }

    #[test]
    fn empty_command_is_no_player() {
        assert!(Player::new(&[]).is_none());
    }

    #[test]
    fn completion_is_signalled() {
        let playback = player("exit 0").play(Path::new("clip.m4a")).unwrap();
        assert_eq!(playback.wait(), PlaybackOutcome::Completed);
    }

    #[test]
    fn failing_player_reports_failure() {
        let playback = player("exit 3").play(Path::new("clip.m4a")).unwrap();
        assert!(matches!(playback.wait(), PlaybackOutcome::Failed(_)));
    }

    #[test]
    fn stop_ends_long_playback() {
        let mut playback = player("exec sleep 30").play(Path::new("clip.m4a")).unwrap();
        assert!(!playback.is_finished());

        assert_eq!(playback.stop(), PlaybackOutcome::Stopped);
    }

    #[test]
    fn poll_then_wait_returns_cached_outcome() {
        let mut playback = player("exit 0").play(Path::new("clip.m4a")).unwrap();
        while !playback.is_finished() {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(playback.wait(), PlaybackOutcome::Completed);
    }
}
