//! Capture devices: whatever writes media to a target path.
//!
//! The controller only needs two calls: begin writing to a path, and end
//! that capture. Two implementations ship:
//!
//! - [`FileDevice`] creates an empty file. Used when no recorder is configured.
//! - [`CommandDevice`] runs an external recorder with the path appended to its
//!   arguments. Ending the capture interrupts it (SIGINT on Unix) and gives
//!   it time to finish the file before killing it.

use std::{
    fs, io,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

const STOP_POLL: Duration = Duration::from_millis(20);

/// Errors reported by a capture device.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("capture device failed: {0}")]
    Device(String),

    #[error("capture produced no file at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Something that can capture media into a file.
pub trait CaptureDevice {
    /// Token for an in-flight capture, owned by the session that started it.
    type Handle;

    /// Starts writing media to `path`.
    fn begin_capture(&mut self, path: &Path) -> Result<Self::Handle, CaptureError>;

    /// Stops the capture and finalizes the file.
    fn end_capture(&mut self, handle: Self::Handle) -> Result<(), CaptureError>;
}

/// Creates the target file and leaves it empty.
#[derive(Debug, Default)]
pub struct FileDevice;

impl CaptureDevice for FileDevice {
    type Handle = fs::File;

    fn begin_capture(&mut self, path: &Path) -> Result<Self::Handle, CaptureError> {
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(file)
    }

    fn end_capture(&mut self, handle: Self::Handle) -> Result<(), CaptureError> {
        handle.sync_all()?;
        Ok(())
    }
}

/// Records by running an external program, e.g. `arecord -q -f cd`.
#[derive(Debug, Clone)]
pub struct CommandDevice {
    program: String,
    args: Vec<String>,
    stop_grace: Duration,
}

/// A running recorder process.
#[derive(Debug)]
pub struct CommandCapture {
    child: Child,
    path: PathBuf,
}

impl CommandDevice {
    /// How long an interrupted recorder gets to finish its file.
    pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(3);

    /// Builds a device from a command line. Returns `None` for an empty one.
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            stop_grace: Self::DEFAULT_STOP_GRACE,
        })
    }

    #[cfg(test)]
    fn with_stop_grace(mut self, stop_grace: Duration) -> Self {
        self.stop_grace = stop_grace;
        self
    }

    /// Interrupts the recorder and waits for it to exit on its own.
    ///
    /// Falls back to killing it once the grace period runs out, in which case
    /// the file can't be trusted and an error is returned.
    fn stop(&self, child: &mut Child) -> Result<(), CaptureError> {
        interrupt(child)?;
        if let Some(status) = wait_for_exit(child, self.stop_grace)? {
            // Recorders commonly exit non-zero when interrupted.
            log::debug!("recorder `{}` stopped with {status}", self.program);
            return Ok(());
        }

        log::warn!(
            "recorder `{}` ignored the interrupt for {:?}; killing it",
            self.program,
            self.stop_grace
        );
        child.kill()?;
        child.wait()?;
        Err(CaptureError::Device(format!(
            "recorder `{}` did not stop in time; the file may be incomplete",
            self.program
        )))
    }
}

#[cfg(unix)]
fn interrupt(child: &Child) -> io::Result<()> {
    use nix::{
        sys::signal::{self, Signal},
        unistd::Pid,
    };

    let pid = i32::try_from(child.id()).map_err(|_| io::Error::other("pid out of range"))?;
    signal::kill(Pid::from_raw(pid), Signal::SIGINT)?;
    Ok(())
}

// No interrupt to send; the grace period passes and the recorder is killed.
#[cfg(not(unix))]
fn interrupt(_child: &Child) -> io::Result<()> {
    Ok(())
}

fn wait_for_exit(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(STOP_POLL);
    }
}

impl CaptureDevice for CommandDevice {
    type Handle = CommandCapture;

    fn begin_capture(&mut self, path: &Path) -> Result<Self::Handle, CaptureError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    CaptureError::Device(format!("recorder `{}` not found", self.program))
                }
                _ => CaptureError::Io(e),
            })?;
        log::debug!("started recorder `{}` (pid {})", self.program, child.id());
        Ok(CommandCapture {
            child,
            path: path.to_path_buf(),
        })
    }

    fn end_capture(&mut self, mut handle: Self::Handle) -> Result<(), CaptureError> {
        // A recorder that already exited on its own must have exited cleanly.
        if let Some(status) = handle.child.try_wait()? {
            if !status.success() {
                return Err(CaptureError::Device(format!(
                    "recorder `{}` exited with {status}",
                    self.program
                )));
            }
        } else {
            self.stop(&mut handle.child)?;
        }
        if !handle.path.exists() {
            return Err(CaptureError::MissingOutput(handle.path));
        }
        Ok(())
    }
}

/// The device chosen from configuration at startup.
#[derive(Debug)]
pub enum SystemDevice {
    File(FileDevice),
    Command(CommandDevice),
}

#[derive(Debug)]
pub enum SystemCapture {
    File(fs::File),
    Command(CommandCapture),
}

impl SystemDevice {
    /// Uses the configured recorder command if there is one.
    pub fn from_command(command: Option<&[String]>) -> Self {
        match command.and_then(CommandDevice::new) {
            Some(device) => Self::Command(device),
            None => Self::File(FileDevice),
        }
    }
}

impl CaptureDevice for SystemDevice {
    type Handle = SystemCapture;

    fn begin_capture(&mut self, path: &Path) -> Result<Self::Handle, CaptureError> {
        match self {
            Self::File(d) => d.begin_capture(path).map(SystemCapture::File),
            Self::Command(d) => d.begin_capture(path).map(SystemCapture::Command),
        }
    }

    fn end_capture(&mut self, handle: Self::Handle) -> Result<(), CaptureError> {
        match (self, handle) {
            (Self::File(d), SystemCapture::File(h)) => d.end_capture(h),
            (Self::Command(d), SystemCapture::Command(h)) => d.end_capture(h),
            _ => Err(CaptureError::Device("capture handle from another device".into())),
        }
    }
}
