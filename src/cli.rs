//! CLI interface for taskcap.
//!
//! Each task command walks the same steps as the mobile flow: an ambient
//! noise check, a press-and-hold recording (Enter to start, Enter to stop),
//! review, and submit. `history` reads the log back.

mod history;
mod prompt;
mod task;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::{
    config::Config,
    playback::Player,
    session::{SessionController, SystemClock, SystemDevice},
    storage::TaskLog,
};

use prompt::Input;

/// taskcap — guided audio and photo data collection.
#[derive(Debug, Parser)]
#[command(name = "taskcap", version, after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow:
  1. taskcap noise
  2. taskcap read --text "The quick brown fox jumps over the lazy dog."
     → press Enter, read aloud for 10-20 seconds, press Enter again
  3. taskcap describe --image-url https://example.com/1.jpg
  4. taskcap photo --image door.jpg --with-audio
  5. taskcap history

Configuration: ~/.taskcap/config.toml
  record-command = ["arecord", "-q", "-f", "cd"]
  play-command = ["aplay", "-q"]"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the room is quiet enough to record.
    Noise,

    /// Read a passage aloud.
    Read {
        /// The passage to read.
        #[arg(long)]
        text: String,

        #[command(flatten)]
        gate: NoiseGate,
    },

    /// Describe an image aloud.
    Describe {
        /// URL of the image to describe.
        #[arg(long)]
        image_url: String,

        #[command(flatten)]
        gate: NoiseGate,
    },

    /// Submit a photo with a written description.
    Photo {
        /// The photo to submit. Copied into the data directory.
        #[arg(long)]
        image: PathBuf,

        /// Also record a spoken description.
        #[arg(long)]
        with_audio: bool,

        #[command(flatten)]
        gate: NoiseGate,
    },

    /// Show completed tasks, newest first.
    History {
        /// Print the history as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
pub struct NoiseGate {
    /// Skip the ambient-noise check.
    #[arg(long)]
    skip_noise_check: bool,
}

/// Everything a command needs from startup.
struct Context<'a> {
    config: &'a Config,
    log: &'a TaskLog,
    media_dir: PathBuf,
}

impl Context<'_> {
    fn sessions(&self) -> SessionController<SystemDevice> {
        let device = SystemDevice::from_command(self.config.record_command.as_deref());
        SessionController::new(device, SystemClock, &self.media_dir)
            .keep_rejected(self.config.keep_rejected)
    }

    fn player(&self) -> Option<Player> {
        self.config.play_command.as_deref().and_then(Player::new)
    }

    /// Runs the noise check unless skipped. False means stop here.
    fn passes_noise_gate(&self, gate: &NoiseGate) -> bool {
        gate.skip_noise_check || task::cmd_noise(self)
    }
}

/// Run the CLI, returning an error message on failure.
pub fn run(config: &Config, log: &TaskLog, data_dir: &Path) -> Result<(), String> {
    let cli = Cli::parse();
    let ctx = Context {
        config,
        log,
        media_dir: data_dir.join("media"),
    };

    match cli.command {
        Command::Noise => {
            task::cmd_noise(&ctx);
            Ok(())
        }
        Command::Read { text, gate } => {
            if !ctx.passes_noise_gate(&gate) {
                return Ok(());
            }
            task::cmd_read(&ctx, &Input::stdin(), &text)
        }
        Command::Describe { image_url, gate } => {
            if !ctx.passes_noise_gate(&gate) {
                return Ok(());
            }
            task::cmd_describe(&ctx, &Input::stdin(), &image_url)
        }
        Command::Photo {
            image,
            with_audio,
            gate,
        } => {
            if !ctx.passes_noise_gate(&gate) {
                return Ok(());
            }
            task::cmd_photo(&ctx, &Input::stdin(), &image, with_audio)
        }
        Command::History { json } => history::cmd_history(log, json),
    }
}
