//! Interactive task flows: noise check, record, review, submit.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use jiff::Timestamp;

use crate::{
    model::{ReadingChecks, RecordError, Recording, TaskRecord},
    noise::{NoiseCheck, NoiseVerdict, SimulatedMeter},
    playback::PlaybackOutcome,
    session::{Rejection, SessionController, SessionState, SystemDevice},
};

use super::{
    Context,
    prompt::{Input, Poll},
};

const TICK: Duration = Duration::from_secs(1);

/// Runs the noise check and reports whether the room is quiet enough.
pub(super) fn cmd_noise(ctx: &Context) -> bool {
    let check = NoiseCheck::new(ctx.config.noise_threshold_db());
    let report = check.run(&mut SimulatedMeter::new(), |db| {
        print!("\r{db:>3} dB");
        let _ = io::stdout().flush();
    });
    println!();
    println!("{}", report.verdict.message());
    report.verdict == NoiseVerdict::Quiet
}

pub(super) fn cmd_read(ctx: &Context, input: &Input, text: &str) -> Result<(), String> {
    println!("Read this passage aloud:\n\n{text}\n");
    audio_task(ctx, input, |input, recording| {
        let checks = ReadingChecks {
            no_background_noise: input.confirm("No background noise?"),
            no_mistakes: input.confirm("No mistakes while reading?"),
            no_errors: input.confirm("No errors in between?"),
        };
        TaskRecord::text_reading(text, recording, checks)
    })
}

pub(super) fn cmd_describe(ctx: &Context, input: &Input, image_url: &str) -> Result<(), String> {
    println!("Describe this image aloud:\n\n{image_url}\n");
    audio_task(ctx, input, |_, recording| {
        TaskRecord::image_description(image_url, recording)
    })
}

pub(super) fn cmd_photo(
    ctx: &Context,
    input: &Input,
    image: &Path,
    with_audio: bool,
) -> Result<(), String> {
    let stored = store_photo(ctx, image)?;
    println!("Photo saved to {}", stored.display());

    let submitted = photo_task(ctx, input, &stored, with_audio);
    // The copy is only worth keeping if a record points at it.
    if !matches!(submitted, Ok(true)) {
        remove_media(&stored);
    }
    submitted.map(|_| ())
}

/// Returns whether a photo record was submitted.
fn photo_task(
    ctx: &Context,
    input: &Input,
    stored: &Path,
    with_audio: bool,
) -> Result<bool, String> {
    loop {
        let Some(description) = input.ask("Describe the photo:") else {
            return Ok(false);
        };

        let recording = if with_audio {
            let mut sessions = ctx.sessions();
            match record(&mut sessions, input)? {
                Some(r) => Some(r),
                None => return Ok(false),
            }
        } else {
            None
        };

        let result =
            TaskRecord::photo_capture(stored.to_string_lossy(), &description, recording.as_ref());
        match submit_or_retry(ctx, input, result, recording)? {
            Next::Submitted => return Ok(true),
            Next::Quit => return Ok(false),
            Next::Again => {}
        }
    }
}

enum Next {
    Submitted,
    Quit,
    Again,
}

/// Records until a recording is accepted and turned into a record, or the
/// user gives up.
fn audio_task(
    ctx: &Context,
    input: &Input,
    mut build: impl FnMut(&Input, &Recording) -> Result<TaskRecord, RecordError>,
) -> Result<(), String> {
    let mut sessions = ctx.sessions();
    loop {
        let Some(recording) = record(&mut sessions, input)? else {
            return Ok(());
        };
        review(ctx, input, &recording);
        let result = build(input, &recording);
        match submit_or_retry(ctx, input, result, Some(recording))? {
            Next::Submitted | Next::Quit => return Ok(()),
            Next::Again => {}
        }
    }
}

/// Offers submit when the record is valid; otherwise only retry or quit.
/// The record is stamped when it is appended, after the user chooses submit.
/// Any recording not submitted is discarded.
fn submit_or_retry(
    ctx: &Context,
    input: &Input,
    result: Result<TaskRecord, RecordError>,
    recording: Option<Recording>,
) -> Result<Next, String> {
    let choice = match &result {
        Ok(_) => input.choose("[s]ubmit, [r]ecord again, or [q]uit?", &['s', 'r', 'q']),
        Err(e) => {
            println!("Cannot submit: {e}");
            input.choose("[r]ecord again or [q]uit?", &['r', 'q'])
        }
    };

    if let (Some('s'), Ok(record)) = (choice, result) {
        let record = ctx
            .log
            .append(record)
            .map_err(|e| format!("failed to save task: {e}"))?;
        println!(
            "Saved {} task to {}",
            record.task.label().to_lowercase(),
            ctx.log.path().display()
        );
        return Ok(Next::Submitted);
    }

    if let Some(r) = recording {
        let path = r.path().to_path_buf();
        if let Err(e) = r.discard() {
            log::warn!("failed to discard {}: {e}", path.display());
        }
    }
    Ok(if choice == Some('r') {
        Next::Again
    } else {
        Next::Quit
    })
}

/// One press-and-hold gesture: Enter starts, Enter stops.
///
/// Loops on rejected or failed recordings. `None` if the user quits.
fn record(
    sessions: &mut SessionController<SystemDevice>,
    input: &Input,
) -> Result<Option<Recording>, String> {
    let policy = sessions.policy();
    loop {
        let answer = input.ask(&format!(
            "Press Enter to start recording ({}-{}s), or q to quit:",
            policy.min_secs, policy.max_secs
        ));
        match answer.as_deref() {
            None | Some("q" | "Q") => return Ok(None),
            Some(_) => {}
        }

        let handle = match sessions.start_session() {
            Ok(h) => h,
            Err(e) => {
                println!("Could not start recording: {e}");
                continue;
            }
        };

        log::debug!("recording session {}", handle.id());
        println!("Recording... press Enter to stop.");
        loop {
            match input.poll(TICK) {
                Poll::Timeout => {
                    if let Some(secs) = sessions.elapsed(&handle) {
                        print!("\rDuration: {secs} sec");
                        let _ = io::stdout().flush();
                    }
                }
                Poll::Line(_) | Poll::Closed => break,
            }
        }

        let result = sessions
            .end_session(handle)
            .map_err(|e| format!("failed to end recording: {e}"))?;
        if let SessionState::Ended { elapsed_secs, .. } = sessions.state() {
            println!("\rDuration: {elapsed_secs} sec");
        }

        match result.accept() {
            Ok(recording) => return Ok(Some(recording)),
            Err(Rejection::Duration(outcome)) => {
                if let Some(msg) = policy.message(outcome) {
                    println!("{msg}");
                }
            }
            Err(Rejection::Capture(e)) => println!("Recording failed: {e}"),
        }
    }
}

/// Lets the user listen back before submitting, if a player is configured.
fn review(ctx: &Context, input: &Input, recording: &Recording) {
    let Some(player) = ctx.player() else {
        return;
    };
    while input.confirm("Play the recording?") {
        let mut playback = match player.play(recording.path()) {
            Ok(p) => p,
            Err(e) => {
                println!("Could not play recording: {e}");
                return;
            }
        };
        println!("Playing... press Enter to stop.");
        // Stop on Enter, or return as soon as playback ends by itself.
        let outcome = loop {
            if playback.is_finished() {
                break playback.wait();
            }
            match input.poll(Duration::from_millis(200)) {
                Poll::Line(_) | Poll::Closed => break playback.stop(),
                Poll::Timeout => {}
            }
        };
        if let PlaybackOutcome::Failed(e) = outcome {
            println!("Playback failed: {e}");
        }
    }
}

/// Copies the photo into the media directory as `photo_<millis>.<ext>`.
fn store_photo(ctx: &Context, image: &Path) -> Result<PathBuf, String> {
    if !image.is_file() {
        return Err(format!("no image at {}", image.display()));
    }
    fs::create_dir_all(&ctx.media_dir)
        .map_err(|e| format!("failed to create {}: {e}", ctx.media_dir.display()))?;
    let ext = image
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");
    let dest = ctx.media_dir.join(format!(
        "photo_{}.{ext}",
        Timestamp::now().as_millisecond()
    ));
    fs::copy(image, &dest).map_err(|e| format!("failed to copy {}: {e}", image.display()))?;
    Ok(dest)
}

fn remove_media(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("removed unsubmitted {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("failed to remove {}: {e}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::{config::Config, storage::TaskLog};

    fn photos_in(media_dir: &Path) -> usize {
        fs::read_dir(media_dir).map_or(0, |entries| {
            entries
                .filter(|e| {
                    e.as_ref()
                        .is_ok_and(|e| e.file_name().to_string_lossy().starts_with("photo_"))
                })
                .count()
        })
    }

    fn run_photo(answers: &[&str]) -> (TempDir, TaskLog, PathBuf) {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("door.jpg");
        fs::write(&image, b"jpeg").unwrap();
        let log = TaskLog::open(dir.path().join("data")).unwrap();
        let media_dir = dir.path().join("data").join("media");
        let config = Config::default();
        let ctx = Context {
            config: &config,
            log: &log,
            media_dir: media_dir.clone(),
        };

        cmd_photo(&ctx, &Input::scripted(answers), &image, false).unwrap();
        (dir, log, media_dir)
    }

    #[test]
    fn submitted_photo_is_kept_and_logged() {
        let (_dir, log, media_dir) = run_photo(&["A red door", "s"]);

        let records = log.load_all();
        assert_eq!(records.len(), 1);
        assert!(Path::new(records[0].image_path().unwrap()).is_file());
        assert_eq!(photos_in(&media_dir), 1);
    }

    #[test]
    fn photo_is_removed_when_user_quits() {
        let (_dir, log, media_dir) = run_photo(&["A red door", "q"]);

        assert!(log.load_all().is_empty());
        assert_eq!(photos_in(&media_dir), 0);
    }

    #[test]
    fn photo_is_removed_when_input_closes() {
        let (_dir, log, media_dir) = run_photo(&[]);

        assert!(log.load_all().is_empty());
        assert_eq!(photos_in(&media_dir), 0);
    }
}
