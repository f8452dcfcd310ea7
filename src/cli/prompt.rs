//! Line-based terminal input.
//!
//! Stdin is read on a background thread so the recording loop can wait for
//! Enter while still ticking the elapsed-time display once a second.

use std::{
    io::{self, BufRead, Write},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::Duration,
};

/// Result of waiting for a line with a timeout.
pub(super) enum Poll {
    Line(String),
    Timeout,
    Closed,
}

pub(super) struct Input {
    lines: Receiver<String>,
}

impl Input {
    /// Starts reading stdin in the background.
    pub(super) fn stdin() -> Self {
        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { lines }
    }

    /// Feeds fixed lines, then reports input as closed.
    #[cfg(test)]
    pub(super) fn scripted(lines: &[&str]) -> Self {
        let (tx, rx) = mpsc::channel();
        for line in lines {
            tx.send((*line).to_string()).unwrap();
        }
        Self { lines: rx }
    }

    /// Waits for the next line. `None` once input is closed.
    pub(super) fn line(&self) -> Option<String> {
        self.lines.recv().ok()
    }

    pub(super) fn poll(&self, timeout: Duration) -> Poll {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => Poll::Line(line),
            Err(RecvTimeoutError::Timeout) => Poll::Timeout,
            Err(RecvTimeoutError::Disconnected) => Poll::Closed,
        }
    }

    /// Prints `question` and returns the trimmed answer.
    pub(super) fn ask(&self, question: &str) -> Option<String> {
        print!("{question} ");
        let _ = io::stdout().flush();
        self.line().map(|l| l.trim().to_string())
    }

    /// Asks a yes/no question. Anything but `y`/`yes` is no.
    pub(super) fn confirm(&self, question: &str) -> bool {
        self.ask(&format!("{question} [y/N]"))
            .is_some_and(|a| parse_yes(&a))
    }

    /// Asks until the answer starts with one of `keys`. `None` once input is closed.
    pub(super) fn choose(&self, question: &str, keys: &[char]) -> Option<char> {
        loop {
            let answer = self.ask(question)?;
            if let Some(c) = first_key(&answer, keys) {
                return Some(c);
            }
        }
    }
}

fn parse_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

fn first_key(answer: &str, keys: &[char]) -> Option<char> {
    let c = answer.chars().next()?.to_ascii_lowercase();
    keys.contains(&c).then_some(c)
}
