//! History view: totals plus every task, newest first.

use jiff::tz::TimeZone;
use serde_json::json;

use crate::{
    model::{Aggregate, TaskRecord},
    storage::TaskLog,
};

const EMPTY_HISTORY: &str = "No tasks yet. Complete one and it will appear here.";

pub(super) fn cmd_history(log: &TaskLog, as_json: bool) -> Result<(), String> {
    let records = log.load_recent();
    let totals = Aggregate::of(&records);

    if as_json {
        let out = json!({
            "total_tasks": totals.count,
            "total_duration_sec": totals.total_duration_secs,
            "tasks": records,
        });
        let text = serde_json::to_string_pretty(&out)
            .map_err(|e| format!("failed to serialize history: {e}"))?;
        println!("{text}");
        return Ok(());
    }

    if records.is_empty() {
        println!("{EMPTY_HISTORY}");
        return Ok(());
    }

    println!("{}", format_totals(totals));
    println!();
    let tz = TimeZone::system();
    for r in &records {
        println!("{}", format_entry(r, &tz));
    }
    Ok(())
}

fn format_totals(totals: Aggregate) -> String {
    format!(
        "Total tasks: {}    Total recording: {}s",
        totals.count, totals.total_duration_secs
    )
}

/// One line per task: type, local time, and duration/image when present.
fn format_entry(record: &TaskRecord, tz: &TimeZone) -> String {
    let when = record
        .timestamp
        .to_zoned(tz.clone())
        .strftime("%d %b %Y, %I:%M %p")
        .to_string();
    let mut parts = vec![format!("{:<17}", record.task.label()), when];
    if record.duration_sec > 0 {
        parts.push(format!("Duration: {}s", record.duration_sec));
    }
    if let Some(image) = record.image_path() {
        parts.push(image.to_string());
    }
    parts.join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;

    use crate::model::Task;

    fn at(millis: i64) -> Timestamp {
        Timestamp::from_millisecond(millis).unwrap()
    }

    #[test]
    fn totals_line() {
        let totals = Aggregate {
            count: 3,
            total_duration_secs: 27,
        };
        assert_eq!(format_totals(totals), "Total tasks: 3    Total recording: 27s");
    }

    #[test]
    fn reading_entry_shows_duration() {
        let record = TaskRecord {
            task: Task::TextReading {
                source_text: "Hello".into(),
                audio_path: "/m/audio_1.m4a".into(),
            },
            duration_sec: 15,
            // 2023-11-14 22:13:20 UTC
            timestamp: at(1_700_000_000_000),
        };

        assert_eq!(
            format_entry(&record, &TimeZone::UTC),
            "Text reading       14 Nov 2023, 10:13 PM  Duration: 15s"
        );
    }

    #[test]
    fn silent_photo_entry_shows_image_not_duration() {
        let record = TaskRecord {
            task: Task::PhotoCapture {
                image_path: "/m/photo_1.jpg".into(),
                description: "A red door".into(),
                audio_path: None,
            },
            duration_sec: 0,
            timestamp: at(1_700_000_000_000),
        };

        let line = format_entry(&record, &TimeZone::UTC);
        assert!(line.starts_with("Photo capture"));
        assert!(!line.contains("Duration"));
        assert!(line.ends_with("/m/photo_1.jpg"));
    }
}
