//! SubRip (`.srt`) codec for transcript segments.
//!
//! Timestamps are `HH:MM:SS,mmm`. Formatting truncates to milliseconds and
//! carries no day field, so anything at or past 24h wraps back to zero.

use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::{error::Result, types::Segment};

const SECONDS_PER_DAY: u64 = 86_400;

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
pub fn format_timestamp(seconds: f64) -> String {
    // Round to microseconds first so 1.001 doesn't truncate to 1.000.
    let total_micros = (seconds * 1_000_000.0).round() as u64;
    let total_millis = total_micros / 1_000;
    let millis = total_millis % 1_000;
    let day_seconds = (total_millis / 1_000) % SECONDS_PER_DAY;

    let hours = day_seconds / 3_600;
    let mins = (day_seconds % 3_600) / 60;
    let secs = day_seconds % 60;
    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

/// Parse an SRT timestamp into seconds. Accepts `,` or `.` before the fraction.
pub fn parse_timestamp(timestamp: &str) -> Option<f64> {
    let normalized = timestamp.trim().replace(',', ".");
    let mut parts = normalized.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let hours: u64 = h.parse().ok()?;
    let mins: u64 = m.parse().ok()?;
    let secs: f64 = s.parse().ok()?;
    Some((hours * 3_600 + mins * 60) as f64 + secs)
}

pub fn encode(segments: &[Segment]) -> String {
    let mut output = String::new();
    for (i, seg) in segments.iter().enumerate() {
        output.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(seg.start),
            format_timestamp(seg.end),
            seg.text
        ));
    }
    output
}

/// Decode SRT text. Blocks with fewer than three lines or an unreadable
/// timestamp line are skipped.
pub fn decode(content: &str) -> Vec<Segment> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");

    content
        .trim()
        .split("\n\n")
        .filter_map(|block| {
            let lines: Vec<&str> = block.trim().split('\n').collect();
            if lines.len() < 3 {
                return None;
            }

            let Some((start, end)) = lines[1].split_once(" --> ") else {
                debug!(line = lines[1], "skipping subtitle block without timestamp separator");
                return None;
            };
            let (Some(start), Some(end)) = (parse_timestamp(start), parse_timestamp(end)) else {
                debug!(line = lines[1], "skipping subtitle block with unreadable timestamp");
                return None;
            };

            Some(Segment {
                start,
                end,
                text: lines[2..].join(" "),
            })
        })
        .collect()
}

pub async fn write_srt(path: &Path, segments: &[Segment]) -> Result<()> {
    fs::write(path, encode(segments)).await?;
    Ok(())
}

pub async fn read_srt(path: &Path) -> Result<Vec<Segment>> {
    let content = fs::read_to_string(path).await?;
    Ok(decode(&content))
}
