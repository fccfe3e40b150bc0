//! Highlight section selection over a timed transcript.
//!
//! The section count scales with video length, the transcript is handed to a
//! language model, and the reply is parsed and checked before it is returned.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::{
    error::{ClipsmithError, Result},
    llm::LanguageModel,
    types::{HighlightKind, HighlightSection, Segment, transcript_duration},
};

pub const MIN_SECTIONS: usize = 3;
pub const MAX_SECTIONS: usize = 10;
pub const SECTIONS_PER_FIVE_MINUTES: f64 = 2.5;
pub const TARGET_MIN_SECONDS: f64 = 60.0;
pub const TARGET_MAX_SECONDS: f64 = 70.0;

/// Roughly 2.5 sections per five minutes, truncated, then clamped to 3..=10.
pub fn target_section_count(duration_seconds: f64) -> usize {
    let scaled = (duration_seconds / 300.0 * SECTIONS_PER_FIVE_MINUTES) as usize;
    scaled.clamp(MIN_SECTIONS, MAX_SECTIONS)
}

#[derive(Serialize)]
struct PromptSegment<'a> {
    start: f64,
    end: f64,
    text: &'a str,
}

pub fn build_prompt(segments: &[Segment], section_count: usize) -> Result<String> {
    let context: Vec<PromptSegment> = segments
        .iter()
        .map(|s| PromptSegment {
            start: s.start,
            end: s.end,
            text: &s.text,
        })
        .collect();
    let transcript_json = serde_json::to_string_pretty(&context)?;

    let kinds = HighlightKind::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        r#"You are an editor cutting short-form clips out of a long video.

INPUT: Subtitles of the video as a JSON array. Every entry has "start" and "end" in seconds and the spoken "text".

TASK: Pick exactly {count} engaging sections. Each section must last between {min} and {max} seconds and may span several subtitle entries.
Label every section with one type: {kinds}.

OUTPUT: Return ONLY a raw JSON array. No markdown, no code fences, no commentary.
[
  {{"start": <start_seconds>, "end": <end_seconds>, "type": "<{kinds_pipe}>"}}
]

Subtitles:
{transcript}
"#,
        count = section_count,
        min = TARGET_MIN_SECONDS,
        max = TARGET_MAX_SECONDS,
        kinds = kinds,
        kinds_pipe = kinds.replace(", ", "|"),
        transcript = transcript_json,
    ))
}

/// Strip code fences, require a JSON array, and keep the elements that form
/// valid sections.
pub fn parse_sections(raw: &str) -> Result<Vec<HighlightSection>> {
    let cleaned = raw.trim().replace("```json", "").replace("```", "");
    let cleaned = cleaned.trim();

    let items = match serde_json::from_str::<serde_json::Value>(cleaned) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(_) => {
            error!(response = %cleaned, "model response is not a JSON array");
            return Err(ClipsmithError::InvalidModelResponse);
        }
        Err(e) => {
            error!(response = %cleaned, error = %e, "model response is not valid JSON");
            return Err(ClipsmithError::InvalidModelResponse);
        }
    };

    let total = items.len();
    let mut sections: Vec<HighlightSection> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match validate_section(item) {
            Ok(section) => Some(section),
            Err(reason) => {
                warn!(index = i, reason = %reason, "dropping invalid highlight section");
                None
            }
        })
        .collect();

    if total > 0 && sections.is_empty() {
        error!(response = %cleaned, "model response has no valid sections");
        return Err(ClipsmithError::InvalidModelResponse);
    }

    if sections.len() > MAX_SECTIONS {
        warn!(count = sections.len(), "model returned too many sections, truncating");
        sections.truncate(MAX_SECTIONS);
    }

    Ok(sections)
}

fn validate_section(item: serde_json::Value) -> std::result::Result<HighlightSection, String> {
    let section: HighlightSection = serde_json::from_value(item).map_err(|e| e.to_string())?;

    if !section.start.is_finite() || !section.end.is_finite() {
        return Err("non-finite timestamp".to_string());
    }
    if section.start < 0.0 {
        return Err(format!("negative start {}", section.start));
    }
    if section.end <= section.start {
        return Err(format!("end {} is not after start {}", section.end, section.start));
    }

    let duration = section.duration();
    if !(TARGET_MIN_SECONDS..=TARGET_MAX_SECONDS).contains(&duration) {
        debug!(
            start = section.start,
            end = section.end,
            duration,
            "section duration outside target window"
        );
    }

    Ok(section)
}

/// Picks highlight sections using a shared language model handle.
pub struct HighlightSelector {
    model: Arc<dyn LanguageModel>,
}

impl HighlightSelector {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn select(&self, segments: &[Segment]) -> Result<Vec<HighlightSection>> {
        let duration = transcript_duration(segments).ok_or_else(|| ClipsmithError::InvalidInput {
            reason: "No subtitles provided".to_string(),
        })?;

        let count = target_section_count(duration);
        debug!(duration, count, segments = segments.len(), "selecting highlight sections");

        let prompt = build_prompt(segments, count)?;
        let response = self.model.complete(&prompt).await?;
        parse_sections(&response)
    }
}
