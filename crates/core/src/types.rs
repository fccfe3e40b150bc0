use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Where a transcript came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    Embedded,
    Generated,
}

impl fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptSource::Embedded => write!(f, "embedded"),
            TranscriptSource::Generated => write!(f, "generated"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<Segment>,
    pub language: String,
    pub source: TranscriptSource,
}

impl Transcript {
    pub const UNKNOWN_LANGUAGE: &'static str = "unknown";

    /// End of the latest segment, or `None` for an empty transcript.
    pub fn duration(&self) -> Option<f64> {
        transcript_duration(&self.segments)
    }
}

pub fn transcript_duration(segments: &[Segment]) -> Option<f64> {
    segments.iter().map(|s| s.end).reduce(f64::max)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Funny,
    Emotional,
    Informative,
}

impl HighlightKind {
    pub const ALL: [HighlightKind; 3] = [
        HighlightKind::Funny,
        HighlightKind::Emotional,
        HighlightKind::Informative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightKind::Funny => "funny",
            HighlightKind::Emotional => "emotional",
            HighlightKind::Informative => "informative",
        }
    }
}

impl fmt::Display for HighlightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightSection {
    pub start: f64,
    pub end: f64,
    #[serde(rename = "type")]
    pub kind: HighlightKind,
}

impl HighlightSection {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Metadata of a video file, re-read from the file on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub duration: f64,
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_latest_end_not_last_segment() {
        let segments = vec![
            Segment {
                start: 0.0,
                end: 12.0,
                text: "a".into(),
            },
            Segment {
                start: 5.0,
                end: 8.0,
                text: "b".into(),
            },
        ];
        assert_eq!(transcript_duration(&segments), Some(12.0));
        assert_eq!(transcript_duration(&[]), None);
    }

    #[test]
    fn section_serializes_kind_as_type() {
        let section = HighlightSection {
            start: 0.0,
            end: 65.0,
            kind: HighlightKind::Funny,
        };
        let json = serde_json::to_value(&section).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"start": 0.0, "end": 65.0, "type": "funny"})
        );
    }

    #[test]
    fn source_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TranscriptSource::Generated).unwrap(),
            "\"generated\""
        );
    }
}
