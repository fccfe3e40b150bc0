use crate::types::{HighlightSection, Transcript};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Render a transcript as `[start–end] text` lines under a provenance header.
pub fn format_transcript_readable(transcript: &Transcript) -> String {
    let mut output = format!(
        "## Transcript ({}, language: {}, {} segments)\n\n",
        transcript.source,
        transcript.language,
        transcript.segments.len()
    );
    for seg in &transcript.segments {
        output.push_str(&format!(
            "[{}–{}] {}\n",
            format_timestamp(seg.start),
            format_timestamp(seg.end),
            seg.text.trim()
        ));
    }
    output
}

pub fn format_sections_readable(sections: &[HighlightSection]) -> String {
    let mut output = String::new();
    output.push_str("## Highlights\n\n");
    for (i, section) in sections.iter().enumerate() {
        output.push_str(&format!(
            "{}. [{}–{}] {} ({:.0}s)\n",
            i + 1,
            format_timestamp(section.start),
            format_timestamp(section.end),
            section.kind,
            section.duration()
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HighlightKind, Segment, TranscriptSource};

    #[test]
    fn timestamp_is_minutes_and_seconds() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(90.5), "01:30");
        assert_eq!(format_timestamp(3_725.0), "62:05");
    }

    #[test]
    fn transcript_lines_carry_range_under_provenance_header() {
        let transcript = Transcript {
            segments: vec![Segment {
                start: 61.0,
                end: 63.0,
                text: "  hi ".into(),
            }],
            language: "en".into(),
            source: TranscriptSource::Generated,
        };
        assert_eq!(
            format_transcript_readable(&transcript),
            "## Transcript (generated, language: en, 1 segments)\n\n[01:01–01:03] hi\n"
        );
    }

    #[test]
    fn sections_are_numbered() {
        let sections = [HighlightSection {
            start: 60.0,
            end: 125.0,
            kind: HighlightKind::Emotional,
        }];
        assert_eq!(
            format_sections_readable(&sections),
            "## Highlights\n\n1. [01:00–02:05] emotional (65s)\n"
        );
    }
}
