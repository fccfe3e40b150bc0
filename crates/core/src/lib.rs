//! Clipsmith Core Library
//!
//! Resolves a time-aligned transcript for a video (embedded subtitles first,
//! Whisper transcription as fallback) and asks a language model to pick
//! highlight sections that can be cut into short clips.

pub mod config;
pub mod cut;
pub mod error;
pub mod format;
pub mod highlights;
pub mod llm;
pub mod probe;
pub mod provider;
pub mod resolve;
pub mod srt;
pub mod transcribe;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{Config, is_supported_video};
pub use cut::{cut_filename, cut_video};
pub use error::{ClipsmithError, Result};
pub use format::{format_sections_readable, format_timestamp, format_transcript_readable};
pub use highlights::{HighlightSelector, target_section_count};
pub use llm::{ChatCompletionsClient, LanguageModel};
pub use probe::{Extraction, FfmpegProbe, SubtitleSource, video_info};
pub use provider::{Provider, ProviderConfig};
pub use resolve::{ResolvedSubtitles, TranscriptResolver};
pub use transcribe::{SpeechToText, Transcription, WhisperEngine, ensure_model};
pub use types::{HighlightKind, HighlightSection, Segment, Transcript, TranscriptSource, VideoInfo};
