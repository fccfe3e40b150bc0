use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipsmithError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Invalid response from language model")]
    InvalidModelResponse,

    #[error("Subtitles unavailable for {video_path}: {reason}")]
    SubtitlesUnavailable { video_path: PathBuf, reason: String },

    #[error("Transcription failed for {video_path}: {reason}")]
    TranscriptionFailed { video_path: PathBuf, reason: String },

    #[error("Stream probe failed for {video_path}: {reason}")]
    ProbeFailed { video_path: PathBuf, reason: String },

    #[error("Language model request failed: {reason}")]
    ModelRequestFailed { reason: String },

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("Model download failed for {url}: {reason}")]
    ModelDownloadFailed { url: String, reason: String },

    #[error("Video file not found: {path}")]
    VideoNotFound { path: PathBuf },

    #[error("Invalid time range {start}-{end} for video of {duration} seconds")]
    InvalidTimeRange { start: f64, end: f64, duration: f64 },

    #[error("Cut failed for {video_path}: {reason}")]
    CutFailed { video_path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

impl ClipsmithError {
    /// Errors caused by what the caller sent, as opposed to faults in this
    /// process or its external tools.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ClipsmithError::InvalidInput { .. }
                | ClipsmithError::InvalidModelResponse
                | ClipsmithError::InvalidTimeRange { .. }
                | ClipsmithError::VideoNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ClipsmithError>;
