use std::path::{Path, PathBuf};

use crate::{
    error::{ClipsmithError, Result},
    provider::Provider,
    transcribe::DEFAULT_MODEL_NAME,
};

pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "webm"];

#[derive(Debug, Clone)]
pub struct Config {
    pub uploads_dir: PathBuf,
    pub subtitles_dir: PathBuf,
    pub cuts_dir: PathBuf,
    pub model_dir: PathBuf,
    pub whisper_model: String,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub provider: Provider,
    pub llm_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            subtitles_dir: PathBuf::from("subtitles"),
            cuts_dir: PathBuf::from("cuts"),
            model_dir: get_root_cache_dir().join("models"),
            whisper_model: DEFAULT_MODEL_NAME.to_string(),
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            provider: Provider::default(),
            llm_base_url: None,
        }
    }
}

impl Config {
    /// Defaults overridden by `CLIPSMITH_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let path = |key: &str, default: PathBuf| lookup(key).map(PathBuf::from).unwrap_or(default);

        Self {
            uploads_dir: path("CLIPSMITH_UPLOADS_DIR", defaults.uploads_dir),
            subtitles_dir: path("CLIPSMITH_SUBTITLES_DIR", defaults.subtitles_dir),
            cuts_dir: path("CLIPSMITH_CUTS_DIR", defaults.cuts_dir),
            model_dir: path("CLIPSMITH_MODEL_DIR", defaults.model_dir),
            whisper_model: lookup("CLIPSMITH_WHISPER_MODEL").unwrap_or(defaults.whisper_model),
            ffmpeg: path("CLIPSMITH_FFMPEG", defaults.ffmpeg),
            ffprobe: path("CLIPSMITH_FFPROBE", defaults.ffprobe),
            provider: defaults.provider,
            llm_base_url: lookup("CLIPSMITH_LLM_BASE_URL"),
        }
    }

    /// Resolve a filename key to a video inside the uploads directory.
    pub fn video_path(&self, filename: &str) -> Result<PathBuf> {
        let path = self.uploads_dir.join(filename);
        if !path.is_file() {
            return Err(ClipsmithError::VideoNotFound { path });
        }
        Ok(path)
    }
}

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("clipsmith")
}

pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}
