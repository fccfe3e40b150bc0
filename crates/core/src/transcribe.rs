//! Speech-to-text fallback for videos without embedded subtitles.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt, process::Command, sync::OnceCell};
use tracing::{debug, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::{
    error::{ClipsmithError, Result},
    types::Segment,
};

/// The model size profile used for every transcription.
pub const DEFAULT_MODEL_NAME: &str = "ggml-small.bin";

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

#[derive(Debug, Clone)]
pub struct Transcription {
    pub segments: Vec<Segment>,
    pub language: String,
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, video_path: &Path) -> Result<Transcription>;
}

/// Download the ggml model into `model_dir` unless it is already there.
pub async fn ensure_model(model_dir: &Path, model_name: &str) -> Result<PathBuf> {
    let model_path = model_dir.join(model_name);
    if model_path.exists() {
        return Ok(model_path);
    }

    fs::create_dir_all(model_dir).await?;
    let download_url = format!("{}/{}", MODEL_BASE_URL, model_name);
    info!(url = %download_url, "downloading whisper model");

    let mut response = reqwest::get(&download_url).await?;
    if !response.status().is_success() {
        return Err(ClipsmithError::ModelDownloadFailed {
            url: download_url,
            reason: format!("HTTP {}", response.status()),
        });
    }

    // Stream into a sibling file so an interrupted download is never mistaken
    // for a complete model.
    let partial_path = model_path.with_extension("part");
    let mut file = fs::File::create(&partial_path).await?;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    fs::rename(&partial_path, &model_path).await?;

    Ok(model_path)
}

/// whisper.cpp engine. Build once at startup and share the handle; the model
/// is fetched and loaded on the first transcription, not before.
pub struct WhisperEngine {
    ctx: OnceCell<Arc<WhisperContext>>,
    model_dir: PathBuf,
    model_name: String,
    ffmpeg: PathBuf,
    scratch_dir: PathBuf,
}

impl WhisperEngine {
    pub fn new(
        model_dir: impl Into<PathBuf>,
        model_name: impl Into<String>,
        ffmpeg: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ctx: OnceCell::new(),
            model_dir: model_dir.into(),
            model_name: model_name.into(),
            ffmpeg: ffmpeg.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.ctx.initialized()
    }

    async fn context(&self) -> Result<Arc<WhisperContext>> {
        let ctx = self
            .ctx
            .get_or_try_init(|| async {
                let model_path = ensure_model(&self.model_dir, &self.model_name).await?;
                let ctx = tokio::task::spawn_blocking(move || load_context(&model_path))
                    .await
                    .map_err(|e| ClipsmithError::TranscriptionFailed {
                        video_path: PathBuf::new(),
                        reason: format!("model loading task failed: {}", e),
                    })??;
                Ok::<_, ClipsmithError>(Arc::new(ctx))
            })
            .await?;
        Ok(Arc::clone(ctx))
    }

    fn audio_path_for(&self, video_path: &Path) -> PathBuf {
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        self.scratch_dir.join(format!("{}_audio.wav", stem))
    }
}

fn load_context(model_path: &Path) -> Result<WhisperContext> {
    let model_path_str = model_path.to_str().ok_or_else(|| ClipsmithError::InvalidInput {
        reason: format!("model path is not valid UTF-8: {}", model_path.display()),
    })?;

    let ctx_params = WhisperContextParameters {
        use_gpu: true,
        flash_attn: true,
        ..Default::default()
    };

    info!(model = %model_path.display(), "loading whisper model");
    WhisperContext::new_with_params(model_path_str, ctx_params).map_err(|e| {
        ClipsmithError::TranscriptionFailed {
            video_path: PathBuf::new(),
            reason: format!("failed to load model {}: {}", model_path.display(), e),
        }
    })
}

#[async_trait]
impl SpeechToText for WhisperEngine {
    async fn transcribe(&self, video_path: &Path) -> Result<Transcription> {
        let ctx = self.context().await?;
        let audio_path = self.audio_path_for(video_path);
        fs::create_dir_all(&self.scratch_dir).await?;
        extract_audio(&self.ffmpeg, video_path, &audio_path).await?;

        let samples = read_samples(&audio_path);
        if let Err(e) = fs::remove_file(&audio_path).await {
            warn!(path = %audio_path.display(), error = %e, "failed to remove scratch audio");
        }
        let samples = samples.map_err(|reason| ClipsmithError::TranscriptionFailed {
            video_path: video_path.to_path_buf(),
            reason,
        })?;

        let result = tokio::task::spawn_blocking(move || run_whisper(&ctx, &samples))
            .await
            .map_err(|e| format!("transcription task failed: {}", e))
            .and_then(|r| r);

        result.map_err(|reason| ClipsmithError::TranscriptionFailed {
            video_path: video_path.to_path_buf(),
            reason,
        })
    }
}

/// Decode the video's audio track into 16 kHz mono PCM, the input whisper expects.
pub async fn extract_audio(ffmpeg: &Path, video_path: &Path, audio_path: &Path) -> Result<()> {
    debug!(video = %video_path.display(), audio = %audio_path.display(), "extracting audio");
    let output = Command::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .arg("-vn")
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-ar")
        .arg("16000")
        .arg("-ac")
        .arg("1")
        .arg(audio_path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(ClipsmithError::TranscriptionFailed {
            video_path: video_path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}

fn read_samples(audio_path: &Path) -> std::result::Result<Vec<f32>, String> {
    let mut reader = hound::WavReader::open(audio_path)
        .map_err(|e| format!("failed to open {}: {}", audio_path.display(), e))?;
    reader
        .samples::<i16>()
        .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("failed to read samples: {}", e))
}

fn run_whisper(ctx: &WhisperContext, samples: &[f32]) -> std::result::Result<Transcription, String> {
    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 5 });
    params.set_language(Some("auto"));
    params.set_print_progress(false);
    params.set_print_realtime(false);

    let mut state = ctx
        .create_state()
        .map_err(|e| format!("failed to create state: {}", e))?;
    state
        .full(params, samples)
        .map_err(|e| format!("failed to run model: {}", e))?;

    let mut segments = Vec::new();
    for segment in state.as_iter() {
        let text = match segment.to_str() {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    start = segment.start_timestamp(),
                    error = %e,
                    "skipping segment with unreadable text"
                );
                continue;
            }
        };
        // whisper timestamps are in centiseconds
        segments.push(Segment {
            start: segment.start_timestamp() as f64 / 100.0,
            end: segment.end_timestamp() as f64 / 100.0,
            text: text.trim().to_string(),
        });
    }

    let language_index = state.full_lang_id_from_state();
    let language = whisper_rs::get_lang_str(language_index)
        .unwrap_or(crate::types::Transcript::UNKNOWN_LANGUAGE)
        .to_string();

    Ok(Transcription { segments, language })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_model_returns_existing_file_without_downloading() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("ggml-tiny.bin");
        fs::write(&model, b"weights").await.unwrap();

        let path = ensure_model(dir.path(), "ggml-tiny.bin").await.unwrap();
        assert_eq!(path, model);
    }

    #[test]
    fn engine_does_not_load_model_until_first_transcription() {
        let dir = tempfile::tempdir().unwrap();
        let engine = WhisperEngine::new(dir.path().join("models"), "ggml-small.bin", "ffmpeg", dir.path());

        assert!(!engine.is_loaded());
        assert!(!dir.path().join("models").exists());
    }

    #[test]
    fn samples_are_scaled_to_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(i16::MAX).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        let samples = read_samples(&path).unwrap();
        assert_eq!(samples, vec![1.0, 0.0]);
    }

    #[test]
    fn unreadable_audio_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_samples(&dir.path().join("missing.wav")).is_err());
    }
}
