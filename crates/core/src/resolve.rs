//! Transcript resolution: embedded subtitles first, speech-to-text second.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{error, info, warn};

use crate::{
    error::{ClipsmithError, Result},
    probe::{Extraction, SubtitleSource},
    srt,
    transcribe::SpeechToText,
    types::{Transcript, TranscriptSource},
};

pub struct TranscriptResolver {
    subtitles: Arc<dyn SubtitleSource>,
    speech: Arc<dyn SpeechToText>,
    subtitles_dir: PathBuf,
}

/// A resolved transcript together with the SRT file that backs it.
pub struct ResolvedSubtitles {
    pub transcript: Transcript,
    pub srt_path: PathBuf,
}

impl TranscriptResolver {
    pub fn new(
        subtitles: Arc<dyn SubtitleSource>,
        speech: Arc<dyn SpeechToText>,
        subtitles_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            subtitles,
            speech,
            subtitles_dir: subtitles_dir.into(),
        }
    }

    pub fn embedded_srt_path(&self, video_path: &Path) -> PathBuf {
        self.subtitles_dir.join(format!("{}.srt", file_stem(video_path)))
    }

    pub fn generated_srt_path(&self, video_path: &Path) -> PathBuf {
        self.subtitles_dir
            .join(format!("{}_whisper.srt", file_stem(video_path)))
    }

    pub async fn resolve(&self, video_path: &Path) -> Result<Transcript> {
        Ok(self.resolve_with_file(video_path).await?.transcript)
    }

    /// Path of the SRT file backing the transcript of `video_path`.
    pub async fn subtitle_file(&self, video_path: &Path) -> Result<PathBuf> {
        Ok(self.resolve_with_file(video_path).await?.srt_path)
    }

    pub async fn resolve_with_file(&self, video_path: &Path) -> Result<ResolvedSubtitles> {
        tokio::fs::create_dir_all(&self.subtitles_dir).await?;

        let embedded_path = self.embedded_srt_path(video_path);
        match self.subtitles.extract(video_path, &embedded_path).await {
            Extraction::Extracted(path) => {
                let segments = srt::read_srt(&path).await?;
                info!(video = %video_path.display(), segments = segments.len(), "using embedded subtitles");
                return Ok(ResolvedSubtitles {
                    transcript: Transcript {
                        segments,
                        language: Transcript::UNKNOWN_LANGUAGE.to_string(),
                        source: TranscriptSource::Embedded,
                    },
                    srt_path: path,
                });
            }
            Extraction::Absent => {
                info!(video = %video_path.display(), "no embedded subtitles, transcribing");
            }
            Extraction::Failed(reason) => {
                warn!(video = %video_path.display(), %reason, "subtitle extraction failed, transcribing");
            }
        }

        let transcription = match self.speech.transcribe(video_path).await {
            Ok(transcription) => transcription,
            Err(e) => {
                error!(video = %video_path.display(), error = %e, "transcription failed");
                return Err(ClipsmithError::SubtitlesUnavailable {
                    video_path: video_path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        let srt_path = self.generated_srt_path(video_path);
        srt::write_srt(&srt_path, &transcription.segments).await?;

        Ok(ResolvedSubtitles {
            transcript: Transcript {
                segments: transcription.segments,
                language: transcription.language,
                source: TranscriptSource::Generated,
            },
            srt_path,
        })
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::{transcribe::Transcription, types::Segment};

    enum ProbeBehavior {
        WriteSrt(&'static str),
        WriteEmpty,
        Nothing,
        Fail,
    }

    struct FakeProbe {
        behavior: ProbeBehavior,
    }

    #[async_trait]
    impl SubtitleSource for FakeProbe {
        async fn has_subtitles(&self, _video_path: &Path) -> Result<bool> {
            Ok(matches!(self.behavior, ProbeBehavior::WriteSrt(_)))
        }

        async fn extract(&self, _video_path: &Path, output_path: &Path) -> Extraction {
            match self.behavior {
                ProbeBehavior::WriteSrt(content) => {
                    tokio::fs::write(output_path, content).await.unwrap();
                }
                ProbeBehavior::WriteEmpty => {
                    tokio::fs::write(output_path, b"").await.unwrap();
                }
                ProbeBehavior::Nothing => {}
                ProbeBehavior::Fail => return Extraction::Failed("ffmpeg not found".into()),
            }
            crate::probe::check_extracted(output_path).await
        }
    }

    struct FakeSpeech {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeSpeech {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl SpeechToText for FakeSpeech {
        async fn transcribe(&self, video_path: &Path) -> Result<Transcription> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClipsmithError::TranscriptionFailed {
                    video_path: video_path.to_path_buf(),
                    reason: "model crashed".into(),
                });
            }
            Ok(Transcription {
                segments: vec![Segment {
                    start: 0.0,
                    end: 2.5,
                    text: "generated words".into(),
                }],
                language: "en".into(),
            })
        }
    }

    fn resolver(
        behavior: ProbeBehavior,
        speech: Arc<FakeSpeech>,
        dir: &Path,
    ) -> TranscriptResolver {
        TranscriptResolver::new(Arc::new(FakeProbe { behavior }), speech, dir.join("subtitles"))
    }

    #[tokio::test]
    async fn embedded_subtitles_win_and_skip_transcription() {
        let dir = tempfile::tempdir().unwrap();
        let speech = FakeSpeech::new(false);
        let resolver = resolver(
            ProbeBehavior::WriteSrt("1\n00:00:01,000 --> 00:00:03,500\nfrom the track\n"),
            speech.clone(),
            dir.path(),
        );

        let video = dir.path().join("talk.mp4");
        let resolved = resolver.resolve_with_file(&video).await.unwrap();

        assert_eq!(resolved.transcript.source, TranscriptSource::Embedded);
        assert_eq!(resolved.transcript.language, "unknown");
        assert_eq!(resolved.transcript.segments[0].text, "from the track");
        assert_eq!(resolved.srt_path, dir.path().join("subtitles/talk.srt"));
        assert_eq!(speech.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn embedded_subtitles_never_load_the_whisper_model() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("models");
        let engine = Arc::new(crate::transcribe::WhisperEngine::new(
            &model_dir,
            "ggml-small.bin",
            dir.path().join("no-such-ffmpeg"),
            dir.path().join("scratch"),
        ));
        let resolver = TranscriptResolver::new(
            Arc::new(FakeProbe {
                behavior: ProbeBehavior::WriteSrt("1\n00:00:00,000 --> 00:00:01,000\ntrack\n"),
            }),
            engine.clone(),
            dir.path().join("subtitles"),
        );

        let transcript = resolver.resolve(&dir.path().join("talk.mkv")).await.unwrap();

        assert_eq!(transcript.source, TranscriptSource::Embedded);
        assert!(!engine.is_loaded());
        assert!(!model_dir.exists());
    }

    #[tokio::test]
    async fn missing_or_empty_extraction_transcribes_once() {
        for behavior in [ProbeBehavior::Nothing, ProbeBehavior::WriteEmpty, ProbeBehavior::Fail] {
            let dir = tempfile::tempdir().unwrap();
            let speech = FakeSpeech::new(false);
            let resolver = resolver(behavior, speech.clone(), dir.path());

            let transcript = resolver.resolve(&dir.path().join("talk.mp4")).await.unwrap();

            assert_eq!(transcript.source, TranscriptSource::Generated);
            assert_eq!(transcript.language, "en");
            assert_eq!(transcript.segments[0].text, "generated words");
            assert_eq!(speech.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn generated_transcript_is_written_as_srt() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver(ProbeBehavior::Nothing, FakeSpeech::new(false), dir.path());
        let video = dir.path().join("talk.mp4");

        let path = resolver.subtitle_file(&video).await.unwrap();

        assert_eq!(path, dir.path().join("subtitles/talk_whisper.srt"));
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content, "1\n00:00:00,000 --> 00:00:02,500\ngenerated words\n\n");
    }

    #[tokio::test]
    async fn transcription_failure_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let speech = FakeSpeech::new(true);
        let resolver = resolver(ProbeBehavior::Nothing, speech.clone(), dir.path());

        let err = resolver.resolve(&dir.path().join("talk.mp4")).await.unwrap_err();

        assert!(matches!(err, ClipsmithError::SubtitlesUnavailable { .. }));
        assert!(!err.is_client_error());
        assert_eq!(speech.calls.load(Ordering::SeqCst), 1);
    }
}
