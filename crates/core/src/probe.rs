//! Stream inspection with `ffprobe` and subtitle demuxing with `ffmpeg`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{fs, process::Command};
use tracing::debug;

use crate::{
    error::{ClipsmithError, Result},
    types::VideoInfo,
};

/// Outcome of pulling the first embedded subtitle stream out of a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The demuxer wrote a non-empty subtitle file.
    Extracted(PathBuf),
    /// The tool ran but produced nothing usable.
    Absent,
    /// The tool could not be run at all.
    Failed(String),
}

#[async_trait]
pub trait SubtitleSource: Send + Sync {
    /// Whether the container carries at least one subtitle stream.
    async fn has_subtitles(&self, video_path: &Path) -> Result<bool>;

    /// Remux subtitle stream `0:s:0` of `video_path` into `output_path`.
    async fn extract(&self, video_path: &Path, output_path: &Path) -> Extraction;
}

#[derive(Debug, Clone)]
pub struct FfmpegProbe {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegProbe {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl Default for FfmpegProbe {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

#[async_trait]
impl SubtitleSource for FfmpegProbe {
    async fn has_subtitles(&self, video_path: &Path) -> Result<bool> {
        let probe = run_ffprobe(&self.ffprobe, video_path, false).await?;
        Ok(probe.has_subtitle_stream())
    }

    async fn extract(&self, video_path: &Path, output_path: &Path) -> Extraction {
        debug!(video = %video_path.display(), output = %output_path.display(), "extracting embedded subtitles");

        // ffmpeg never opens the output when the map matches nothing, so a file
        // left by an earlier run would otherwise pass as a fresh extraction.
        match fs::remove_file(output_path).await {
            Ok(()) => debug!(path = %output_path.display(), "removed stale subtitle file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Extraction::Failed(format!(
                    "failed to remove stale {}: {}",
                    output_path.display(),
                    e
                ));
            }
        }

        let output = Command::new(&self.ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .arg("-map")
            .arg("0:s:0")
            .arg(output_path)
            .output()
            .await;

        match output {
            Ok(output) => {
                // The exit status is not trusted; ffmpeg fails with "matches no
                // streams" when there is nothing to extract. The file decides.
                if !output.status.success() {
                    debug!(
                        status = %output.status,
                        stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                        "ffmpeg subtitle extraction exited unsuccessfully"
                    );
                }
                check_extracted(output_path).await
            }
            Err(e) => Extraction::Failed(format!("failed to run {}: {}", self.ffmpeg.display(), e)),
        }
    }
}

/// Count an extraction as successful only when the output exists and is non-empty.
pub async fn check_extracted(output_path: &Path) -> Extraction {
    match fs::metadata(output_path).await {
        Ok(meta) if meta.len() > 0 => Extraction::Extracted(output_path.to_path_buf()),
        _ => Extraction::Absent,
    }
}

/// Read duration, frame rate and frame size of a video with `ffprobe`.
pub async fn video_info(ffprobe: &Path, video_path: &Path) -> Result<VideoInfo> {
    let probe = run_ffprobe(ffprobe, video_path, true).await?;
    probe.into_video_info().ok_or_else(|| ClipsmithError::ProbeFailed {
        video_path: video_path.to_path_buf(),
        reason: "no video stream with duration and frame size".to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl ProbeOutput {
    fn has_subtitle_stream(&self) -> bool {
        self.streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("subtitle"))
    }

    fn into_video_info(self) -> Option<VideoInfo> {
        let video = self
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))?;

        let duration = self
            .format
            .as_ref()
            .and_then(|f| f.duration.as_deref())
            .or(video.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok())?;

        Some(VideoInfo {
            duration,
            frame_rate: video
                .r_frame_rate
                .as_deref()
                .and_then(parse_frame_rate)
                .unwrap_or(0.0),
            width: video.width?,
            height: video.height?,
        })
    }
}

/// Parse ffprobe's `num/den` frame rate notation.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => rate.trim().parse().ok(),
    }
}

async fn run_ffprobe(ffprobe: &Path, video_path: &Path, with_format: bool) -> Result<ProbeOutput> {
    let probe_failed = |reason: String| ClipsmithError::ProbeFailed {
        video_path: video_path.to_path_buf(),
        reason,
    };

    let mut command = Command::new(ffprobe);
    command
        .arg("-v")
        .arg("quiet")
        .arg("-print_format")
        .arg("json")
        .arg("-show_streams");
    if with_format {
        command.arg("-show_format");
    }

    debug!(video = %video_path.display(), "running ffprobe");
    let output = command
        .arg(video_path)
        .output()
        .await
        .map_err(|e| probe_failed(format!("failed to run {}: {}", ffprobe.display(), e)))?;

    if !output.status.success() {
        return Err(probe_failed(format!("ffprobe exited with {}", output.status)));
    }

    parse_probe_output(&output.stdout).map_err(|e| probe_failed(format!("unreadable ffprobe output: {}", e)))
}

fn parse_probe_output(stdout: &[u8]) -> std::result::Result<ProbeOutput, serde_json::Error> {
    serde_json::from_slice(stdout)
}
