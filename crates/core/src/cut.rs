//! Trim a time range out of a video and re-encode it.

use std::path::Path;

use tokio::{fs, process::Command};
use tracing::{debug, info, warn};

use crate::{
    error::{ClipsmithError, Result},
    probe::video_info,
};

/// Output filename for a cut: `cut_<8 hex chars>_<original filename>`.
pub fn cut_filename(filename: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("cut_{}_{}", &id[..8], filename)
}

pub fn validate_range(start: f64, end: f64, duration: f64) -> Result<()> {
    if !start.is_finite() || !end.is_finite() || start < 0.0 || end > duration || start >= end {
        return Err(ClipsmithError::InvalidTimeRange {
            start,
            end,
            duration,
        });
    }
    Ok(())
}

pub async fn cut_video(
    ffmpeg: &Path,
    ffprobe: &Path,
    input: &Path,
    output: &Path,
    start: f64,
    end: f64,
) -> Result<()> {
    let info = video_info(ffprobe, input).await?;
    validate_range(start, end, info.duration)?;

    info!(input = %input.display(), output = %output.display(), start, end, "cutting video");
    let result = Command::new(ffmpeg)
        .arg("-y")
        .arg("-ss")
        .arg(format!("{:.3}", start))
        .arg("-i")
        .arg(input)
        .arg("-t")
        .arg(format!("{:.3}", end - start))
        .arg("-c:v")
        .arg("libx264")
        .arg("-preset")
        .arg("ultrafast")
        .arg("-threads")
        .arg("4")
        .arg("-c:a")
        .arg("aac")
        .arg(output)
        .output()
        .await;

    let reason = match result {
        Ok(out) if out.status.success() => {
            debug!(output = %output.display(), "cut finished");
            return Ok(());
        }
        Ok(out) => String::from_utf8_lossy(&out.stderr).to_string(),
        Err(e) => format!("failed to run {}: {}", ffmpeg.display(), e),
    };

    if output.exists()
        && let Err(e) = fs::remove_file(output).await
    {
        warn!(path = %output.display(), error = %e, "failed to remove partial cut");
    }

    Err(ClipsmithError::CutFailed {
        video_path: input.to_path_buf(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_has_short_unique_prefix() {
        let name = cut_filename("talk.mp4");
        assert!(name.starts_with("cut_"));
        assert!(name.ends_with("_talk.mp4"));
        assert_eq!(name.len(), "cut_".len() + 8 + "_talk.mp4".len());
        assert_ne!(name, cut_filename("talk.mp4"));
    }

    #[test]
    fn range_must_sit_inside_the_video() {
        assert!(validate_range(0.0, 65.0, 120.0).is_ok());
        assert!(validate_range(55.0, 120.0, 120.0).is_ok());

        for (start, end) in [
            (-1.0, 10.0),
            (10.0, 121.0),
            (30.0, 30.0),
            (40.0, 20.0),
            (f64::NAN, 10.0),
            (0.0, f64::NAN),
            (0.0, f64::INFINITY),
        ] {
            let err = validate_range(start, end, 120.0).unwrap_err();
            assert!(matches!(err, ClipsmithError::InvalidTimeRange { .. }));
            assert!(err.is_client_error());
        }
    }

    #[tokio::test]
    async fn unreadable_input_fails_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        let err = cut_video(
            &dir.path().join("no-ffmpeg"),
            &dir.path().join("no-ffprobe"),
            &dir.path().join("in.mp4"),
            &output,
            0.0,
            10.0,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ClipsmithError::ProbeFailed { .. }));
        assert!(!output.exists());
    }
}
