use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::info;

use crate::error::{Result, VideoError};
use crate::process::output_with_timeout;

/// Narration audio file with its measured length.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub path: PathBuf,
    /// Seconds.
    pub duration: f64,
}

#[derive(Deserialize)]
struct ProbeOut {
    format: ProbeFormat,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl AudioTrack {
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }

    /// Measure the file's duration with `ffprobe`.
    pub async fn probe(path: &Path, timeout: Duration) -> Result<Self> {
        let mut cmd = Command::new("ffprobe");
        cmd.args(["-v", "error", "-print_format", "json", "-show_format"])
            .arg(path);

        let output = output_with_timeout(cmd, "audio probe", timeout).await?;
        if !output.status.success() {
            return Err(VideoError::Api(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let duration = parse_probe_duration(&output.stdout)?;
        info!("Audio {} lasts {:.2}s", path.display(), duration);
        Ok(Self::new(path, duration))
    }
}

fn parse_probe_duration(stdout: &[u8]) -> Result<f64> {
    let parsed: ProbeOut = serde_json::from_slice(stdout)?;
    let raw = parsed
        .format
        .duration
        .ok_or_else(|| VideoError::Api("ffprobe reported no duration".to_string()))?;
    let duration: f64 = raw
        .trim()
        .parse()
        .map_err(|_| VideoError::Api(format!("ffprobe duration is not a number: {raw}")))?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(VideoError::InvalidDuration(duration));
    }
    Ok(duration)
}
