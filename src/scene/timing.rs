use crate::error::{Result, VideoError};

/// Equal display time for each of `count` images sharing `total` seconds of audio.
pub fn slot_duration(total: f64, count: usize) -> Result<f64> {
    if count == 0 {
        return Err(VideoError::NoScenes);
    }
    if !total.is_finite() || total <= 0.0 {
        return Err(VideoError::InvalidDuration(total));
    }
    Ok(total / count as f64)
}
