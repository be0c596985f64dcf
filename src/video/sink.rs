use std::path::PathBuf;

use image::RgbaImage;

use crate::error::Result;

/// Parameters handed to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Audio track muxed alongside the frames.
    pub audio: Option<PathBuf>,
    /// Target length of the output in seconds.
    pub duration: f64,
}

/// Consumer of rendered frames in playback order.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> Result<()>;
    fn push_frame(&mut self, frame: &RgbaImage) -> Result<()>;
    /// Called once after the last frame.
    fn end(&mut self) -> Result<()>;
}

/// Keeps frames in memory for inspection in tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct InMemorySink {
    pub config: Option<SinkConfig>,
    pub frames: Vec<RgbaImage>,
    pub finished: bool,
}

#[cfg(test)]
impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> Result<()> {
        self.config = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: &RgbaImage) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
