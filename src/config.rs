//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use crate::error::{Result, VideoError};

pub const DEFAULT_TEXT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_IMAGE_API_URL: &str =
    "https://router.huggingface.co/hf-inference/models/stabilityai/stable-diffusion-xl-base-1.0";

/// What to do when a single scene image cannot be generated or decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AssetFailurePolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Drop the scene and re-derive slots from the surviving images.
    ///
    /// Narration is no longer aligned with the prompts it was written for.
    Skip,
}

/// Output frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        // 9:16 portrait
        Self {
            width: 1080,
            height: 1920,
        }
    }
}

/// Settings for the frame transform stage and the sequencer.
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    pub canvas: Canvas,
    /// Magnification added per second of segment playback.
    pub zoom_rate: f64,
    pub fps: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            zoom_rate: 0.03,
            fps: 24,
        }
    }
}

/// Timeouts applied to each blocking external call.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub text: Duration,
    pub speech: Duration,
    pub image: Duration,
    pub probe: Duration,
    pub encode: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            text: Duration::from_secs(120),
            speech: Duration::from_secs(120),
            image: Duration::from_secs(300),
            probe: Duration::from_secs(30),
            encode: Duration::from_secs(1800),
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub huggingface_token: String,
    pub text_model: String,
    pub text_api_base: String,
    pub image_api_url: String,
    pub voice: String,
    /// Intermediate assets (voiceover and scene images).
    pub work_dir: PathBuf,
    /// Final rendered file.
    pub output_path: PathBuf,
    pub render: RenderConfig,
    pub timeouts: Timeouts,
    pub on_asset_failure: AssetFailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            huggingface_token: String::new(),
            text_model: "gemini-2.5-flash".to_string(),
            text_api_base: DEFAULT_TEXT_API_BASE.to_string(),
            image_api_url: DEFAULT_IMAGE_API_URL.to_string(),
            voice: "en-US-ChristopherNeural".to_string(),
            work_dir: PathBuf::from("assets"),
            output_path: PathBuf::from("output/final_short.mp4"),
            render: RenderConfig::default(),
            timeouts: Timeouts::default(),
            on_asset_failure: AssetFailurePolicy::default(),
        }
    }
}

impl Config {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut render = defaults.render;
        render.zoom_rate = env_parse("AUTO_SHORT_ZOOM_RATE").unwrap_or(render.zoom_rate);
        render.fps = env_parse("AUTO_SHORT_FPS").unwrap_or(render.fps);

        let mut timeouts = defaults.timeouts;
        if let Some(secs) = env_parse("AUTO_SHORT_IMAGE_TIMEOUT_SECS") {
            timeouts.image = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse("AUTO_SHORT_ENCODE_TIMEOUT_SECS") {
            timeouts.encode = Duration::from_secs(secs);
        }

        Self {
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            huggingface_token: std::env::var("HUGGINGFACE_TOKEN").unwrap_or_default(),
            text_model: std::env::var("AUTO_SHORT_TEXT_MODEL").unwrap_or(defaults.text_model),
            text_api_base: defaults.text_api_base,
            image_api_url: std::env::var("AUTO_SHORT_IMAGE_API_URL")
                .unwrap_or(defaults.image_api_url),
            voice: std::env::var("AUTO_SHORT_VOICE").unwrap_or(defaults.voice),
            render,
            timeouts,
            ..defaults
        }
    }

    /// Check that everything the external services need is present.
    pub fn validate(&self) -> Result<()> {
        if self.gemini_api_key.is_empty() {
            return Err(VideoError::Config(
                "GEMINI_API_KEY not found. Set it via --gemini-api-key or the environment".into(),
            ));
        }
        if self.huggingface_token.is_empty() {
            return Err(VideoError::Config(
                "HUGGINGFACE_TOKEN not found. Set it via --hf-token or the environment".into(),
            ));
        }
        let Canvas { width, height } = self.render.canvas;
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(VideoError::Config(format!(
                "canvas must have non-zero even dimensions, got {width}x{height}"
            )));
        }
        if self.render.fps == 0 {
            return Err(VideoError::Config("fps must be non-zero".into()));
        }
        if !self.render.zoom_rate.is_finite() || self.render.zoom_rate < 0.0 {
            return Err(VideoError::Config(format!(
                "zoom rate must be a non-negative number, got {}",
                self.render.zoom_rate
            )));
        }
        Ok(())
    }

    pub fn audio_path(&self) -> PathBuf {
        self.work_dir.join("voiceover.mp3")
    }

    /// Image path for a 1-based scene index.
    pub fn scene_image_path(&self, index: usize) -> PathBuf {
        self.work_dir.join(format!("scene_{index}.png"))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed() -> Config {
        Config {
            gemini_api_key: "g".into(),
            huggingface_token: "h".into(),
            ..Config::default()
        }
    }

    #[test]
    fn defaults_match_portrait_short() {
        let cfg = Config::default();
        assert_eq!(cfg.render.canvas, Canvas { width: 1080, height: 1920 });
        assert_eq!(cfg.render.fps, 24);
        assert_eq!(cfg.render.zoom_rate, 0.03);
        assert_eq!(cfg.on_asset_failure, AssetFailurePolicy::Abort);
    }

    #[test]
    fn scene_images_use_one_based_names() {
        let cfg = Config::default();
        assert_eq!(cfg.scene_image_path(1), PathBuf::from("assets/scene_1.png"));
        assert_eq!(cfg.audio_path(), PathBuf::from("assets/voiceover.mp3"));
    }

    #[test]
    fn validate_requires_keys() {
        assert!(matches!(
            Config::default().validate(),
            Err(VideoError::Config(_))
        ));
        assert!(keyed().validate().is_ok());
    }

    #[test]
    fn validate_rejects_odd_canvas() {
        let mut cfg = keyed();
        cfg.render.canvas.width = 1081;
        assert!(matches!(cfg.validate(), Err(VideoError::Config(_))));
    }
}
