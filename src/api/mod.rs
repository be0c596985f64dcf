mod edge_tts;
mod gemini;
mod huggingface;

pub use edge_tts::EdgeTtsClient;
pub use gemini::GeminiClient;
pub use huggingface::HuggingFaceClient;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, VideoError};

/// Writes a narration script and scene prompts for a topic.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the raw model text; parsing is left to the caller.
    async fn generate(&self, topic: &str) -> Result<String>;
}

/// Turns a script into a spoken audio file.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, script: &str, output_path: &Path) -> Result<()>;
}

/// Renders a single image for a prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the encoded image bytes exactly as served.
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>>;
}

fn classify_http_error(e: reqwest::Error, stage: &'static str, timeout: Duration) -> VideoError {
    if e.is_timeout() {
        VideoError::Timeout {
            stage,
            seconds: timeout.as_secs(),
        }
    } else {
        VideoError::Http(e)
    }
}
