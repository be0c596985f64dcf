use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use super::SpeechSynthesizer;
use crate::error::{Result, VideoError};
use crate::process::output_with_timeout;

/// Speech synthesis through the `edge-tts` command-line tool.
#[derive(Debug, Clone)]
pub struct EdgeTtsClient {
    program: String,
    voice: String,
    timeout: Duration,
}

impl EdgeTtsClient {
    pub fn new(voice: String, timeout: Duration) -> Self {
        Self {
            program: "edge-tts".to_string(),
            voice,
            timeout,
        }
    }

    fn command(&self, script: &str, output_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--voice")
            .arg(&self.voice)
            .arg("--text")
            .arg(script)
            .arg("--write-media")
            .arg(output_path);
        cmd
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTtsClient {
    async fn synthesize(&self, script: &str, output_path: &Path) -> Result<()> {
        info!("Generating voiceover with voice {}", self.voice);

        let output = output_with_timeout(
            self.command(script, output_path),
            "speech synthesis",
            self.timeout,
        )
        .await?;

        if !output.status.success() {
            return Err(VideoError::Api(format!(
                "edge-tts failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!("Speech saved to: {}", output_path.display());
        Ok(())
    }
}
