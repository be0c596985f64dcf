//! Topic-to-video orchestration.
//!
//! Stages run strictly in order and the first failure aborts the run:
//! script and prompts, voiceover, scene images, audio probe, render.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::api::{ImageGenerator, SpeechSynthesizer, TextGenerator};
use crate::config::{AssetFailurePolicy, Config};
use crate::error::{Result, VideoError};
use crate::scene::{parse_generation, GeneratedContent, Scene};
use crate::video::{AudioTrack, VideoGenerator};

pub struct Pipeline {
    config: Config,
    text: Box<dyn TextGenerator>,
    speech: Box<dyn SpeechSynthesizer>,
    images: Box<dyn ImageGenerator>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        text: Box<dyn TextGenerator>,
        speech: Box<dyn SpeechSynthesizer>,
        images: Box<dyn ImageGenerator>,
    ) -> Self {
        Self {
            config,
            text,
            speech,
            images,
        }
    }

    /// Produce the final video for `topic` and return its path.
    pub async fn run(&self, topic: &str) -> Result<PathBuf> {
        info!("Step 1/4: Writing script and scene prompts...");
        let content = self.generate_content(topic).await?;
        info!(
            "Generated script ({} scenes):\n{}",
            content.visual_prompts.len(),
            content.script
        );

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        if let Some(parent) = self.config.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!("Step 2/4: Generating voiceover...");
        let audio_path = self.config.audio_path();
        self.speech.synthesize(&content.script, &audio_path).await?;

        info!("Step 3/4: Generating scene images...");
        let scenes = self.fetch_scenes(&content.visual_prompts).await?;

        info!("Step 4/4: Rendering video...");
        let audio = AudioTrack::probe(&audio_path, self.config.timeouts.probe).await?;
        VideoGenerator::new(self.config.render, self.config.timeouts.encode)
            .generate_video(&scenes, &audio, &self.config.output_path)
            .await?;

        Ok(self.config.output_path.clone())
    }

    async fn generate_content(&self, topic: &str) -> Result<GeneratedContent> {
        let raw = self.text.generate(topic).await?;
        parse_generation(&raw).inspect_err(|e| {
            if let VideoError::MalformedGeneration { reason, raw } = e {
                error!("Error parsing generation output: {}\nRaw output: {}", reason, raw);
            }
        })
    }

    /// Fetch one image per prompt and store it as `scene_{i}.png`.
    async fn fetch_scenes(&self, prompts: &[String]) -> Result<Vec<Scene>> {
        let mut scenes = Vec::with_capacity(prompts.len());

        for (i, prompt) in prompts.iter().enumerate() {
            let index = i + 1;
            info!("Generating image {} of {}...", index, prompts.len());

            match self.fetch_scene(index, prompt).await {
                Ok(scene) => scenes.push(scene),
                Err(e) => match self.config.on_asset_failure {
                    AssetFailurePolicy::Abort => return Err(e),
                    AssetFailurePolicy::Skip => warn!("Skipping scene {}: {}", index, e),
                },
            }
        }

        if scenes.is_empty() {
            return Err(VideoError::EmptySequence);
        }
        if scenes.len() < prompts.len() {
            warn!(
                "{} of {} scenes dropped; narration will drift from the visuals",
                prompts.len() - scenes.len(),
                prompts.len()
            );
        }
        Ok(scenes)
    }

    async fn fetch_scene(&self, index: usize, prompt: &str) -> Result<Scene> {
        let bytes = self
            .images
            .generate_image(prompt)
            .await
            .map_err(|e| VideoError::asset(index, e))?;
        image::guess_format(&bytes)
            .map_err(|e| VideoError::asset(index, format!("response is not an image: {e}")))?;

        let path = self.config.scene_image_path(index);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| VideoError::asset(index, format!("{}: {e}", path.display())))?;
        info!("Image saved to: {}", path.display());

        Ok(Scene::new(index, prompt.to_string(), path))
    }
}
