use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use super::audio::AudioTrack;
use super::ffmpeg::FfmpegSink;
use super::sequencer::{SequenceSummary, Sequencer};
use super::sink::FrameSink;
use super::transform::TransformedClip;
use crate::config::RenderConfig;
use crate::error::{Result, VideoError};
use crate::scene::{slot_duration, Scene};

pub struct VideoGenerator {
    render: RenderConfig,
    encode_timeout: Duration,
}

impl VideoGenerator {
    pub fn new(render: RenderConfig, encode_timeout: Duration) -> Self {
        Self {
            render,
            encode_timeout,
        }
    }

    /// Animate every scene image and encode it with the narration.
    pub async fn generate_video(
        &self,
        scenes: &[Scene],
        audio: &AudioTrack,
        output_path: &Path,
    ) -> Result<()> {
        info!("Assembling {} scenes into {}", scenes.len(), output_path.display());

        let scenes = scenes.to_vec();
        let audio = audio.clone();
        let render = self.render;
        let output: PathBuf = output_path.to_path_buf();
        let timeout = self.encode_timeout;

        // Frame rendering is CPU bound; keep it off the async workers.
        let summary = tokio::task::spawn_blocking(move || {
            let mut sink = FfmpegSink::new(&output, timeout);
            let result = render_scenes(&scenes, &audio, &render, &mut sink);
            // Only an encoder that actually ran can have left a partial file.
            if result.is_err() && sink.started() {
                drop(sink);
                if std::fs::remove_file(&output).is_ok() {
                    warn!("Removed partial output {}", output.display());
                }
            }
            result
        })
        .await
        .map_err(|e| VideoError::Encoding(format!("render task failed: {e}")))??;

        info!(
            "Video generation completed: {} ({} scenes, {} frames)",
            output_path.display(),
            summary.clip_frames.len(),
            summary.total_frames
        );
        Ok(())
    }
}

/// Load, transform and sequence `scenes` into `sink`.
pub fn render_scenes(
    scenes: &[Scene],
    audio: &AudioTrack,
    render: &RenderConfig,
    sink: &mut dyn FrameSink,
) -> Result<SequenceSummary> {
    if scenes.is_empty() {
        return Err(VideoError::EmptySequence);
    }
    let slot = slot_duration(audio.duration, scenes.len())?;
    info!("Each scene gets {:.3}s", slot);

    let clips = scenes
        .iter()
        .map(|scene| {
            info!("Preparing scene {}: {}", scene.index, scene.prompt);
            TransformedClip::load(scene.index, &scene.image_path, slot, render)
        })
        .collect::<Result<Vec<_>>>()?;

    Sequencer::new(render.fps).run(&clips, audio, sink)
}
