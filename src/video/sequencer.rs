use tracing::{info, warn};

use super::audio::AudioTrack;
use super::sink::{FrameSink, SinkConfig};
use super::transform::TransformedClip;
use crate::error::{Result, VideoError};

/// Frames written per clip and in total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceSummary {
    pub clip_frames: Vec<u64>,
    pub total_frames: u64,
}

/// Concatenates clips back to back under a single audio track.
#[derive(Debug, Clone, Copy)]
pub struct Sequencer {
    fps: u32,
}

impl Sequencer {
    pub fn new(fps: u32) -> Self {
        Self { fps }
    }

    /// Frames per clip so that the whole sequence spans `total` seconds.
    ///
    /// Clip boundaries are rounded cumulatively and the last boundary is pinned
    /// to `round(total * fps)`, so the final clip absorbs any rounding drift.
    pub fn frame_counts(&self, clips: &[TransformedClip], total: f64) -> Vec<u64> {
        let fps = self.fps as f64;
        let end = (total * fps).round() as u64;

        let mut counts = Vec::with_capacity(clips.len());
        let mut elapsed = 0.0;
        let mut prev = 0u64;
        for (i, clip) in clips.iter().enumerate() {
            elapsed += clip.duration();
            let boundary = if i + 1 == clips.len() {
                end
            } else {
                ((elapsed * fps).round() as u64).min(end)
            };
            counts.push(boundary.saturating_sub(prev));
            prev = boundary.max(prev);
        }
        counts
    }

    /// Push every clip's frames into `sink` in order, with `audio` attached.
    pub fn run(
        &self,
        clips: &[TransformedClip],
        audio: &AudioTrack,
        sink: &mut dyn FrameSink,
    ) -> Result<SequenceSummary> {
        let first = clips.first().ok_or(VideoError::EmptySequence)?;
        if !audio.duration.is_finite() || audio.duration <= 0.0 {
            return Err(VideoError::InvalidDuration(audio.duration));
        }

        let clip_total: f64 = clips.iter().map(TransformedClip::duration).sum();
        if (clip_total - audio.duration).abs() > 1e-6 {
            warn!(
                "Clips span {:.3}s but audio lasts {:.3}s; adjusting the final segment",
                clip_total, audio.duration
            );
        }

        let canvas = first.canvas();
        let clip_frames = self.frame_counts(clips, audio.duration);
        sink.begin(SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: self.fps,
            audio: Some(audio.path.clone()),
            duration: audio.duration,
        })?;

        for (clip, &frames) in clips.iter().zip(&clip_frames) {
            if frames == 0 {
                warn!("Scene {} is shorter than one frame and was dropped", clip.index());
                continue;
            }
            info!("Rendering scene {} ({} frames)", clip.index(), frames);
            for n in 0..frames {
                let t = n as f64 / self.fps as f64;
                sink.push_frame(&clip.frame_at(t))?;
            }
        }
        sink.end()?;

        let total_frames = clip_frames.iter().sum();
        Ok(SequenceSummary {
            clip_frames,
            total_frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Canvas, RenderConfig};
    use crate::video::sink::InMemorySink;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn render() -> RenderConfig {
        RenderConfig {
            canvas: Canvas {
                width: 18,
                height: 32,
            },
            zoom_rate: 0.03,
            fps: 10,
        }
    }

    fn clip(index: usize, duration: f64, shade: u8) -> TransformedClip {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            9,
            16,
            Rgba([shade, shade, shade, 255]),
        ));
        TransformedClip::from_image(index, &image, duration, &render()).unwrap()
    }

    fn gradient_clip(index: usize, duration: f64, zoom_rate: f64) -> TransformedClip {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(18, 32, |x, _| {
            Rgba([x as u8 * 14, 0, 0, 255])
        }));
        let render = RenderConfig {
            zoom_rate,
            ..render()
        };
        TransformedClip::from_image(index, &image, duration, &render).unwrap()
    }

    #[test]
    fn zoom_animates_within_a_clip_and_restarts_per_clip() {
        let mut sink = InMemorySink::default();
        let audio = AudioTrack::new("voiceover.mp3", 2.0);
        let clips = vec![gradient_clip(1, 1.0, 0.5), gradient_clip(2, 1.0, 0.5)];

        Sequencer::new(10).run(&clips, &audio, &mut sink).unwrap();

        let frames = &sink.frames;
        assert_eq!(frames.len(), 20);
        assert_ne!(frames[0], frames[9]);
        assert_ne!(frames[0], frames[1]);
        // Edge columns pull toward the center as the zoom grows.
        assert!(frames[9].get_pixel(0, 16)[0] > frames[0].get_pixel(0, 16)[0]);
        assert_eq!(frames[10], frames[0]);
        assert_eq!(frames[19], frames[9]);
    }

    #[test]
    fn final_clip_absorbs_rounding() {
        let seq = Sequencer::new(10);
        let slot = 1.0 / 3.0;
        let clips = vec![clip(1, slot, 0), clip(2, slot, 0), clip(3, slot, 0)];
        let counts = seq.frame_counts(&clips, 1.0);
        assert_eq!(counts, vec![3, 4, 3]);
        assert_eq!(counts.iter().sum::<u64>(), 10);
    }

    #[test]
    fn short_clips_are_padded_to_audio_length() {
        let seq = Sequencer::new(24);
        let clips = vec![clip(1, 7.4, 0), clip(2, 7.4, 0)];
        assert_eq!(seq.frame_counts(&clips, 15.0), vec![178, 182]);
    }

    #[test]
    fn long_clips_are_trimmed_to_audio_length() {
        let seq = Sequencer::new(10);
        let clips = vec![clip(1, 2.0, 0), clip(2, 2.0, 0)];
        assert_eq!(seq.frame_counts(&clips, 1.5), vec![15, 0]);
    }

    #[test]
    fn empty_sequence_fails_before_sink_starts() {
        let mut sink = InMemorySink::default();
        let audio = AudioTrack::new("voiceover.mp3", 30.0);
        let err = Sequencer::new(10).run(&[], &audio, &mut sink).unwrap_err();
        assert!(matches!(err, VideoError::EmptySequence));
        assert!(sink.config.is_none());
    }

    #[test]
    fn clips_play_in_order_under_the_audio() {
        let mut sink = InMemorySink::default();
        let audio = AudioTrack::new("voiceover.mp3", 2.0);
        let clips = vec![clip(1, 1.0, 10), clip(2, 1.0, 200)];

        let summary = Sequencer::new(10).run(&clips, &audio, &mut sink).unwrap();

        assert_eq!(summary.clip_frames, vec![10, 10]);
        assert_eq!(summary.total_frames, 20);
        assert_eq!(sink.frames.len(), 20);
        assert!(sink.finished);
        let cfg = sink.config.unwrap();
        assert_eq!((cfg.width, cfg.height, cfg.fps), (18, 32, 10));
        assert_eq!(cfg.audio.as_deref(), Some(std::path::Path::new("voiceover.mp3")));
        assert_eq!(cfg.duration, 2.0);
        assert_eq!(sink.frames[0].get_pixel(9, 16)[0], 10);
        assert_eq!(sink.frames[9].get_pixel(9, 16)[0], 10);
        assert_eq!(sink.frames[10].get_pixel(9, 16)[0], 200);
        assert_eq!(sink.frames[19].get_pixel(9, 16)[0], 200);
    }
}
