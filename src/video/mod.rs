mod audio;
mod ffmpeg;
mod generator;
mod sequencer;
mod sink;
mod transform;

pub use audio::AudioTrack;
pub use generator::VideoGenerator;

#[cfg(test)]
pub use generator::render_scenes;
#[cfg(test)]
pub use sink::InMemorySink;
