mod parser;
mod timing;

pub use parser::parse_generation;
pub use timing::slot_duration;

use std::path::PathBuf;

/// Script and ordered scene prompts returned by the text-generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedContent {
    /// Spoken narration.
    pub script: String,
    /// One image prompt per scene, in playback order.
    pub visual_prompts: Vec<String>,
}

/// One scene with its generated image on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// 1-based position in the prompt list.
    pub index: usize,
    pub prompt: String,
    pub image_path: PathBuf,
}

impl Scene {
    pub fn new(index: usize, prompt: String, image_path: PathBuf) -> Self {
        Self {
            index,
            prompt,
            image_path,
        }
    }
}
