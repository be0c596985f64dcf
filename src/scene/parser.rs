use serde::Deserialize;

use super::GeneratedContent;
use crate::error::{Result, VideoError};

#[derive(Deserialize)]
struct Payload {
    script: Option<String>,
    visual_prompts: Option<Vec<String>>,
}

/// Decode `{script, visual_prompts}` out of free-form model text.
///
/// Code-fence markers are stripped before parsing. The raw text is kept on
/// every error so callers can log it.
pub fn parse_generation(raw: &str) -> Result<GeneratedContent> {
    let malformed = |reason: String| VideoError::MalformedGeneration {
        reason,
        raw: raw.to_string(),
    };

    let json_text = raw.replace("```json", "").replace("```", "");
    let payload: Payload = serde_json::from_str(json_text.trim())
        .map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    let script = payload
        .script
        .ok_or_else(|| malformed("missing `script`".to_string()))?;
    let visual_prompts = payload
        .visual_prompts
        .ok_or_else(|| malformed("missing `visual_prompts`".to_string()))?;

    let script = script.trim().to_string();
    if script.is_empty() {
        return Err(malformed("`script` is empty".to_string()));
    }
    if visual_prompts.is_empty() {
        return Err(VideoError::NoScenes);
    }

    Ok(GeneratedContent {
        script,
        visual_prompts: visual_prompts
            .into_iter()
            .map(|p| p.trim().to_string())
            .collect(),
    })
}
