use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Malformed generation output: {reason}")]
    MalformedGeneration { reason: String, raw: String },

    #[error("No scenes available to build a video")]
    NoScenes,

    #[error("Invalid audio duration: {0}")]
    InvalidDuration(f64),

    #[error("Failed to load asset for scene {index}: {reason}")]
    AssetLoad { index: usize, reason: String },

    #[error("Cannot sequence an empty clip list")]
    EmptySequence,

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("{stage} timed out after {seconds}s")]
    Timeout { stage: &'static str, seconds: u64 },

    #[error("API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VideoError {
    pub fn asset(index: usize, reason: impl ToString) -> Self {
        Self::AssetLoad {
            index,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VideoError>;
