use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelforgeError {
    #[error("Invalid duration: {seconds} seconds")]
    InvalidDuration { seconds: f64 },

    #[error("Voice synthesis failed: {reason}")]
    Synthesis { reason: String },

    #[error("No footage for \"{query}\": {reason}")]
    FootageUnavailable { query: String, reason: String },

    #[error("Invalid script: {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Render failed: {reason}")]
    Render { reason: String },

    #[error("Build cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ReelforgeError>;
