//! Avatalk Error Types
//!
//! Centralized error handling for the chat/speech/animation pipeline.

use thiserror::Error;

/// Central error type for Avatalk
#[derive(Error, Debug)]
pub enum AvaError {
    #[error("Chat transport error: {0}")]
    Transport(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Avatar asset error: {0}")]
    Asset(String),

    #[error("Voice index {index} out of range (catalog has {len} voices)")]
    Selection { index: usize, len: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Avatalk operations
pub type AvaResult<T> = Result<T, AvaError>;
