use thiserror::Error;

use crate::validate::ValidationReport;

#[derive(Debug, Error)]
pub enum ForgeError {
    // Graph errors
    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Repository errors
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Backend returned HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ForgeError {
    /// Whether the backend could not be reached (or failed on its side).
    ///
    /// Only these errors make a save fall back to the local cache.
    pub fn is_transport(&self) -> bool {
        match self {
            ForgeError::Transport(_) => true,
            ForgeError::Backend { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
