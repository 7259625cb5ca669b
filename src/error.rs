// Typed errors with thiserror. Surface meaningful messages to JS.
// Load failures and not-ready interaction are viewer state, not errors.

use thiserror::Error;

/// Viewer error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Load ticket for frame {index} does not belong to a {frame_count}-frame set")]
    UnknownTicket { index: u32, frame_count: u32 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        ViewerError::Serialization(err.to_string())
    }
}
