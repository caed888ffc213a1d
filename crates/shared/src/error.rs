//! Wire decoding errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Change notification for a table this client doesn't sync
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProtocolError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }
}
