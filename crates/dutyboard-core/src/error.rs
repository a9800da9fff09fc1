//! Error types shared by every DutyBoard crate.

/// Errors surfaced by configuration, transport and decoding.
///
/// None of these are fatal to the sync engine: callers log them and fall back
/// to the last known good board.
#[derive(Debug, thiserror::Error)]
pub enum DutyBoardError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DutyBoardError>;
