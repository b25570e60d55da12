//! Sink error types

/// Invalid or missing sink configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkConfigError {
    #[error("missing required key {0}")]
    Missing(String),

    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

/// Errors raised while writing to the backend
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Configuration error: {0}")]
    Config(#[from] SinkConfigError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Write action rejected (status {status:?}): {reason}")]
    Rejected { status: Option<u16>, reason: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Sink is closed")]
    Closed,
}

impl SinkError {
    /// Whether the whole request may succeed if sent again
    pub fn is_retryable(&self) -> bool {
        matches!(self, SinkError::Transport(_))
    }
}
