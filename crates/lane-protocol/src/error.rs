//! Stable error codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes reported for failed submit/stop operations.
///
/// These codes are stable and used for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A required configuration field is missing or invalid.
    ConfigurationError,
    /// No client factory applies, or the cluster id lookup failed.
    ClusterResolutionError,
    /// The descriptor could not retrieve a client for the cluster.
    ClusterConnectionError,
    /// The packaged program or job graph could not be built.
    JobGraphError,
    /// The resource manager rejected the submission.
    SubmissionError,
    /// The resource manager rejected the cancellation.
    CancellationError,
    /// The job id is not a valid identifier.
    InvalidJobIdError,
    /// Releasing a handle failed. Never returned to callers, only logged.
    CleanupError,
}

impl ErrorCode {
    /// Whether retrying the whole operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ClusterConnectionError | Self::SubmissionError | Self::CancellationError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigurationError => write!(f, "CONFIGURATION_ERROR"),
            Self::ClusterResolutionError => write!(f, "CLUSTER_RESOLUTION_ERROR"),
            Self::ClusterConnectionError => write!(f, "CLUSTER_CONNECTION_ERROR"),
            Self::JobGraphError => write!(f, "JOB_GRAPH_ERROR"),
            Self::SubmissionError => write!(f, "SUBMISSION_ERROR"),
            Self::CancellationError => write!(f, "CANCELLATION_ERROR"),
            Self::InvalidJobIdError => write!(f, "INVALID_JOB_ID_ERROR"),
            Self::CleanupError => write!(f, "CLEANUP_ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde() {
        let code = ErrorCode::InvalidJobIdError;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, format!("\"{}\"", code));
    }

    #[test]
    fn test_configuration_is_not_retryable() {
        assert!(!ErrorCode::ConfigurationError.is_retryable());
        assert!(ErrorCode::ClusterConnectionError.is_retryable());
    }
}
