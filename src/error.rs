//! Error types
//!
//! `ClusterError` is what collaborators (factories, descriptors, clients,
//! graph builders) report. `LaneError` is what the coordinators return: one
//! variant per failure kind, tagged with the operation context in which it
//! happened.

use std::error::Error;
use std::fmt;
use std::io;

use lane_protocol::{ClusterId, ErrorCode, ExecutionMode, JobIdError};

use crate::rest::transport::TransportError;

/// Errors reported by cluster-side collaborators
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Cluster unreachable: {0}")]
    Unreachable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    #[error("Transport error")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("I/O error")]
    Io(#[from] io::Error),
}

/// Where an error happened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// `submit` or `stop`
    pub operation: Option<&'static str>,
    pub mode: Option<ExecutionMode>,
    pub cluster_id: Option<ClusterId>,
    /// Phase that was being entered when the error occurred
    pub step: Option<&'static str>,
}

impl ErrorContext {
    pub fn new(operation: &'static str, mode: ExecutionMode) -> Self {
        Self {
            operation: Some(operation),
            mode: Some(mode),
            cluster_id: None,
            step: None,
        }
    }

    pub fn with_cluster_id(mut self, cluster_id: Option<ClusterId>) -> Self {
        self.cluster_id = cluster_id;
        self
    }

    pub fn with_step(mut self, step: &'static str) -> Self {
        self.step = Some(step);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.operation.is_none()
            && self.mode.is_none()
            && self.cluster_id.is_none()
            && self.step.is_none()
    }

    /// Fill fields that are unset here from `other`
    fn or(mut self, other: &ErrorContext) -> Self {
        self.operation = self.operation.or(other.operation);
        self.mode = self.mode.or(other.mode);
        if self.cluster_id.is_none() {
            self.cluster_id = other.cluster_id.clone();
        }
        self.step = self.step.or(other.step);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::new();
        if let Some(op) = self.operation {
            parts.push(op.to_string());
        }
        if let Some(mode) = self.mode {
            parts.push(format!("mode={}", mode));
        }
        if let Some(ref cluster_id) = self.cluster_id {
            parts.push(format!("cluster={}", cluster_id));
        }
        if let Some(step) = self.step {
            parts.push(format!("step={}", step));
        }
        write!(f, " [{}]", parts.join(" "))
    }
}

/// Errors returned by the submit and stop coordinators
#[derive(Debug, thiserror::Error)]
pub enum LaneError {
    #[error("Configuration error{context}: {message}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Cluster resolution failed{context}: {message}")]
    ClusterResolution {
        message: String,
        context: ErrorContext,
        #[source]
        source: Option<ClusterError>,
    },

    #[error("Cluster connection failed{context}")]
    ClusterConnection {
        context: ErrorContext,
        #[source]
        source: ClusterError,
    },

    #[error("Job graph error{context}")]
    JobGraph {
        context: ErrorContext,
        #[source]
        source: ClusterError,
    },

    #[error("Submission failed{context}")]
    Submission {
        context: ErrorContext,
        #[source]
        source: ClusterError,
    },

    #[error("Cancellation failed{context}")]
    Cancellation {
        context: ErrorContext,
        #[source]
        source: ClusterError,
    },

    #[error("Invalid job id{context}")]
    InvalidJobId {
        context: ErrorContext,
        #[source]
        source: JobIdError,
    },

    #[error("Cleanup of {resource} failed{context}")]
    Cleanup {
        resource: &'static str,
        context: ErrorContext,
        #[source]
        source: ClusterError,
    },
}

impl LaneError {
    pub fn configuration(message: impl Into<String>) -> Self {
        LaneError::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn resolution(message: impl Into<String>, source: Option<ClusterError>) -> Self {
        LaneError::ClusterResolution {
            message: message.into(),
            context: ErrorContext::default(),
            source,
        }
    }

    /// Stable error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            LaneError::Configuration { .. } => ErrorCode::ConfigurationError,
            LaneError::ClusterResolution { .. } => ErrorCode::ClusterResolutionError,
            LaneError::ClusterConnection { .. } => ErrorCode::ClusterConnectionError,
            LaneError::JobGraph { .. } => ErrorCode::JobGraphError,
            LaneError::Submission { .. } => ErrorCode::SubmissionError,
            LaneError::Cancellation { .. } => ErrorCode::CancellationError,
            LaneError::InvalidJobId { .. } => ErrorCode::InvalidJobIdError,
            LaneError::Cleanup { .. } => ErrorCode::CleanupError,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.code() {
            ErrorCode::ConfigurationError => 10,
            ErrorCode::InvalidJobIdError => 12,
            ErrorCode::ClusterResolutionError => 20,
            ErrorCode::ClusterConnectionError => 21,
            ErrorCode::JobGraphError => 30,
            ErrorCode::SubmissionError => 40,
            ErrorCode::CancellationError => 41,
            ErrorCode::CleanupError => 50,
        }
    }

    pub fn context(&self) -> &ErrorContext {
        match self {
            LaneError::Configuration { context, .. }
            | LaneError::ClusterResolution { context, .. }
            | LaneError::ClusterConnection { context, .. }
            | LaneError::JobGraph { context, .. }
            | LaneError::Submission { context, .. }
            | LaneError::Cancellation { context, .. }
            | LaneError::InvalidJobId { context, .. }
            | LaneError::Cleanup { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            LaneError::Configuration { context, .. }
            | LaneError::ClusterResolution { context, .. }
            | LaneError::ClusterConnection { context, .. }
            | LaneError::JobGraph { context, .. }
            | LaneError::Submission { context, .. }
            | LaneError::Cancellation { context, .. }
            | LaneError::InvalidJobId { context, .. }
            | LaneError::Cleanup { context, .. } => context,
        }
    }

    /// Message including every source in the chain
    pub fn report(&self) -> String {
        report(self)
    }

    /// Add operation context. Fields already set on the error are kept.
    pub fn in_context(mut self, context: &ErrorContext) -> Self {
        let current = std::mem::take(self.context_mut());
        *self.context_mut() = current.or(context);
        self
    }
}

/// Render an error with its whole source chain, `outer: inner: ...`
pub fn report(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Result type for coordinator operations
pub type LaneResult<T> = Result<T, LaneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        let context = ErrorContext::new("submit", ExecutionMode::YarnSession)
            .with_cluster_id(ClusterId::new("application_123_0001"))
            .with_step("client-retrieved");

        assert_eq!(
            context.to_string(),
            " [submit mode=yarn-session cluster=application_123_0001 step=client-retrieved]"
        );
        assert_eq!(ErrorContext::default().to_string(), "");
    }

    #[test]
    fn test_in_context_keeps_existing_fields() {
        let err = LaneError::Configuration {
            message: "missing".to_string(),
            context: ErrorContext::default().with_step("config-set"),
        };
        let context = ErrorContext::new("stop", ExecutionMode::Remote).with_step("cluster-resolved");

        let err = err.in_context(&context);
        assert_eq!(err.context().step, Some("config-set"));
        assert_eq!(err.context().operation, Some("stop"));
        assert_eq!(err.context().mode, Some(ExecutionMode::Remote));
    }

    #[test]
    fn test_error_codes() {
        let err = LaneError::configuration("yarn.application.id is missing");
        assert_eq!(err.code(), ErrorCode::ConfigurationError);
        assert_eq!(err.exit_code(), 10);

        let err = LaneError::Submission {
            context: ErrorContext::default(),
            source: ClusterError::Rejected("no slots".to_string()),
        };
        assert_eq!(err.code(), ErrorCode::SubmissionError);
        assert_eq!(err.exit_code(), 40);
        assert!(err.report().contains("no slots"));
    }

    #[test]
    fn test_source_chain() {
        let err = LaneError::ClusterConnection {
            context: ErrorContext::default(),
            source: ClusterError::Unreachable("connection refused".to_string()),
        };
        let source = err.source().unwrap();
        assert!(source.to_string().contains("connection refused"));
    }

    #[test]
    fn test_report_prints_each_cause_once() {
        let err = LaneError::Submission {
            context: ErrorContext::new("submit", ExecutionMode::Remote),
            source: ClusterError::Transport(TransportError::ConnectionFailed(
                "connection refused".to_string(),
            )),
        };

        assert_eq!(err.to_string(), "Submission failed [submit mode=remote]");
        assert_eq!(
            err.report(),
            "Submission failed [submit mode=remote]: Transport error: Connection failed: connection refused"
        );
        assert_eq!(err.report().matches("connection refused").count(), 1);
    }
}
