//! Cluster Lane Protocol Types
//!
//! Value types shared by the submit/stop coordinators, the CLI and
//! anything that stores a submission for a later stop.

pub mod error;
pub mod ids;
pub mod mode;
pub mod ops;

pub use error::ErrorCode;
pub use ids::{ClusterId, JobId, JobIdError};
pub use mode::{ExecutionMode, UnknownModeError};
pub use ops::{SavepointRestore, StopRequest, StopResponse, SubmitRequest, SubmitResponse};

/// Extra-parameter key carrying the target cluster identifier.
pub const EXTRA_CLUSTER_ID: &str = "cluster-id";
