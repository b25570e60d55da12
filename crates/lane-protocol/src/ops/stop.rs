//! Stop operation types.
//!
//! The cancel fields are handed to the resource manager as they are;
//! nothing here decides between graceful and forced termination.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::mode::ExecutionMode;
use crate::EXTRA_CLUSTER_ID;

/// Stop request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRequest {
    /// Textual job id, as returned in a submit response
    pub job_id: String,
    /// Deployment mode the job was submitted with
    pub mode: ExecutionMode,
    /// Mode-specific parameters (must carry `cluster-id` for session modes)
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
    /// Take a savepoint before the job goes away
    #[serde(default)]
    pub with_savepoint: bool,
    /// Savepoint target directory (cluster default when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savepoint_dir: Option<String>,
    /// Emit MAX_WATERMARK and drain sources before stopping
    #[serde(default)]
    pub drain: bool,
}

impl StopRequest {
    pub fn new(job_id: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            job_id: job_id.into(),
            mode,
            extra: BTreeMap::new(),
            with_savepoint: false,
            savepoint_dir: None,
            drain: false,
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_cluster_id(self, cluster_id: impl Into<String>) -> Self {
        self.with_extra(EXTRA_CLUSTER_ID, cluster_id)
    }

    pub fn with_savepoint(mut self, dir: Option<String>) -> Self {
        self.with_savepoint = true;
        self.savepoint_dir = dir;
        self
    }

    pub fn with_drain(mut self, drain: bool) -> Self {
        self.drain = drain;
        self
    }

    pub fn cluster_id(&self) -> Option<&str> {
        self.extra
            .get(EXTRA_CLUSTER_ID)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// Stop response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopResponse {
    /// Resource manager acknowledgement, e.g. the savepoint location.
    /// Empty for a plain cancel.
    pub ack: String,
}
