//! Submit operation types.
//!
//! A submit request is built once by the caller and never modified
//! afterwards; the response is the durable reference a later stop
//! depends on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::ids::{ClusterId, JobId};
use crate::mode::ExecutionMode;
use crate::EXTRA_CLUSTER_ID;

/// Savepoint to restore the job from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavepointRestore {
    /// Savepoint or retained checkpoint location
    pub path: String,
    /// Skip state that cannot be mapped to the new program
    #[serde(default)]
    pub allow_non_restored_state: bool,
}

/// Submit request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Deployment mode
    pub mode: ExecutionMode,
    /// Path to the packaged program artifact
    pub artifact: PathBuf,
    /// Mode-specific parameters (e.g. `cluster-id`)
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
    /// Whether the coordinator closes the packaged program after submission.
    /// Callers that keep using the program handle set this to false.
    #[serde(default = "default_true")]
    pub release_program: bool,
    /// Job name shown by the resource manager
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    /// Fully qualified entry class, if the artifact manifest does not name one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_class: Option<String>,
    /// Arguments passed to the program's main method
    #[serde(default)]
    pub args: Vec<String>,
    /// Default parallelism
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u32>,
    /// Savepoint restore settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savepoint: Option<SavepointRestore>,
    /// Dynamic properties merged into the native configuration
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl SubmitRequest {
    pub fn new(mode: ExecutionMode, artifact: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            artifact: artifact.into(),
            extra: BTreeMap::new(),
            release_program: true,
            job_name: None,
            entry_class: None,
            args: Vec::new(),
            parallelism: None,
            savepoint: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Shorthand for the `cluster-id` extra parameter
    pub fn with_cluster_id(self, cluster_id: impl Into<String>) -> Self {
        self.with_extra(EXTRA_CLUSTER_ID, cluster_id)
    }

    pub fn with_release_program(mut self, release: bool) -> Self {
        self.release_program = release;
        self
    }

    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    pub fn with_entry_class(mut self, class: impl Into<String>) -> Self {
        self.entry_class = Some(class.into());
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    pub fn with_savepoint(mut self, savepoint: SavepointRestore) -> Self {
        self.savepoint = Some(savepoint);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The `cluster-id` extra parameter, if present and non-blank
    pub fn cluster_id(&self) -> Option<&str> {
        self.extra
            .get(EXTRA_CLUSTER_ID)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// Job name, falling back to the artifact file stem
    pub fn effective_job_name(&self) -> String {
        self.job_name.clone().unwrap_or_else(|| {
            Path::new(&self.artifact)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "job".to_string())
        })
    }
}

/// Submit response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Cluster (application) the job was submitted to
    pub cluster_id: ClusterId,
    /// Effective native configuration used for the submission
    pub configuration: BTreeMap<String, String>,
    /// Resource-manager-issued job id
    pub job_id: JobId,
    /// When the resource manager acknowledged the submission
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let request = SubmitRequest::new(ExecutionMode::YarnSession, "job.jar")
            .with_cluster_id("application_123_0001")
            .with_parallelism(4)
            .with_args(vec!["--input".to_string(), "hdfs:///in".to_string()]);

        assert_eq!(request.cluster_id(), Some("application_123_0001"));
        assert_eq!(request.parallelism, Some(4));
        assert!(request.release_program);
        assert_eq!(request.effective_job_name(), "job");
    }

    #[test]
    fn test_blank_cluster_id_is_absent() {
        let request = SubmitRequest::new(ExecutionMode::YarnSession, "job.jar").with_cluster_id("  ");
        assert_eq!(request.cluster_id(), None);
    }

    #[test]
    fn test_deserialize_defaults() {
        let request: SubmitRequest = serde_json::from_str(
            r#"{"mode": "yarn-session", "artifact": "job.jar", "extra": {"cluster-id": "application_1_2"}}"#,
        )
        .unwrap();

        assert_eq!(request.mode, ExecutionMode::YarnSession);
        assert!(request.release_program);
        assert!(request.args.is_empty());
        assert_eq!(request.cluster_id(), Some("application_1_2"));
    }
}
