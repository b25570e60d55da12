//! Execution modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where and how a job is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Standalone cluster reached directly through its REST endpoint
    Remote,
    /// Dedicated YARN cluster per job
    YarnPerJob,
    /// Shared, already running YARN session cluster
    YarnSession,
    /// Dedicated YARN cluster running the application's main method
    YarnApplication,
    /// Shared, already running Kubernetes session cluster
    KubernetesSession,
    /// Dedicated Kubernetes cluster per application
    KubernetesApplication,
}

impl ExecutionMode {
    pub const ALL: [ExecutionMode; 6] = [
        ExecutionMode::Remote,
        ExecutionMode::YarnPerJob,
        ExecutionMode::YarnSession,
        ExecutionMode::YarnApplication,
        ExecutionMode::KubernetesSession,
        ExecutionMode::KubernetesApplication,
    ];

    /// The resource-manager-native `execution.target` name
    pub fn target_name(&self) -> &'static str {
        match self {
            ExecutionMode::Remote => "remote",
            ExecutionMode::YarnPerJob => "yarn-per-job",
            ExecutionMode::YarnSession => "yarn-session",
            ExecutionMode::YarnApplication => "yarn-application",
            ExecutionMode::KubernetesSession => "kubernetes-session",
            ExecutionMode::KubernetesApplication => "kubernetes-application",
        }
    }

    /// Whether the mode submits to a cluster that must already exist,
    /// identified by the `cluster-id` extra parameter.
    pub fn targets_existing_cluster(&self) -> bool {
        matches!(
            self,
            ExecutionMode::Remote | ExecutionMode::YarnSession | ExecutionMode::KubernetesSession
        )
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target_name())
    }
}

/// Returned when a mode name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown execution mode '{0}'")]
pub struct UnknownModeError(pub String);

impl FromStr for ExecutionMode {
    type Err = UnknownModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ExecutionMode::ALL
            .into_iter()
            .find(|mode| mode.target_name() == normalized)
            .ok_or_else(|| UnknownModeError(s.to_string()))
    }
}
