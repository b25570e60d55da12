//! Cluster handle contracts
//!
//! A `ClientFactory` knows one deployment target. It extracts the target
//! cluster id from the native configuration and builds a `ClusterDescriptor`,
//! which in turn retrieves a connected `ClusterClient`. Descriptors and
//! clients are scoped: whoever obtains one must close it, client first.

mod provider;
mod registry;

pub use provider::{ClusterHandle, ClusterHandleProvider};
pub use registry::FactoryRegistry;

use lane_protocol::{ClusterId, ExecutionMode, JobId, StopRequest};

use crate::config::{options, Configuration};
use crate::error::ClusterError;
use crate::graph::JobGraph;

/// Resolves cluster ids and descriptors for one deployment target
pub trait ClientFactory: Send + Sync {
    /// Target name this factory serves (value of `execution.target`)
    fn target(&self) -> &str;

    /// Target cluster id, or `None` when the configuration names none.
    /// Must not perform I/O.
    fn cluster_id(&self, config: &Configuration) -> Result<Option<ClusterId>, ClusterError>;

    /// Build a descriptor. Must not perform I/O.
    fn create_descriptor(
        &self,
        config: &Configuration,
    ) -> Result<Box<dyn ClusterDescriptor>, ClusterError>;
}

/// Short-lived capability to connect to a cluster
pub trait ClusterDescriptor: Send {
    /// Connect to a running cluster
    fn retrieve(&self, cluster_id: &ClusterId) -> Result<Box<dyn ClusterClient>, ClusterError>;

    /// Release the descriptor. Idempotent.
    fn close(&mut self) -> Result<(), ClusterError>;
}

/// Connected client for one cluster
pub trait ClusterClient: Send {
    fn cluster_id(&self) -> &ClusterId;

    /// Submit a job graph, blocking until the cluster accepts it
    fn submit_job(&mut self, graph: &JobGraph) -> Result<JobId, ClusterError>;

    /// Cancel a running job, returning the cluster's acknowledgement
    fn cancel(&mut self, job_id: &JobId, options: &CancelOptions) -> Result<String, ClusterError>;

    /// Release the client. Idempotent.
    fn close(&mut self) -> Result<(), ClusterError>;
}

/// How a job should be cancelled. Passed through to the client unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelOptions {
    pub with_savepoint: bool,
    pub savepoint_dir: Option<String>,
    pub drain: bool,
}

impl From<&StopRequest> for CancelOptions {
    fn from(request: &StopRequest) -> Self {
        Self {
            with_savepoint: request.with_savepoint,
            savepoint_dir: request.savepoint_dir.clone(),
            drain: request.drain,
        }
    }
}

/// Cluster id for the configured target, read from its native key.
///
/// Targets that deploy a dedicated cluster have no id to read.
pub fn native_cluster_id(config: &Configuration) -> Result<Option<ClusterId>, ClusterError> {
    let Some(target) = config.get(options::EXECUTION_TARGET) else {
        return Ok(None);
    };
    let mode: ExecutionMode = target
        .parse()
        .map_err(|e| ClusterError::Protocol(format!("{}", e)))?;

    let id = match mode {
        ExecutionMode::YarnSession => config.get(options::YARN_APPLICATION_ID).map(str::to_string),
        ExecutionMode::KubernetesSession => {
            config.get(options::KUBERNETES_CLUSTER_ID).map(str::to_string)
        }
        ExecutionMode::Remote => {
            let port = config
                .get_u16(options::REST_PORT)
                .map_err(|e| ClusterError::Protocol(e.to_string()))?;
            config.get(options::REST_ADDRESS).map(|host| match port {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            })
        }
        _ => None,
    };
    Ok(id.and_then(ClusterId::new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_cluster_id_per_target() {
        let config = Configuration::new()
            .with(options::EXECUTION_TARGET, "yarn-session")
            .with(options::YARN_APPLICATION_ID, "application_123_0001");
        assert_eq!(
            native_cluster_id(&config).unwrap().unwrap().as_str(),
            "application_123_0001"
        );

        let config = Configuration::new()
            .with(options::EXECUTION_TARGET, "kubernetes-session")
            .with(options::KUBERNETES_CLUSTER_ID, "session-a");
        assert_eq!(native_cluster_id(&config).unwrap().unwrap().as_str(), "session-a");

        let config = Configuration::new()
            .with(options::EXECUTION_TARGET, "remote")
            .with(options::REST_ADDRESS, "jm.local")
            .with(options::REST_PORT, "8081");
        assert_eq!(native_cluster_id(&config).unwrap().unwrap().as_str(), "jm.local:8081");
    }

    #[test]
    fn test_native_cluster_id_absent() {
        let config = Configuration::new().with(options::EXECUTION_TARGET, "yarn-session");
        assert!(native_cluster_id(&config).unwrap().is_none());

        let config = Configuration::new()
            .with(options::EXECUTION_TARGET, "yarn-session")
            .with(options::YARN_APPLICATION_ID, "  ");
        assert!(native_cluster_id(&config).unwrap().is_none());

        let config = Configuration::new().with(options::EXECUTION_TARGET, "yarn-per-job");
        assert!(native_cluster_id(&config).unwrap().is_none());

        assert!(native_cluster_id(&Configuration::new()).unwrap().is_none());
    }

    #[test]
    fn test_cancel_options_from_request() {
        let request = StopRequest::new("abcd", ExecutionMode::Remote)
            .with_savepoint(Some("/tmp/sp".to_string()))
            .with_drain(true);
        let options = CancelOptions::from(&request);

        assert!(options.with_savepoint);
        assert!(options.drain);
        assert_eq!(options.savepoint_dir.as_deref(), Some("/tmp/sp"));
    }
}
