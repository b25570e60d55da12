//! Cluster handle resolution

use lane_protocol::ClusterId;
use log::debug;

use super::{ClusterDescriptor, FactoryRegistry};
use crate::config::Configuration;
use crate::error::{LaneError, LaneResult};

/// A resolved cluster: its id plus a descriptor able to connect to it.
/// The descriptor must be closed by whoever takes it.
pub struct ClusterHandle {
    pub cluster_id: ClusterId,
    pub descriptor: Box<dyn ClusterDescriptor>,
}

impl std::fmt::Debug for ClusterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterHandle")
            .field("cluster_id", &self.cluster_id)
            .finish_non_exhaustive()
    }
}

/// Resolves the (cluster id, descriptor) pair for a native configuration
pub struct ClusterHandleProvider<'a> {
    registry: &'a FactoryRegistry,
}

impl<'a> ClusterHandleProvider<'a> {
    pub fn new(registry: &'a FactoryRegistry) -> Self {
        Self { registry }
    }

    /// Resolve factory, cluster id and descriptor. No network I/O happens
    /// here; a missing cluster id fails before the descriptor is built.
    pub fn resolve(&self, config: &Configuration) -> LaneResult<ClusterHandle> {
        let factory = self.registry.resolve(config)?;

        let cluster_id = factory
            .cluster_id(config)
            .map_err(|e| LaneError::resolution("cluster id lookup failed", Some(e)))?
            .ok_or_else(|| {
                LaneError::configuration(format!(
                    "target '{}' requires a cluster id but the configuration has none",
                    factory.target()
                ))
            })?;

        let descriptor = factory
            .create_descriptor(config)
            .map_err(|e| LaneError::resolution("descriptor creation failed", Some(e)))?;

        debug!("resolved {} cluster {}", factory.target(), cluster_id);
        Ok(ClusterHandle {
            cluster_id,
            descriptor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::options;
    use crate::mock::{self, FailureConfig, FailureKind, FakeCluster, FakeStep, EVENT_DESCRIPTOR_CREATE};
    use lane_protocol::ErrorCode;

    fn yarn_session(app_id: Option<&str>) -> Configuration {
        let config = Configuration::new().with(options::EXECUTION_TARGET, "yarn-session");
        match app_id {
            Some(id) => config.with(options::YARN_APPLICATION_ID, id),
            None => config,
        }
    }

    #[test]
    fn test_resolve_returns_cluster_id_and_descriptor() {
        let cluster = FakeCluster::new();
        let registry = mock::registry(&cluster);

        let handle = ClusterHandleProvider::new(&registry)
            .resolve(&yarn_session(Some("application_123_0001")))
            .unwrap();

        assert_eq!(handle.cluster_id.as_str(), "application_123_0001");
        assert_eq!(cluster.events(), vec![EVENT_DESCRIPTOR_CREATE]);
        assert_eq!(cluster.remote_calls(), 0);
    }

    #[test]
    fn test_missing_cluster_id_fails_before_descriptor() {
        let cluster = FakeCluster::new();
        let registry = mock::registry(&cluster);

        let err = ClusterHandleProvider::new(&registry)
            .resolve(&yarn_session(None))
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ConfigurationError);
        assert!(cluster.events().is_empty());
    }

    #[test]
    fn test_descriptor_failure_is_resolution_error() {
        let cluster = FakeCluster::new();
        cluster.fail(
            FakeStep::ResolveCluster,
            FailureConfig::error(FailureKind::Unreachable, "locator down"),
        );
        let registry = mock::registry(&cluster);

        let err = ClusterHandleProvider::new(&registry)
            .resolve(&yarn_session(Some("application_123_0001")))
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::ClusterResolutionError);
        assert!(std::error::Error::source(&err)
            .unwrap()
            .to_string()
            .contains("locator down"));
    }

    #[test]
    fn test_unregistered_target() {
        let registry = FactoryRegistry::new();
        let err = ClusterHandleProvider::new(&registry)
            .resolve(&yarn_session(Some("application_123_0001")))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ClusterResolutionError);
    }
}
