//! Process-level entry point tying configuration, registry and builder together

use lane_protocol::{StopRequest, StopResponse, SubmitRequest, SubmitResponse};
use std::sync::Arc;

use crate::cluster::FactoryRegistry;
use crate::config::EffectiveConfig;
use crate::error::LaneResult;
use crate::graph::{JarGraphBuilder, JobGraphBuilder};
use crate::stop::StopCoordinator;
use crate::submit::SubmitCoordinator;

/// Submit and stop with a loaded configuration.
///
/// Every call works on its own copy of the native configuration, so one
/// `ClusterLane` can serve concurrent callers.
#[derive(Clone)]
pub struct ClusterLane {
    config: Arc<EffectiveConfig>,
    registry: Arc<FactoryRegistry>,
    submitter: SubmitCoordinator,
    stopper: StopCoordinator,
}

impl ClusterLane {
    pub fn new(
        config: EffectiveConfig,
        registry: FactoryRegistry,
        builder: Arc<dyn JobGraphBuilder>,
    ) -> Self {
        let registry = Arc::new(registry);
        Self {
            config: Arc::new(config),
            submitter: SubmitCoordinator::new(Arc::clone(&registry), builder),
            stopper: StopCoordinator::new(Arc::clone(&registry)),
            registry,
        }
    }

    /// REST-backed factories and the jar builder
    pub fn with_defaults(config: EffectiveConfig) -> Self {
        Self::new(
            config,
            FactoryRegistry::with_defaults(),
            Arc::new(JarGraphBuilder::new()),
        )
    }

    pub fn submit(&self, request: &SubmitRequest) -> LaneResult<SubmitResponse> {
        self.submitter.submit(request, self.config.native())
    }

    pub fn stop(&self, request: &StopRequest) -> LaneResult<StopResponse> {
        self.stopper.stop(request, self.config.native())
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }
}
