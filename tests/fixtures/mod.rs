//! Shared setup for the lifecycle tests
//!
//! Lanes wired to an in-process `FakeCluster`, plus the session requests
//! most tests start from.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use cluster_lane::mock::{self, FakeCluster, FakeGraphBuilder};
use cluster_lane::{
    ClusterLane, Configuration, EffectiveConfig, ExecutionMode, FactoryRegistry, StopCoordinator,
    StopRequest, SubmitCoordinator, SubmitRequest,
};

pub const APP_ID: &str = "application_123_0001";
pub const JOB_ID: &str = "abcd1234ef";

/// Effective configuration with built-in defaults only
pub fn defaults() -> EffectiveConfig {
    EffectiveConfig::build(None, None, BTreeMap::new()).unwrap()
}

/// Lane whose every target is served by `cluster`
pub fn fake_lane(cluster: &FakeCluster) -> ClusterLane {
    ClusterLane::new(
        defaults(),
        mock::registry(cluster),
        Arc::new(FakeGraphBuilder::new(cluster)),
    )
}

pub fn fake_submitter(cluster: &FakeCluster) -> SubmitCoordinator {
    SubmitCoordinator::new(
        Arc::new(mock::registry(cluster)),
        Arc::new(FakeGraphBuilder::new(cluster)),
    )
}

pub fn fake_stopper(cluster: &FakeCluster) -> StopCoordinator {
    StopCoordinator::new(Arc::new(mock::registry(cluster)))
}

pub fn session_submit() -> SubmitRequest {
    SubmitRequest::new(ExecutionMode::YarnSession, "job.jar").with_cluster_id(APP_ID)
}

pub fn session_stop() -> StopRequest {
    StopRequest::new(JOB_ID, ExecutionMode::YarnSession).with_cluster_id(APP_ID)
}

pub fn native() -> Configuration {
    defaults().native()
}

pub fn empty_registry() -> FactoryRegistry {
    FactoryRegistry::new()
}
