//! Fake cluster for tests
//!
//! In-process stand-ins for every cluster-side collaborator: client
//! factories, descriptors, clients, graph builders and packaged programs.
//! They share one event log and one failure injector.
//!
//! # Events
//!
//! - `descriptor.create` / `descriptor.close`
//! - `client.retrieve` / `client.close`
//! - `client.submit` / `client.cancel`
//! - `program.build` / `program.close`

mod cluster;
mod failure;

pub use cluster::{
    FakeClient, FakeClientFactory, FakeCluster, FakeDescriptor, FakeGraphBuilder, FakeProgram,
    DEFAULT_JOB_ID, EVENT_CLIENT_CANCEL, EVENT_CLIENT_CLOSE, EVENT_CLIENT_RETRIEVE,
    EVENT_CLIENT_SUBMIT, EVENT_DESCRIPTOR_CLOSE, EVENT_DESCRIPTOR_CREATE, EVENT_PROGRAM_BUILD,
    EVENT_PROGRAM_CLOSE,
};
pub use failure::{FailureConfig, FailureInjector, FailureKind, FakeStep};

use lane_protocol::ExecutionMode;
use std::sync::Arc;

use crate::cluster::FactoryRegistry;

/// Registry with a fake factory for every execution mode
pub fn registry(cluster: &FakeCluster) -> FactoryRegistry {
    let mut registry = FactoryRegistry::new();
    for mode in ExecutionMode::ALL {
        registry.register(Arc::new(FakeClientFactory::new(mode.target_name(), cluster)));
    }
    registry
}
