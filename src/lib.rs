//! Cluster Lane - submit and stop jobs on shared compute clusters
//!
//! This crate implements the control-plane side of a job lane: it takes a
//! declarative submit or stop request, translates it into the cluster's
//! native configuration, acquires a cluster descriptor and client, performs
//! the remote call and releases every acquired handle on every exit path.

pub mod cluster;
pub mod config;
pub mod error;
pub mod graph;
pub mod lane;
pub mod mock;
pub mod release;
pub mod rest;
pub mod state;
pub mod stop;
pub mod submit;
pub mod translate;

pub use cluster::{CancelOptions, ClientFactory, ClusterClient, ClusterDescriptor, ClusterHandle, ClusterHandleProvider, FactoryRegistry};
pub use config::{Configuration, EffectiveConfig};
pub use error::{ClusterError, ErrorContext, LaneError, LaneResult};
pub use graph::{BuiltJob, JarGraphBuilder, JobGraph, JobGraphBuilder, PackagedProgram};
pub use lane::ClusterLane;
pub use release::{Release, ReleaseStack};
pub use stop::StopCoordinator;
pub use submit::SubmitCoordinator;
pub use translate::ConfigTranslator;

pub use lane_protocol::{
    ClusterId, ErrorCode, ExecutionMode, JobId, SavepointRestore, StopRequest, StopResponse,
    SubmitRequest, SubmitResponse,
};
