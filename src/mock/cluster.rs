//! In-process fake cluster
//!
//! One `FakeCluster` backs every fake collaborator built from it. All of
//! them append to a shared event log, so tests can check how often each
//! handle was closed and in which order.

use lane_protocol::{ClusterId, JobId, SubmitRequest};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use super::failure::{FailureConfig, FailureInjector, FakeStep};
use crate::cluster::{native_cluster_id, CancelOptions, ClientFactory, ClusterClient, ClusterDescriptor};
use crate::config::Configuration;
use crate::error::ClusterError;
use crate::graph::{BuiltJob, JobGraph, JobGraphBuilder, PackagedProgram};

pub const EVENT_DESCRIPTOR_CREATE: &str = "descriptor.create";
pub const EVENT_DESCRIPTOR_CLOSE: &str = "descriptor.close";
pub const EVENT_CLIENT_RETRIEVE: &str = "client.retrieve";
pub const EVENT_CLIENT_SUBMIT: &str = "client.submit";
pub const EVENT_CLIENT_CANCEL: &str = "client.cancel";
pub const EVENT_CLIENT_CLOSE: &str = "client.close";
pub const EVENT_PROGRAM_BUILD: &str = "program.build";
pub const EVENT_PROGRAM_CLOSE: &str = "program.close";

/// Job id the fake cluster hands out unless told otherwise
pub const DEFAULT_JOB_ID: &str = "abcd1234ef";

#[derive(Debug)]
struct FakeState {
    events: Vec<&'static str>,
    remote_calls: u32,
    known_clusters: BTreeSet<String>,
    job_id: String,
    cancel_ack: String,
    submitted: Vec<JobGraph>,
    cancelled: Vec<(JobId, CancelOptions)>,
    failures: FailureInjector,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            remote_calls: 0,
            known_clusters: BTreeSet::new(),
            job_id: DEFAULT_JOB_ID.to_string(),
            cancel_ack: String::new(),
            submitted: Vec::new(),
            cancelled: Vec::new(),
            failures: FailureInjector::new(),
        }
    }
}

/// Shared state of the fake cluster
#[derive(Debug, Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Job id returned by every submission
    pub fn with_job_id(self, job_id: impl Into<String>) -> Self {
        self.state.lock().unwrap().job_id = job_id.into();
        self
    }

    /// Acknowledgement returned by every cancel
    pub fn with_cancel_ack(self, ack: impl Into<String>) -> Self {
        self.state.lock().unwrap().cancel_ack = ack.into();
        self
    }

    /// Restrict retrieval to known cluster ids. With none registered,
    /// every id is accepted.
    pub fn with_known_cluster(self, cluster_id: impl Into<String>) -> Self {
        self.state.lock().unwrap().known_clusters.insert(cluster_id.into());
        self
    }

    /// Inject a failure into a step
    pub fn fail(&self, step: FakeStep, config: FailureConfig) {
        self.state.lock().unwrap().failures.inject(step, config);
    }

    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().events.clone()
    }

    /// How many times `event` was recorded
    pub fn count(&self, event: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| **e == event)
            .count()
    }

    /// Position of the first `event` in the log
    pub fn position(&self, event: &str) -> Option<usize> {
        self.state.lock().unwrap().events.iter().position(|e| *e == event)
    }

    /// Calls that would cross the network (retrieve, submit, cancel)
    pub fn remote_calls(&self) -> u32 {
        self.state.lock().unwrap().remote_calls
    }

    pub fn submitted(&self) -> Vec<JobGraph> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn cancelled(&self) -> Vec<(JobId, CancelOptions)> {
        self.state.lock().unwrap().cancelled.clone()
    }

    /// Apply any failure injected into `step` and record `event`.
    ///
    /// Acquisitions and calls are only logged when they succeed. Close
    /// attempts are always logged, failed or not.
    fn step(&self, step: FakeStep, event: &'static str, remote: bool) -> Result<(), ClusterError> {
        let is_close = matches!(
            step,
            FakeStep::CloseClient | FakeStep::CloseDescriptor | FakeStep::CloseProgram
        );
        let (delay, error) = {
            let mut state = self.state.lock().unwrap();
            if remote {
                state.remote_calls += 1;
            }
            let delay = state.failures.get_delay(step);
            let error = state.failures.check(step).and_then(FailureConfig::to_error);
            if error.is_none() || is_close {
                state.events.push(event);
            }
            (delay, error)
        };
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Fake factory for one deployment target
#[derive(Debug, Clone)]
pub struct FakeClientFactory {
    target: String,
    cluster: FakeCluster,
}

impl FakeClientFactory {
    pub fn new(target: impl Into<String>, cluster: &FakeCluster) -> Self {
        Self {
            target: target.into(),
            cluster: cluster.clone(),
        }
    }
}

impl ClientFactory for FakeClientFactory {
    fn target(&self) -> &str {
        &self.target
    }

    fn cluster_id(&self, config: &Configuration) -> Result<Option<ClusterId>, ClusterError> {
        native_cluster_id(config)
    }

    fn create_descriptor(&self, _config: &Configuration) -> Result<Box<dyn ClusterDescriptor>, ClusterError> {
        self.cluster
            .step(FakeStep::ResolveCluster, EVENT_DESCRIPTOR_CREATE, false)?;
        Ok(Box::new(FakeDescriptor {
            cluster: self.cluster.clone(),
        }))
    }
}

/// Fake descriptor. Records every close, including repeated ones.
#[derive(Debug)]
pub struct FakeDescriptor {
    cluster: FakeCluster,
}

impl ClusterDescriptor for FakeDescriptor {
    fn retrieve(&self, cluster_id: &ClusterId) -> Result<Box<dyn ClusterClient>, ClusterError> {
        self.cluster
            .step(FakeStep::RetrieveClient, EVENT_CLIENT_RETRIEVE, true)?;
        let known = {
            let state = self.cluster.state.lock().unwrap();
            state.known_clusters.is_empty() || state.known_clusters.contains(cluster_id.as_str())
        };
        if !known {
            return Err(ClusterError::NotFound(format!(
                "cluster {} does not exist",
                cluster_id
            )));
        }
        Ok(Box::new(FakeClient {
            cluster: self.cluster.clone(),
            cluster_id: cluster_id.clone(),
        }))
    }

    fn close(&mut self) -> Result<(), ClusterError> {
        self.cluster
            .step(FakeStep::CloseDescriptor, EVENT_DESCRIPTOR_CLOSE, false)
    }
}

/// Fake connected client
#[derive(Debug)]
pub struct FakeClient {
    cluster: FakeCluster,
    cluster_id: ClusterId,
}

impl ClusterClient for FakeClient {
    fn cluster_id(&self) -> &ClusterId {
        &self.cluster_id
    }

    fn submit_job(&mut self, graph: &JobGraph) -> Result<JobId, ClusterError> {
        self.cluster.step(FakeStep::Submit, EVENT_CLIENT_SUBMIT, true)?;
        let mut state = self.cluster.state.lock().unwrap();
        state.submitted.push(graph.clone());
        JobId::parse(&state.job_id).map_err(|e| ClusterError::Protocol(e.to_string()))
    }

    fn cancel(&mut self, job_id: &JobId, options: &CancelOptions) -> Result<String, ClusterError> {
        self.cluster.step(FakeStep::Cancel, EVENT_CLIENT_CANCEL, true)?;
        let mut state = self.cluster.state.lock().unwrap();
        state.cancelled.push((job_id.clone(), options.clone()));
        Ok(state.cancel_ack.clone())
    }

    fn close(&mut self) -> Result<(), ClusterError> {
        self.cluster.step(FakeStep::CloseClient, EVENT_CLIENT_CLOSE, false)
    }
}

/// Fake graph builder. Never touches the artifact on disk.
#[derive(Debug, Clone)]
pub struct FakeGraphBuilder {
    cluster: FakeCluster,
}

impl FakeGraphBuilder {
    pub fn new(cluster: &FakeCluster) -> Self {
        Self {
            cluster: cluster.clone(),
        }
    }
}

impl JobGraphBuilder for FakeGraphBuilder {
    fn build(&self, request: &SubmitRequest, config: &Configuration) -> Result<BuiltJob, ClusterError> {
        self.cluster
            .step(FakeStep::BuildGraph, EVENT_PROGRAM_BUILD, false)?;
        let graph = JobGraph::from_request(request, config)?;
        Ok(BuiltJob {
            program: Box::new(FakeProgram {
                cluster: self.cluster.clone(),
                artifact: request.artifact.clone(),
            }),
            graph,
        })
    }
}

/// Fake packaged program
#[derive(Debug)]
pub struct FakeProgram {
    cluster: FakeCluster,
    artifact: PathBuf,
}

impl PackagedProgram for FakeProgram {
    fn artifact(&self) -> &Path {
        &self.artifact
    }

    fn close(&mut self) -> Result<(), ClusterError> {
        self.cluster
            .step(FakeStep::CloseProgram, EVENT_PROGRAM_CLOSE, false)
    }
}
