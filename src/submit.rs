//! Submit coordinator
//!
//! translate → resolve cluster → build graph → retrieve client → submit.
//! Every handle is pushed onto a `ReleaseStack` the moment it exists and the
//! stack is unwound on every exit path: client, then descriptor, then the
//! packaged program when the request hands it over.

use chrono::Utc;
use lane_protocol::{SubmitRequest, SubmitResponse};
use log::{debug, error, info, warn};
use std::sync::Arc;
use ulid::Ulid;

use crate::cluster::{ClusterClient, ClusterDescriptor, ClusterHandle, ClusterHandleProvider, FactoryRegistry};
use crate::config::Configuration;
use crate::error::{ErrorContext, LaneError, LaneResult};
use crate::graph::{BuiltJob, JobGraphBuilder, PackagedProgram};
use crate::release::ReleaseStack;
use crate::state::{Phase, PhaseTracker, SubmitPhase};
use crate::translate::ConfigTranslator;

/// Runs submissions against the clusters known to a registry
#[derive(Clone)]
pub struct SubmitCoordinator {
    registry: Arc<FactoryRegistry>,
    builder: Arc<dyn JobGraphBuilder>,
    translator: ConfigTranslator,
}

impl SubmitCoordinator {
    pub fn new(registry: Arc<FactoryRegistry>, builder: Arc<dyn JobGraphBuilder>) -> Self {
        Self {
            registry,
            builder,
            translator: ConfigTranslator::new(),
        }
    }

    /// Submit a job. `config` is this invocation's own native configuration.
    ///
    /// Blocks until the cluster accepts the job. Each remote step is tried
    /// once; errors are logged with their context and returned as they are.
    pub fn submit(&self, request: &SubmitRequest, config: Configuration) -> LaneResult<SubmitResponse> {
        let invocation = Ulid::new().to_string().to_lowercase();
        info!(
            "[{}] submit {} mode={}",
            invocation,
            request.artifact.display(),
            request.mode
        );

        let mut context = ErrorContext::new("submit", request.mode);
        let mut phases = PhaseTracker::<SubmitPhase>::new(invocation.as_str());
        let mut stack = ReleaseStack::new();

        let result = self.run(request, config, &mut phases, &mut stack, &mut context);
        match result {
            Ok(_) => phases.advance(SubmitPhase::Done),
            Err(_) => {
                phases.fail();
            }
        }

        debug!("[{}] releasing {:?}", invocation, stack.release_order());
        for failure in stack.unwind() {
            let cleanup = LaneError::Cleanup {
                resource: failure.label,
                context: context.clone(),
                source: failure.error,
            };
            warn!("[{}] {}", invocation, cleanup.report());
        }

        match result {
            Ok(response) => {
                info!(
                    "[{}] submitted job {} to {}",
                    invocation, response.job_id, response.cluster_id
                );
                Ok(response)
            }
            Err(err) => {
                let err = err.in_context(&context);
                error!("[{}] {}", invocation, err.report());
                Err(err)
            }
        }
    }

    fn run(
        &self,
        request: &SubmitRequest,
        config: Configuration,
        phases: &mut PhaseTracker<SubmitPhase>,
        stack: &mut ReleaseStack,
        context: &mut ErrorContext,
    ) -> LaneResult<SubmitResponse> {
        context.step = Some(SubmitPhase::ConfigSet.as_str());
        let config = self.translator.for_submit(config, request)?;
        phases.advance(SubmitPhase::ConfigSet);

        context.step = Some(SubmitPhase::ClusterResolved.as_str());
        let ClusterHandle {
            cluster_id,
            descriptor,
        } = ClusterHandleProvider::new(&self.registry).resolve(&config)?;
        let descriptor = stack.push::<Box<dyn ClusterDescriptor>>("descriptor", descriptor);
        context.cluster_id = Some(cluster_id.clone());
        phases.advance(SubmitPhase::ClusterResolved);

        context.step = Some(SubmitPhase::GraphBuilt.as_str());
        let BuiltJob { program, graph } =
            self.builder
                .build(request, &config)
                .map_err(|source| LaneError::JobGraph {
                    context: ErrorContext::default(),
                    source,
                })?;
        if request.release_program {
            stack.push_base::<Box<dyn PackagedProgram>>("program", program);
        } else {
            debug!("program {} stays with the caller", program.artifact().display());
        }
        phases.advance(SubmitPhase::GraphBuilt);

        context.step = Some(SubmitPhase::ClientRetrieved.as_str());
        let client = stack
            .get(descriptor)
            .retrieve(&cluster_id)
            .map_err(|source| LaneError::ClusterConnection {
                context: ErrorContext::default(),
                source,
            })?;
        let client = stack.push::<Box<dyn ClusterClient>>("client", client);
        phases.advance(SubmitPhase::ClientRetrieved);

        context.step = Some(SubmitPhase::Submitted.as_str());
        let job_id = stack
            .get_mut(client)
            .submit_job(&graph)
            .map_err(|source| LaneError::Submission {
                context: ErrorContext::default(),
                source,
            })?;
        phases.advance(SubmitPhase::Submitted);

        Ok(SubmitResponse {
            cluster_id,
            configuration: config.snapshot(),
            job_id,
            submitted_at: Utc::now(),
        })
    }
}
