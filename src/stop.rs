//! Stop coordinator
//!
//! parse job id → translate → resolve cluster → retrieve client → cancel.
//! Releases client then descriptor on every exit path.

use lane_protocol::{JobId, StopRequest, StopResponse};
use log::{debug, error, info, warn};
use std::sync::Arc;
use ulid::Ulid;

use crate::cluster::{CancelOptions, ClusterClient, ClusterDescriptor, ClusterHandle, ClusterHandleProvider, FactoryRegistry};
use crate::config::Configuration;
use crate::error::{ErrorContext, LaneError, LaneResult};
use crate::release::ReleaseStack;
use crate::state::{Phase, PhaseTracker, StopPhase};
use crate::translate::ConfigTranslator;

/// Cancels jobs on the clusters known to a registry
#[derive(Clone)]
pub struct StopCoordinator {
    registry: Arc<FactoryRegistry>,
    translator: ConfigTranslator,
}

impl StopCoordinator {
    pub fn new(registry: Arc<FactoryRegistry>) -> Self {
        Self {
            registry,
            translator: ConfigTranslator::new(),
        }
    }

    /// Cancel a job. The savepoint and drain fields of the request are
    /// passed to the cluster client untouched.
    pub fn stop(&self, request: &StopRequest, config: Configuration) -> LaneResult<StopResponse> {
        let invocation = Ulid::new().to_string().to_lowercase();
        info!(
            "[{}] stop job {} mode={}",
            invocation, request.job_id, request.mode
        );

        let mut context = ErrorContext::new("stop", request.mode);
        let mut phases = PhaseTracker::<StopPhase>::new(invocation.as_str());
        let mut stack = ReleaseStack::new();

        let result = self.run(request, config, &mut phases, &mut stack, &mut context);
        match result {
            Ok(_) => phases.advance(StopPhase::Done),
            Err(_) => {
                phases.fail();
            }
        }

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
                info!("[{}] job {} stopped", invocation, request.job_id);
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
        request: &StopRequest,
        config: Configuration,
        phases: &mut PhaseTracker<StopPhase>,
        stack: &mut ReleaseStack,
        context: &mut ErrorContext,
    ) -> LaneResult<StopResponse> {
        // Nothing is acquired for a job id that cannot be valid
        context.step = Some(StopPhase::Init.as_str());
        let job_id = JobId::parse(&request.job_id).map_err(|source| LaneError::InvalidJobId {
            context: ErrorContext::default(),
            source,
        })?;

        context.step = Some(StopPhase::ConfigSet.as_str());
        let config = self.translator.for_stop(config, request)?;
        phases.advance(StopPhase::ConfigSet);

        context.step = Some(StopPhase::ClusterResolved.as_str());
        let ClusterHandle {
            cluster_id,
            descriptor,
        } = ClusterHandleProvider::new(&self.registry).resolve(&config)?;
        let descriptor = stack.push::<Box<dyn ClusterDescriptor>>("descriptor", descriptor);
        context.cluster_id = Some(cluster_id.clone());
        phases.advance(StopPhase::ClusterResolved);

        context.step = Some(StopPhase::ClientRetrieved.as_str());
        let client = stack
            .get(descriptor)
            .retrieve(&cluster_id)
            .map_err(|source| LaneError::ClusterConnection {
                context: ErrorContext::default(),
                source,
            })?;
        let client = stack.push::<Box<dyn ClusterClient>>("client", client);
        phases.advance(StopPhase::ClientRetrieved);

        context.step = Some(StopPhase::Cancelled.as_str());
        let options = CancelOptions::from(request);
        debug!("cancel options {:?}", options);
        let ack = stack
            .get_mut(client)
            .cancel(&job_id, &options)
            .map_err(|source| LaneError::Cancellation {
                context: ErrorContext::default(),
                source,
            })?;
        phases.advance(StopPhase::Cancelled);

        Ok(StopResponse { ack })
    }
}
