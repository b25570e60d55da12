//! Request to native configuration translation
//!
//! Translation is pure: it takes the invocation's own configuration by
//! value and hands back the translated one. Applying it twice with the
//! same request gives the same configuration as applying it once.

use std::collections::BTreeMap;

use lane_protocol::{ExecutionMode, StopRequest, SubmitRequest, EXTRA_CLUSTER_ID};

use crate::config::{options, Configuration};
use crate::error::{LaneError, LaneResult};

/// Stamps deployment target and cluster id fields into a native configuration
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigTranslator;

impl ConfigTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Translate for a submission: target, cluster id, then job settings
    pub fn for_submit(&self, config: Configuration, request: &SubmitRequest) -> LaneResult<Configuration> {
        let mut config = self.apply(config, request.mode, &request.extra, &request.properties)?;

        if let Some(ref name) = request.job_name {
            config.set(options::PIPELINE_NAME, name.as_str());
        }
        if let Some(parallelism) = request.parallelism {
            config.set(options::PARALLELISM_DEFAULT, parallelism.to_string());
        }
        if let Some(ref savepoint) = request.savepoint {
            config.set(options::SAVEPOINT_PATH, savepoint.path.as_str());
            config.set(
                options::SAVEPOINT_IGNORE_UNCLAIMED,
                savepoint.allow_non_restored_state.to_string(),
            );
        }
        Ok(config)
    }

    /// Translate for a stop: target and cluster id only
    pub fn for_stop(&self, config: Configuration, request: &StopRequest) -> LaneResult<Configuration> {
        self.apply(config, request.mode, &request.extra, &BTreeMap::new())
    }

    /// Stamp `execution.target` and, for modes that address an existing
    /// cluster, the mode's native cluster id key.
    ///
    /// `properties` are merged first so the stamped fields always win.
    pub fn apply(
        &self,
        mut config: Configuration,
        mode: ExecutionMode,
        extra: &BTreeMap<String, String>,
        properties: &BTreeMap<String, String>,
    ) -> LaneResult<Configuration> {
        for (key, value) in properties {
            config.set(key.as_str(), value.as_str());
        }

        config.set(options::EXECUTION_TARGET, mode.target_name());

        let cluster_id = extra
            .get(EXTRA_CLUSTER_ID)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty());

        match mode {
            ExecutionMode::YarnSession => {
                let id = require_cluster_id(mode, cluster_id)?;
                config.set(options::YARN_APPLICATION_ID, id);
            }
            ExecutionMode::KubernetesSession => {
                let id = require_cluster_id(mode, cluster_id)?;
                config.set(options::KUBERNETES_CLUSTER_ID, id);
            }
            ExecutionMode::Remote => match cluster_id {
                Some(id) => stamp_rest_endpoint(&mut config, id),
                // an endpoint from the config files is good enough
                None if config.contains(options::REST_ADDRESS) => {}
                None => {
                    require_cluster_id(mode, None)?;
                }
            },
            ExecutionMode::YarnPerJob
            | ExecutionMode::YarnApplication
            | ExecutionMode::KubernetesApplication => {}
        }

        Ok(config)
    }
}

fn require_cluster_id(mode: ExecutionMode, cluster_id: Option<&str>) -> LaneResult<&str> {
    cluster_id.ok_or_else(|| {
        LaneError::configuration(format!(
            "mode {} requires the '{}' extra parameter",
            mode, EXTRA_CLUSTER_ID
        ))
    })
}

/// `host:port` sets both keys; anything else is taken as the host
fn stamp_rest_endpoint(config: &mut Configuration, id: &str) {
    match id.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            config.set(options::REST_ADDRESS, host);
            config.set(options::REST_PORT, port);
        }
        _ => config.set(options::REST_ADDRESS, id),
    }
}
