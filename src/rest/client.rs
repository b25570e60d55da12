//! Cluster client over the JobManager REST API

use lane_protocol::{ClusterId, JobId};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::transport::{Body, HttpRequest, HttpResponse, Transport};
use crate::cluster::{CancelOptions, ClusterClient};
use crate::config::{options, ConfigError, Configuration};
use crate::error::ClusterError;
use crate::graph::JobGraph;

/// Savepoint polling settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestClientConfig {
    pub poll_interval: Duration,
    pub poll_max_attempts: u64,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            poll_max_attempts: 600,
        }
    }
}

impl RestClientConfig {
    pub fn from_configuration(config: &Configuration) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            poll_interval: config
                .get_u64(options::SAVEPOINT_POLL_INTERVAL)?
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            poll_max_attempts: config
                .get_u64(options::SAVEPOINT_POLL_MAX_ATTEMPTS)?
                .unwrap_or(defaults.poll_max_attempts),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    jobid: String,
}

#[derive(Debug, Deserialize)]
struct TriggerResponse {
    #[serde(rename = "request-id")]
    request_id: String,
}

#[derive(Debug, Deserialize)]
struct SavepointStatus {
    status: QueueStatus,
    #[serde(default)]
    operation: Option<SavepointOperation>,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SavepointOperation {
    #[serde(default)]
    location: Option<String>,
    #[serde(rename = "failure-cause", default)]
    failure_cause: Option<Value>,
}

/// Client for one cluster, reached at `base_url`
pub struct RestClusterClient {
    cluster_id: ClusterId,
    base_url: String,
    transport: Arc<dyn Transport>,
    config: RestClientConfig,
    closed: bool,
}

impl RestClusterClient {
    pub fn new(
        cluster_id: ClusterId,
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        config: RestClientConfig,
    ) -> Self {
        Self {
            cluster_id,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            transport,
            config,
            closed: false,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Execute and require a 2xx status
    fn call(&self, request: HttpRequest) -> Result<HttpResponse, ClusterError> {
        if self.closed {
            return Err(ClusterError::Protocol("client is closed".to_string()));
        }
        debug!("{} {}", request.method, request.url);
        let response = self.transport.execute(&request)?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(rejection(&request, &response))
        }
    }

    fn upload_jar(&self, graph: &JobGraph) -> Result<String, ClusterError> {
        let response = self.call(HttpRequest::post(
            self.url("/jars/upload"),
            Body::File {
                field: "jarfile".to_string(),
                path: graph.jar.clone(),
            },
        ))?;
        let upload: UploadResponse = response.json()?;
        // The server answers with the stored path; the jar id is its last segment
        let jar_id = upload
            .filename
            .rsplit('/')
            .next()
            .unwrap_or(upload.filename.as_str())
            .to_string();
        Ok(jar_id)
    }

    fn run_jar(&self, jar_id: &str, graph: &JobGraph) -> Result<JobId, ClusterError> {
        let mut body = Map::new();
        if let Some(ref class) = graph.entry_class {
            body.insert("entryClass".to_string(), json!(class));
        }
        if !graph.args.is_empty() {
            body.insert("programArgsList".to_string(), json!(graph.args));
        }
        if let Some(parallelism) = graph.parallelism {
            body.insert("parallelism".to_string(), json!(parallelism));
        }
        if let Some(ref savepoint) = graph.savepoint {
            body.insert("savepointPath".to_string(), json!(savepoint.path));
            body.insert(
                "allowNonRestoredState".to_string(),
                json!(savepoint.allow_non_restored_state),
            );
        }

        let response = self.call(HttpRequest::post(
            self.url(&format!("/jars/{}/run", jar_id)),
            Body::Json(Value::Object(body)),
        ))?;
        let run: RunResponse = response.json()?;
        JobId::parse(&run.jobid).map_err(|e| ClusterError::Protocol(e.to_string()))
    }

    fn delete_jar(&self, jar_id: &str) {
        if let Err(e) = self.call(HttpRequest::delete(self.url(&format!("/jars/{}", jar_id)))) {
            warn!("could not delete uploaded jar {}: {}", jar_id, e);
        }
    }

    fn trigger_savepoint(&self, job_id: &JobId, options: &CancelOptions) -> Result<String, ClusterError> {
        let (path, body) = if options.drain {
            (
                format!("/jobs/{}/stop", job_id),
                json!({
                    "targetDirectory": options.savepoint_dir,
                    "drain": true,
                }),
            )
        } else {
            (
                format!("/jobs/{}/savepoints", job_id),
                json!({
                    "target-directory": options.savepoint_dir,
                    "cancel-job": true,
                }),
            )
        };
        let response = self.call(HttpRequest::post(self.url(&path), Body::Json(body)))?;
        let trigger: TriggerResponse = response.json()?;
        Ok(trigger.request_id)
    }

    /// Poll the savepoint operation until it completes, returning its location
    fn await_savepoint(&self, job_id: &JobId, trigger: &str) -> Result<String, ClusterError> {
        let url = self.url(&format!("/jobs/{}/savepoints/{}", job_id, trigger));
        for attempt in 1..=self.config.poll_max_attempts {
            let status: SavepointStatus = self.call(HttpRequest::get(url.as_str()))?.json()?;
            if status.status.id == "COMPLETED" {
                let operation = status.operation.ok_or_else(|| {
                    ClusterError::Protocol("completed savepoint without operation".to_string())
                })?;
                if let Some(cause) = operation.failure_cause {
                    return Err(ClusterError::Rejected(format!("savepoint failed: {}", cause)));
                }
                return operation.location.ok_or_else(|| {
                    ClusterError::Protocol("completed savepoint without location".to_string())
                });
            }
            debug!("savepoint {} in progress (attempt {})", trigger, attempt);
            thread::sleep(self.config.poll_interval);
        }
        Err(ClusterError::Unreachable(format!(
            "savepoint {} not completed after {} polls",
            trigger, self.config.poll_max_attempts
        )))
    }
}

/// Map a non-2xx response to a cluster error
pub(super) fn rejection(request: &HttpRequest, response: &HttpResponse) -> ClusterError {
    let message = response
        .json::<Value>()
        .ok()
        .and_then(|v| {
            v.get("errors").and_then(Value::as_array).map(|errors| {
                errors
                    .iter()
                    .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", response.status));

    let message = format!("{} {}: {}", request.method, request.path(), message);
    if response.status == 404 {
        ClusterError::NotFound(message)
    } else {
        ClusterError::Rejected(message)
    }
}

impl ClusterClient for RestClusterClient {
    fn cluster_id(&self) -> &ClusterId {
        &self.cluster_id
    }

    fn submit_job(&mut self, graph: &JobGraph) -> Result<JobId, ClusterError> {
        let jar_id = self.upload_jar(graph)?;
        let result = self.run_jar(&jar_id, graph);
        self.delete_jar(&jar_id);
        result
    }

    fn cancel(&mut self, job_id: &JobId, options: &CancelOptions) -> Result<String, ClusterError> {
        // drain always goes through the stop endpoint, which takes a savepoint
        if !options.with_savepoint && !options.drain {
            self.call(HttpRequest::patch(
                self.url(&format!("/jobs/{}?mode=cancel", job_id)),
            ))?;
            return Ok(String::new());
        }
        let trigger = self.trigger_savepoint(job_id, options)?;
        let location = self.await_savepoint(job_id, &trigger)?;
        Ok(format!("savepoint:{}", location))
    }

    fn close(&mut self) -> Result<(), ClusterError> {
        self.closed = true;
        Ok(())
    }
}
