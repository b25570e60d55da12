//! Job graphs and the builder contract
//!
//! Compiling a program into an executable graph is the cluster's business.
//! The lane only describes what to run (`JobGraph`) and owns the lifetime
//! of the packaged program handle a builder hands back.

mod jar;

pub use jar::{JarGraphBuilder, JarProgram};

use lane_protocol::{SavepointRestore, SubmitRequest};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{options, Configuration};
use crate::error::ClusterError;

/// What a cluster client submits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobGraph {
    pub job_name: String,
    pub jar: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_class: Option<String>,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savepoint: Option<SavepointRestore>,
}

impl JobGraph {
    /// Describe the job from the request, with translated configuration
    /// filling anything the request leaves open.
    pub fn from_request(request: &SubmitRequest, config: &Configuration) -> Result<Self, ClusterError> {
        let job_name = config
            .get(options::PIPELINE_NAME)
            .map(str::to_string)
            .unwrap_or_else(|| request.effective_job_name());

        let parallelism = match request.parallelism {
            Some(p) => Some(p),
            None => config
                .get_u64(options::PARALLELISM_DEFAULT)
                .map_err(|e| ClusterError::InvalidProgram(e.to_string()))?
                .map(|p| {
                    u32::try_from(p).map_err(|_| {
                        ClusterError::InvalidProgram(format!("parallelism {} out of range", p))
                    })
                })
                .transpose()?,
        };
        if parallelism == Some(0) {
            return Err(ClusterError::InvalidProgram(
                "parallelism must be positive".to_string(),
            ));
        }

        let savepoint = match request.savepoint.clone() {
            Some(sp) => Some(sp),
            None => match config.get(options::SAVEPOINT_PATH) {
                Some(path) => Some(SavepointRestore {
                    path: path.to_string(),
                    allow_non_restored_state: config
                        .get_bool(options::SAVEPOINT_IGNORE_UNCLAIMED)
                        .map_err(|e| ClusterError::InvalidProgram(e.to_string()))?
                        .unwrap_or(false),
                }),
                None => None,
            },
        };

        Ok(Self {
            job_name,
            jar: request.artifact.clone(),
            entry_class: request.entry_class.clone(),
            args: request.args.clone(),
            parallelism,
            savepoint,
        })
    }
}

/// Handle to a packaged program. Scoped: closed once the job is submitted,
/// unless the caller keeps ownership.
pub trait PackagedProgram: Send {
    fn artifact(&self) -> &Path;

    /// Release the program. Idempotent.
    fn close(&mut self) -> Result<(), ClusterError>;
}

/// Output of a `JobGraphBuilder`
pub struct BuiltJob {
    pub program: Box<dyn PackagedProgram>,
    pub graph: JobGraph,
}

/// Compiles a submit request into a packaged program and job graph
pub trait JobGraphBuilder: Send + Sync {
    fn build(&self, request: &SubmitRequest, config: &Configuration) -> Result<BuiltJob, ClusterError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_protocol::ExecutionMode;

    #[test]
    fn test_graph_from_request() {
        let request = SubmitRequest::new(ExecutionMode::Remote, "/opt/jobs/wordcount.jar")
            .with_entry_class("org.example.WordCount")
            .with_args(vec!["--input".to_string(), "/data".to_string()]);
        let graph = JobGraph::from_request(&request, &Configuration::new()).unwrap();

        assert_eq!(graph.job_name, "wordcount");
        assert_eq!(graph.entry_class.as_deref(), Some("org.example.WordCount"));
        assert_eq!(graph.args.len(), 2);
        assert!(graph.parallelism.is_none());
        assert!(graph.savepoint.is_none());
    }

    #[test]
    fn test_graph_reads_translated_config() {
        let request = SubmitRequest::new(ExecutionMode::Remote, "job.jar");
        let config = Configuration::new()
            .with(options::PIPELINE_NAME, "nightly")
            .with(options::PARALLELISM_DEFAULT, "4")
            .with(options::SAVEPOINT_PATH, "/sp/1")
            .with(options::SAVEPOINT_IGNORE_UNCLAIMED, "true");
        let graph = JobGraph::from_request(&request, &config).unwrap();

        assert_eq!(graph.job_name, "nightly");
        assert_eq!(graph.parallelism, Some(4));
        let savepoint = graph.savepoint.unwrap();
        assert_eq!(savepoint.path, "/sp/1");
        assert!(savepoint.allow_non_restored_state);
    }

    #[test]
    fn test_graph_rejects_zero_parallelism() {
        let request = SubmitRequest::new(ExecutionMode::Remote, "job.jar").with_parallelism(0);
        let err = JobGraph::from_request(&request, &Configuration::new()).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidProgram(_)));
    }
}
