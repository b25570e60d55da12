//! Jar-backed job graph builder

use lane_protocol::SubmitRequest;
use log::debug;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::{BuiltJob, JobGraph, JobGraphBuilder, PackagedProgram};
use crate::config::Configuration;
use crate::error::ClusterError;

/// Validates the artifact as a readable jar and describes the job.
/// Graph compilation itself happens cluster-side.
#[derive(Debug, Default, Clone)]
pub struct JarGraphBuilder;

impl JarGraphBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl JobGraphBuilder for JarGraphBuilder {
    fn build(&self, request: &SubmitRequest, config: &Configuration) -> Result<BuiltJob, ClusterError> {
        let program = JarProgram::open(&request.artifact)?;
        let graph = JobGraph::from_request(request, config)?;
        debug!("built job graph '{}' from {}", graph.job_name, program.path.display());
        Ok(BuiltJob {
            program: Box::new(program),
            graph,
        })
    }
}

/// An opened jar. Holds the file open until closed.
#[derive(Debug)]
pub struct JarProgram {
    path: PathBuf,
    file: Option<File>,
}

impl JarProgram {
    pub fn open(path: &Path) -> Result<Self, ClusterError> {
        if path.extension().and_then(|e| e.to_str()) != Some("jar") {
            return Err(ClusterError::InvalidProgram(format!(
                "{} is not a jar file",
                path.display()
            )));
        }
        if !path.is_file() {
            return Err(ClusterError::InvalidProgram(format!(
                "{} does not exist or is not a file",
                path.display()
            )));
        }
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

impl PackagedProgram for JarProgram {
    fn artifact(&self) -> &Path {
        &self.path
    }

    fn close(&mut self) -> Result<(), ClusterError> {
        self.file.take();
        Ok(())
    }
}
