//! Job and cluster identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest accepted job id (16 bytes, hex encoded).
pub const JOB_ID_MAX_LEN: usize = 32;

/// Resource-manager-issued job identifier.
///
/// Always lower-case hexadecimal, between 1 and 32 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

/// Errors for job id parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobIdError {
    #[error("job id is empty")]
    Empty,

    #[error("job id '{0}' is longer than 32 characters")]
    TooLong(String),

    #[error("job id '{0}' is not a hexadecimal string")]
    NotHex(String),
}

impl JobId {
    /// Parse a textual job id into its native form.
    pub fn parse(s: &str) -> Result<Self, JobIdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(JobIdError::Empty);
        }
        if trimmed.len() > JOB_ID_MAX_LEN {
            return Err(JobIdError::TooLong(trimmed.to_string()));
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(JobIdError::NotHex(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for JobId {
    type Err = JobIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for JobId {
    type Error = JobIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a cluster (YARN application id, Kubernetes cluster id,
/// or `host:port` for a standalone cluster).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(String);

impl ClusterId {
    /// Returns `None` for a blank id.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
