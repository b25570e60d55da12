//! Failure injection for the fake cluster
//!
//! Failures are keyed by the collaborator step they hit. Each config says
//! which `ClusterError` to raise and, optionally, how many times before the
//! step starts succeeding.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::ClusterError;

/// Collaborator steps a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeStep {
    /// Factory cluster id lookup and descriptor creation
    ResolveCluster,
    BuildGraph,
    RetrieveClient,
    Submit,
    Cancel,
    CloseClient,
    CloseDescriptor,
    CloseProgram,
}

/// Which error an injected failure raises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Unreachable,
    NotFound,
    Rejected,
    InvalidProgram,
}

/// Failure configuration for a step
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Error to raise (None = only delay)
    pub kind: Option<FailureKind>,
    /// Error message
    pub message: String,
    /// Delay to add before the step runs
    pub delay: Option<Duration>,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Create a config that raises an error
    pub fn error(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            message: message.into(),
            delay: None,
            fail_count: None,
        }
    }

    /// Create a config that just adds delay
    pub fn delay(duration: Duration) -> Self {
        Self {
            kind: None,
            message: String::new(),
            delay: Some(duration),
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    /// The error this config raises, if any
    pub fn to_error(&self) -> Option<ClusterError> {
        let message = self.message.clone();
        self.kind.map(|kind| match kind {
            FailureKind::Unreachable => ClusterError::Unreachable(message),
            FailureKind::NotFound => ClusterError::NotFound(message),
            FailureKind::Rejected => ClusterError::Rejected(message),
            FailureKind::InvalidProgram => ClusterError::InvalidProgram(message),
        })
    }
}

/// Failure injector for the fake cluster
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<FakeStep, FailureConfig>,
    /// Call counts per step (for fail_count tracking)
    call_counts: HashMap<FakeStep, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for a step
    pub fn inject(&mut self, step: FakeStep, config: FailureConfig) {
        self.configs.insert(step, config);
        self.call_counts.insert(step, 0);
    }

    /// Inject an error for a step
    pub fn inject_error(&mut self, step: FakeStep, kind: FailureKind, message: impl Into<String>) {
        self.inject(step, FailureConfig::error(kind, message));
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Clear failure injection for a specific step
    pub fn clear_step(&mut self, step: FakeStep) {
        self.configs.remove(&step);
        self.call_counts.remove(&step);
    }

    /// Check if a failure should occur for a step.
    /// Returns the failure config if one should occur, None otherwise.
    pub fn check(&mut self, step: FakeStep) -> Option<&FailureConfig> {
        let config = self.configs.get(&step)?;
        let count = self.call_counts.entry(step).or_insert(0);
        *count += 1;

        if let Some(fail_limit) = config.fail_count {
            if *count > fail_limit {
                return None;
            }
        }
        Some(config)
    }

    /// Get the delay for a step (if any)
    pub fn get_delay(&self, step: FakeStep) -> Option<Duration> {
        self.configs.get(&step).and_then(|c| c.delay)
    }
}
