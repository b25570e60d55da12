//! Stop coordinator phases

use serde::{Deserialize, Serialize};

use super::{Phase, TerminalState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopPhase {
    Init,
    ConfigSet,
    ClusterResolved,
    ClientRetrieved,
    /// Cancellation acknowledged by the cluster
    Cancelled,
    Done,
    Failed,
}

impl TerminalState for StopPhase {
    fn is_terminal(&self) -> bool {
        matches!(self, StopPhase::Done | StopPhase::Failed)
    }
}

impl Phase for StopPhase {
    const INITIAL: Self = StopPhase::Init;
    const FAILED: Self = StopPhase::Failed;

    fn can_transition_to(&self, target: StopPhase) -> bool {
        match (self, target) {
            (StopPhase::Init, StopPhase::ConfigSet) => true,
            (StopPhase::ConfigSet, StopPhase::ClusterResolved) => true,
            (StopPhase::ClusterResolved, StopPhase::ClientRetrieved) => true,
            (StopPhase::ClientRetrieved, StopPhase::Cancelled) => true,
            (StopPhase::Cancelled, StopPhase::Done) => true,
            (from, StopPhase::Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            StopPhase::Init => "init",
            StopPhase::ConfigSet => "config-set",
            StopPhase::ClusterResolved => "cluster-resolved",
            StopPhase::ClientRetrieved => "client-retrieved",
            StopPhase::Cancelled => "cancelled",
            StopPhase::Done => "done",
            StopPhase::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(StopPhase::Init.can_transition_to(StopPhase::ConfigSet));
        assert!(StopPhase::ClientRetrieved.can_transition_to(StopPhase::Cancelled));
        assert!(!StopPhase::ClusterResolved.can_transition_to(StopPhase::Cancelled));
        assert!(StopPhase::Init.can_transition_to(StopPhase::Failed));
        assert!(!StopPhase::Done.can_transition_to(StopPhase::Failed));
    }
}
