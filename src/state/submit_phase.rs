//! Submit coordinator phases

use serde::{Deserialize, Serialize};

use super::{Phase, TerminalState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitPhase {
    Init,
    /// Native configuration translated
    ConfigSet,
    /// Cluster id and descriptor obtained
    ClusterResolved,
    /// Job graph compiled
    GraphBuilt,
    /// Connected client obtained from the descriptor
    ClientRetrieved,
    /// Resource manager accepted the job
    Submitted,
    Done,
    Failed,
}

impl TerminalState for SubmitPhase {
    fn is_terminal(&self) -> bool {
        matches!(self, SubmitPhase::Done | SubmitPhase::Failed)
    }
}

impl Phase for SubmitPhase {
    const INITIAL: Self = SubmitPhase::Init;
    const FAILED: Self = SubmitPhase::Failed;

    fn can_transition_to(&self, target: SubmitPhase) -> bool {
        match (self, target) {
            (SubmitPhase::Init, SubmitPhase::ConfigSet) => true,
            (SubmitPhase::ConfigSet, SubmitPhase::ClusterResolved) => true,
            (SubmitPhase::ClusterResolved, SubmitPhase::GraphBuilt) => true,
            (SubmitPhase::GraphBuilt, SubmitPhase::ClientRetrieved) => true,
            (SubmitPhase::ClientRetrieved, SubmitPhase::Submitted) => true,
            (SubmitPhase::Submitted, SubmitPhase::Done) => true,

            (from, SubmitPhase::Failed) => !from.is_terminal(),

            _ => false,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            SubmitPhase::Init => "init",
            SubmitPhase::ConfigSet => "config-set",
            SubmitPhase::ClusterResolved => "cluster-resolved",
            SubmitPhase::GraphBuilt => "graph-built",
            SubmitPhase::ClientRetrieved => "client-retrieved",
            SubmitPhase::Submitted => "submitted",
            SubmitPhase::Done => "done",
            SubmitPhase::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            SubmitPhase::Init,
            SubmitPhase::ConfigSet,
            SubmitPhase::ClusterResolved,
            SubmitPhase::GraphBuilt,
            SubmitPhase::ClientRetrieved,
            SubmitPhase::Submitted,
            SubmitPhase::Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn test_failed_reachable_from_non_terminal() {
        assert!(SubmitPhase::Init.can_transition_to(SubmitPhase::Failed));
        assert!(SubmitPhase::Submitted.can_transition_to(SubmitPhase::Failed));
        assert!(!SubmitPhase::Done.can_transition_to(SubmitPhase::Failed));
        assert!(!SubmitPhase::Failed.can_transition_to(SubmitPhase::Failed));
    }

    #[test]
    fn test_no_skipping_graph() {
        assert!(!SubmitPhase::ClusterResolved.can_transition_to(SubmitPhase::ClientRetrieved));
        assert!(!SubmitPhase::Done.can_transition_to(SubmitPhase::Init));
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&SubmitPhase::ClientRetrieved).unwrap();
        assert_eq!(json, "\"CLIENT_RETRIEVED\"");
    }
}
