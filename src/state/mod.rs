//! Coordinator phase machines
//!
//! Submit: INIT → CONFIG_SET → CLUSTER_RESOLVED → GRAPH_BUILT → CLIENT_RETRIEVED → SUBMITTED → DONE
//! Stop:   INIT → CONFIG_SET → CLUSTER_RESOLVED → CLIENT_RETRIEVED → CANCELLED → DONE
//!
//! FAILED is reachable from every non-terminal phase.

mod stop_phase;
mod submit_phase;

pub use stop_phase::StopPhase;
pub use submit_phase::SubmitPhase;

use chrono::{DateTime, Utc};
use log::debug;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global sequence counter for ordering phase changes within a process
static SEQUENCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Get the next sequence number for ordering
pub fn next_seq() -> u64 {
    SEQUENCE_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Check if a state is terminal (no further transitions possible)
pub trait TerminalState {
    fn is_terminal(&self) -> bool;
}

/// A coordinator phase
pub trait Phase: TerminalState + Copy + Eq + fmt::Debug + 'static {
    const INITIAL: Self;
    const FAILED: Self;

    fn can_transition_to(&self, target: Self) -> bool;

    /// Lowercase name used in logs and error context
    fn as_str(&self) -> &'static str;
}

/// Errors for phase transitions
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

/// One recorded phase change
#[derive(Debug, Clone)]
pub struct PhaseChange<P> {
    pub phase: P,
    pub at: DateTime<Utc>,
    pub seq: u64,
}

/// Tracks the phase of one coordinator invocation
#[derive(Debug)]
pub struct PhaseTracker<P: Phase> {
    invocation: String,
    current: P,
    history: Vec<PhaseChange<P>>,
}

impl<P: Phase> PhaseTracker<P> {
    pub fn new(invocation: impl Into<String>) -> Self {
        Self {
            invocation: invocation.into(),
            current: P::INITIAL,
            history: vec![PhaseChange {
                phase: P::INITIAL,
                at: Utc::now(),
                seq: next_seq(),
            }],
        }
    }

    pub fn current(&self) -> P {
        self.current
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    /// Move to `target`, rejecting transitions the machine does not allow
    pub fn try_advance(&mut self, target: P) -> Result<(), PhaseError> {
        if !self.current.can_transition_to(target) {
            return Err(PhaseError::InvalidTransition {
                from: self.current.as_str(),
                to: target.as_str(),
            });
        }
        debug!(
            "[{}] {} -> {}",
            self.invocation,
            self.current.as_str(),
            target.as_str()
        );
        self.current = target;
        self.history.push(PhaseChange {
            phase: target,
            at: Utc::now(),
            seq: next_seq(),
        });
        Ok(())
    }

    /// Move to `target`. Coordinators only request legal transitions.
    pub fn advance(&mut self, target: P) {
        let result = self.try_advance(target);
        debug_assert!(result.is_ok(), "{:?}", result);
    }

    /// Move to FAILED unless already terminal. Returns the phase that failed.
    pub fn fail(&mut self) -> P {
        let failed_in = self.current;
        if !self.current.is_terminal() {
            self.advance(P::FAILED);
        }
        failed_in
    }

    /// Phases visited so far, in order
    pub fn phases(&self) -> Vec<P> {
        self.history.iter().map(|c| c.phase).collect()
    }

    pub fn history(&self) -> &[PhaseChange<P>] {
        &self.history
    }
}
