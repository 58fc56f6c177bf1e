// phase.rs — RunPhase: the lifecycle state machine of one run.
//
//   Idle → Bootstrapping → Resolving → Executing → Finalizing → Done
//
// Any phase may move to Failed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Bootstrapping,
    Resolving,
    Executing,
    Finalizing,
    Done,
    Failed,
}

impl RunPhase {
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle, Bootstrapping)
                | (Bootstrapping, Resolving)
                | (Resolving, Executing)
                | (Executing, Finalizing)
                | (Finalizing, Done)
                | (_, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "idle"),
            RunPhase::Bootstrapping => write!(f, "bootstrapping"),
            RunPhase::Resolving => write!(f, "resolving"),
            RunPhase::Executing => write!(f, "executing"),
            RunPhase::Finalizing => write!(f, "finalizing"),
            RunPhase::Done => write!(f, "done"),
            RunPhase::Failed => write!(f, "failed"),
        }
    }
}
