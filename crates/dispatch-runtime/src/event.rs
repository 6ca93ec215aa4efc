//! Worker lifecycle events.

use crate::worker::Claim;

/// Events emitted by workers as their claims change.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A task was claimed and an agent launched for it.
    TaskClaimed {
        /// Worker slot id.
        worker_id: String,
        /// The claim now held.
        claim: Claim,
    },
    /// A claim attempt failed before any agent was launched.
    ClaimFailed {
        /// Worker slot id.
        worker_id: String,
        /// Task that could not be claimed.
        task_id: String,
        /// Error message.
        error: String,
    },
    /// The agent launch failed and the claim was kept.
    StuckClaim {
        /// Worker slot id.
        worker_id: String,
        /// Task left in the working status.
        task_id: String,
        /// Error message.
        error: String,
    },
    /// A task was completed and released.
    TaskCompleted {
        /// Worker slot id.
        worker_id: String,
        /// The claim that was released.
        claim: Claim,
    },
    /// A claim was released and its status reverted.
    TaskRolledBack {
        /// Worker slot id.
        worker_id: String,
        /// The claim that was released.
        claim: Claim,
        /// Whether the tracker accepted the revert.
        reverted: bool,
    },
}

impl WorkerEvent {
    /// Returns the worker slot id associated with this event.
    pub fn worker_id(&self) -> &str {
        match self {
            WorkerEvent::TaskClaimed { worker_id, .. } => worker_id,
            WorkerEvent::ClaimFailed { worker_id, .. } => worker_id,
            WorkerEvent::StuckClaim { worker_id, .. } => worker_id,
            WorkerEvent::TaskCompleted { worker_id, .. } => worker_id,
            WorkerEvent::TaskRolledBack { worker_id, .. } => worker_id,
        }
    }

    /// Returns the task id associated with this event.
    pub fn task_id(&self) -> &str {
        match self {
            WorkerEvent::TaskClaimed { claim, .. }
            | WorkerEvent::TaskCompleted { claim, .. }
            | WorkerEvent::TaskRolledBack { claim, .. } => &claim.task_id,
            WorkerEvent::ClaimFailed { task_id, .. } | WorkerEvent::StuckClaim { task_id, .. } => {
                task_id
            }
        }
    }

    /// Returns true if this event reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            WorkerEvent::ClaimFailed { .. }
                | WorkerEvent::StuckClaim { .. }
                | WorkerEvent::TaskRolledBack { reverted: false, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim() -> Claim {
        Claim {
            task_id: "t1".into(),
            task_name: "Fix login".into(),
            external_ref: Some("DEV-12".into()),
            original_status: Some("open".into()),
        }
    }

    #[test]
    fn test_event_ids() {
        let event = WorkerEvent::TaskClaimed {
            worker_id: "AI_01".into(),
            claim: claim(),
        };
        assert_eq!(event.worker_id(), "AI_01");
        assert_eq!(event.task_id(), "t1");

        let event = WorkerEvent::StuckClaim {
            worker_id: "AI_02".into(),
            task_id: "t2".into(),
            error: "launch".into(),
        };
        assert_eq!(event.worker_id(), "AI_02");
        assert_eq!(event.task_id(), "t2");
    }

    #[test]
    fn test_event_is_error() {
        assert!(!WorkerEvent::TaskCompleted {
            worker_id: "AI_01".into(),
            claim: claim(),
        }
        .is_error());
        assert!(WorkerEvent::ClaimFailed {
            worker_id: "AI_01".into(),
            task_id: "t1".into(),
            error: "boom".into(),
        }
        .is_error());
        assert!(WorkerEvent::TaskRolledBack {
            worker_id: "AI_01".into(),
            claim: claim(),
            reverted: false,
        }
        .is_error());
        assert!(!WorkerEvent::TaskRolledBack {
            worker_id: "AI_01".into(),
            claim: claim(),
            reverted: true,
        }
        .is_error());
    }
}
