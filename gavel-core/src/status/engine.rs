//! The pure status transition function.
//!
//! Given the current status of a trackable record and the change descriptor
//! for one persistence unit, the engine computes the new status. It performs
//! no I/O and cannot fail; errors building the descriptor are the caller's
//! problem and abort the mutation before the engine runs.

use std::collections::HashMap;

use super::change::ChangeDescriptor;
use super::observer::{AssessmentObserver, StatusObserver};
use super::state::{RecordKind, WorkflowStatus};

/// The engine's verdict for one persistence unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusDecision {
    pub status: WorkflowStatus,
    /// True when this unit enters the verified terminal state via an
    /// explicit status-set; the boundary stamps actor and time. The
    /// demotion path never sets this.
    pub verify: bool,
}

impl StatusDecision {
    fn unchanged(status: WorkflowStatus) -> Self {
        Self {
            status,
            verify: false,
        }
    }
}

/// The status engine: observers for every trackable kind, built once at
/// startup and passed explicitly into the transaction boundary.
pub struct StatusEngine {
    observers: HashMap<RecordKind, Box<dyn StatusObserver>>,
}

impl StatusEngine {
    /// Engine with the standard observer set (assessments are the only
    /// workflow-governed kind).
    pub fn new() -> Self {
        let mut observers: HashMap<RecordKind, Box<dyn StatusObserver>> = HashMap::new();
        observers.insert(RecordKind::Assessment, Box::new(AssessmentObserver));
        Self { observers }
    }

    /// Compute the new status for one persistence unit.
    ///
    /// Decision order, per the workflow rules:
    /// 1. An explicit status competing with a qualifying change in the same
    ///    unit is discarded; the computed transition wins. This holds for
    ///    API mutations and bulk import alike.
    /// 2. Otherwise an explicit status-set applies, normalized per kind
    ///    (`Verified` lands in `Completed` and stamps).
    /// 3. No qualifying change: no-op.
    /// 4. Qualifying change: done-like states demote to `InProgress`,
    ///    everything else absorbs the change.
    pub fn decide(
        &self,
        kind: RecordKind,
        current: WorkflowStatus,
        descriptor: &ChangeDescriptor,
    ) -> StatusDecision {
        let Some(observer) = self.observers.get(&kind) else {
            // Kind without a workflow: status is never engine-moved.
            return StatusDecision::unchanged(current);
        };
        let rules = observer.rules();
        let qualifying = rules.has_qualifying_change(descriptor);

        let explicit = if qualifying {
            // A supplied status cannot force its way past a computed
            // transition in the same unit.
            None
        } else {
            descriptor.explicit_status
        };

        if let Some(value) = explicit {
            let normalized = observer.normalize_explicit(value);
            return StatusDecision {
                status: normalized.status,
                verify: normalized.verify,
            };
        }

        if !qualifying {
            return StatusDecision::unchanged(current);
        }

        let next = if current.is_done_like() {
            WorkflowStatus::InProgress
        } else {
            current
        };
        StatusDecision {
            status: next,
            verify: false,
        }
    }
}

impl Default for StatusEngine {
    fn default() -> Self {
        Self::new()
    }
}
