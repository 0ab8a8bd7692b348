//! Per-kind status observers.
//!
//! Each trackable kind implements the `StatusObserver` capability; the
//! engine owns the observers and dispatches through them. There is no global
//! registry keyed by runtime type.

use super::rules::{RuleSet, ASSESSMENT_RULES};
use super::state::{ExplicitStatus, RecordKind, WorkflowStatus};

/// An explicit status-set value after kind-specific normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedStatus {
    pub status: WorkflowStatus,
    /// Whether entering `status` stamps verification metadata.
    pub verify: bool,
}

/// Capability implemented once per trackable kind.
///
/// `normalize_explicit` is the explicit optional-override point for status
/// validation: a kind that treats some wire value specially (assessments map
/// `Verified` onto `Completed` and stamp) overrides the default.
pub trait StatusObserver: Send + Sync {
    fn kind(&self) -> RecordKind;

    fn rules(&self) -> &'static RuleSet;

    fn normalize_explicit(&self, value: ExplicitStatus) -> NormalizedStatus {
        match value {
            ExplicitStatus::Status(status) => NormalizedStatus {
                status,
                verify: false,
            },
            // Kinds without a verification workflow land in Completed
            // without stamping.
            ExplicitStatus::Verified => NormalizedStatus {
                status: WorkflowStatus::Completed,
                verify: false,
            },
        }
    }
}

/// Observer for the assessment workflow.
pub struct AssessmentObserver;

impl StatusObserver for AssessmentObserver {
    fn kind(&self) -> RecordKind {
        RecordKind::Assessment
    }

    fn rules(&self) -> &'static RuleSet {
        &ASSESSMENT_RULES
    }

    fn normalize_explicit(&self, value: ExplicitStatus) -> NormalizedStatus {
        match value {
            ExplicitStatus::Status(status) => NormalizedStatus {
                status,
                verify: false,
            },
            ExplicitStatus::Verified => NormalizedStatus {
                status: WorkflowStatus::Completed,
                verify: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assessment_verified_lands_in_completed_with_stamp() {
        let normalized = AssessmentObserver.normalize_explicit(ExplicitStatus::Verified);
        assert_eq!(normalized.status, WorkflowStatus::Completed);
        assert!(normalized.verify);
    }

    #[test]
    fn test_plain_status_set_does_not_stamp() {
        let normalized = AssessmentObserver
            .normalize_explicit(ExplicitStatus::Status(WorkflowStatus::Completed));
        assert_eq!(normalized.status, WorkflowStatus::Completed);
        assert!(!normalized.verify);
    }
}
