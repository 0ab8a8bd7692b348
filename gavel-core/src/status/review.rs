//! The review-record machine.
//!
//! A review record tracks `Unreviewed`/`Reviewed` independently of the
//! workflow status of the object it reviews. Any qualifying change to the
//! reviewed object forces `Unreviewed`, from any state; the only way into
//! `Reviewed` is an explicit status-set on the review record itself, which
//! stamps reviewer identity and time at the boundary.

use super::change::ChangeDescriptor;
use super::rules::REVIEW_RULES;
use super::state::ReviewStatus;

/// What happened to the review record in this persistence unit.
#[derive(Debug, Clone)]
pub enum ReviewEvent<'a> {
    /// The reviewed object was mutated; the descriptor is scoped to that
    /// object, not the review record.
    ReviewableChanged(&'a ChangeDescriptor),
    /// The review record's status was set explicitly.
    ExplicitSet(ReviewStatus),
}

/// The machine's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewDecision {
    pub status: ReviewStatus,
    /// True when the boundary must stamp `last_reviewed_by`/`last_reviewed_at`.
    pub stamp: bool,
}

/// Pure transition function for the review machine.
pub fn decide_review(current: ReviewStatus, event: ReviewEvent<'_>) -> ReviewDecision {
    match event {
        ReviewEvent::ReviewableChanged(descriptor) => {
            if REVIEW_RULES.has_qualifying_change(descriptor) {
                ReviewDecision {
                    status: ReviewStatus::Unreviewed,
                    stamp: false,
                }
            } else {
                ReviewDecision {
                    status: current,
                    stamp: false,
                }
            }
        }
        ReviewEvent::ExplicitSet(target) => ReviewDecision {
            status: target,
            stamp: target == ReviewStatus::Reviewed,
        },
    }
}
