//! The mutation boundary.
//!
//! Every write that can move a status funnels through here: handlers build a
//! `ChangeDescriptor`, this module asks the engine for a verdict, applies it,
//! and persists. Handlers never write `status`, `verified`, or review state
//! directly.

use chrono::Utc;
use gavel_core::{
    decide_review, ChangeDescriptor, ReviewEvent, ReviewStatus, StatusEngine,
};
use tracing::info;

use crate::records::{Assessment, Review, ReviewableRef};
use crate::repository::{GrcRepository, RepositoryError};
use crate::tracker::TrackerClient;

/// Commit a mutation to an assessment.
///
/// The descriptor describes what the handler already applied to `assessment`
/// (field edits, relationship changes) plus any explicit status-set. The
/// engine's verdict lands on the record before the single `put`. When the
/// status moves and the record carries a tracker link, the transition is
/// pushed to the external issue, whichever mutation caused it.
pub async fn commit_assessment_change(
    repository: &dyn GrcRepository,
    engine: &StatusEngine,
    tracker: Option<&TrackerClient>,
    mut assessment: Assessment,
    descriptor: &ChangeDescriptor,
) -> Result<Assessment, RepositoryError> {
    let decision = engine.decide(
        gavel_core::RecordKind::Assessment,
        assessment.status,
        descriptor,
    );

    let moved = decision.status != assessment.status;
    if moved {
        info!(
            assessment = %assessment.id,
            from = %assessment.status,
            to = %decision.status,
            "Assessment status transition"
        );
        assessment.status = decision.status;
    }
    if decision.verify {
        assessment.verified = true;
        assessment.verified_at = Some(Utc::now());
        assessment.verified_by = Some(descriptor.actor.email.clone());
    }
    assessment.updated_at = Utc::now();

    repository.put_assessment(assessment.clone()).await?;

    if moved {
        if let (Some(client), Some(link)) = (tracker, &assessment.tracker) {
            client.sync_status(link, assessment.status.as_str()).await;
        }
    }
    Ok(assessment)
}

/// Propagate a mutation of a reviewable object to its attached review, if
/// one exists. The review resets to unreviewed on any qualifying change and
/// is untouched otherwise.
pub async fn commit_reviewable_change(
    repository: &dyn GrcRepository,
    reviewable: &ReviewableRef,
    descriptor: &ChangeDescriptor,
) -> Result<Option<Review>, RepositoryError> {
    let Some(mut review) = repository.find_review_for(reviewable).await? else {
        return Ok(None);
    };

    let decision = decide_review(review.status, ReviewEvent::ReviewableChanged(descriptor));
    if decision.status != review.status {
        info!(
            review = %review.id,
            from = %review.status,
            to = %decision.status,
            "Review status reset"
        );
        review.status = decision.status;
        review.updated_at = Utc::now();
        repository.put_review(review.clone()).await?;
    }
    Ok(Some(review))
}

/// Set a review's status explicitly. Moving to reviewed stamps the reviewer
/// and time; moving to unreviewed clears nothing.
pub async fn set_review_status(
    repository: &dyn GrcRepository,
    mut review: Review,
    target: ReviewStatus,
    actor_email: &str,
) -> Result<Review, RepositoryError> {
    let decision = decide_review(review.status, ReviewEvent::ExplicitSet(target));
    review.status = decision.status;
    if decision.stamp {
        review.last_reviewed_by = Some(actor_email.to_string());
        review.last_reviewed_at = Some(Utc::now());
    }
    review.updated_at = Utc::now();
    repository.put_review(review.clone()).await?;
    Ok(review)
}
