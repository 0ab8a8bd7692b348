//! End-to-end status flows over the in-memory backend.

use std::sync::Arc;

use gavel_core::{
    Actor, ChangeDescriptor, DocumentKind, ExplicitStatus, ObjectKind, RelationshipCategory,
    ReviewStatus, StatusEngine, WorkflowStatus,
};
use gavel_server::mutation::{
    commit_assessment_change, commit_reviewable_change, set_review_status,
};
use gavel_server::records::{
    Assessment, Control, NotificationType, Review, ReviewableRef,
};
use gavel_server::repository::{GrcRepository, InMemoryRepository};
use uuid::Uuid;

fn actor() -> Actor {
    Actor::new(Uuid::new_v4(), "auditor@example.com")
}

fn harness() -> (Arc<InMemoryRepository>, StatusEngine) {
    (Arc::new(InMemoryRepository::new()), StatusEngine::new())
}

async fn seeded_assessment(
    repo: &InMemoryRepository,
    status: WorkflowStatus,
) -> Assessment {
    let mut assessment = Assessment::new("Quarterly access review", ObjectKind::Control);
    assessment.status = status;
    repo.put_assessment(assessment.clone()).await.unwrap();
    assessment
}

#[tokio::test]
async fn qualifying_field_edit_demotes_done_like_states() {
    let (repo, engine) = harness();
    for status in [WorkflowStatus::InReview, WorkflowStatus::Completed] {
        let assessment = seeded_assessment(&repo, status).await;
        let descriptor = ChangeDescriptor::new(actor()).with_field(
            "notes",
            None,
            Some("updated".to_string()),
        );
        let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
            .await
            .unwrap();
        assert_eq!(updated.status, WorkflowStatus::InProgress);
    }
}

#[tokio::test]
async fn non_done_like_states_absorb_changes() {
    let (repo, engine) = harness();
    for status in [
        WorkflowStatus::NotStarted,
        WorkflowStatus::InProgress,
        WorkflowStatus::ReworkNeeded,
        WorkflowStatus::Deprecated,
    ] {
        let assessment = seeded_assessment(&repo, status).await;
        let descriptor = ChangeDescriptor::new(actor()).with_field(
            "notes",
            None,
            Some("updated".to_string()),
        );
        let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
            .await
            .unwrap();
        assert_eq!(updated.status, status);
    }
}

#[tokio::test]
async fn ignored_field_never_moves_status() {
    let (repo, engine) = harness();
    let assessment = seeded_assessment(&repo, WorkflowStatus::Completed).await;
    let descriptor = ChangeDescriptor::new(actor()).with_field(
        "label",
        None,
        Some("needs attention".to_string()),
    );
    let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
        .await
        .unwrap();
    assert_eq!(updated.status, WorkflowStatus::Completed);
}

#[tokio::test]
async fn snapshot_mapping_qualifies_only_for_the_focus_type() {
    let (repo, engine) = harness();

    // The assessment's focus is Control: a Control snapshot demotes it.
    let assessment = seeded_assessment(&repo, WorkflowStatus::InReview).await;
    let descriptor = ChangeDescriptor::new(actor())
        .with_focus(ObjectKind::Control)
        .with_added(RelationshipCategory::Snapshot {
            child_kind: ObjectKind::Control,
        });
    let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
        .await
        .unwrap();
    assert_eq!(updated.status, WorkflowStatus::InProgress);

    // A snapshot of some other kind is inert.
    let assessment = seeded_assessment(&repo, WorkflowStatus::InReview).await;
    let descriptor = ChangeDescriptor::new(actor())
        .with_focus(ObjectKind::Control)
        .with_added(RelationshipCategory::Snapshot {
            child_kind: ObjectKind::Policy,
        });
    let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
        .await
        .unwrap();
    assert_eq!(updated.status, WorkflowStatus::InReview);
}

#[tokio::test]
async fn every_document_subtype_qualifies() {
    let (repo, engine) = harness();
    for kind in [
        DocumentKind::Evidence,
        DocumentKind::Url,
        DocumentKind::ReferenceUrl,
    ] {
        let assessment = seeded_assessment(&repo, WorkflowStatus::Completed).await;
        let descriptor =
            ChangeDescriptor::new(actor()).with_added(RelationshipCategory::Document(kind));
        let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
            .await
            .unwrap();
        assert_eq!(updated.status, WorkflowStatus::InProgress);
    }
}

#[tokio::test]
async fn comments_demote_done_like_states() {
    let (repo, engine) = harness();
    let assessment = seeded_assessment(&repo, WorkflowStatus::InReview).await;
    let descriptor = ChangeDescriptor::new(actor()).with_added(RelationshipCategory::Comment);
    let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
        .await
        .unwrap();
    assert_eq!(updated.status, WorkflowStatus::InProgress);
}

#[tokio::test]
async fn people_and_issue_mappings_are_inert() {
    let (repo, engine) = harness();
    for category in [
        RelationshipCategory::Assignee,
        RelationshipCategory::CustomRoleDefinition,
        RelationshipCategory::IssueLink,
    ] {
        let assessment = seeded_assessment(&repo, WorkflowStatus::Completed).await;
        let descriptor = ChangeDescriptor::new(actor()).with_added(category);
        let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
            .await
            .unwrap();
        assert_eq!(updated.status, WorkflowStatus::Completed);
    }
}

#[tokio::test]
async fn verify_then_demote_keeps_the_verification_stamp() {
    let (repo, engine) = harness();
    let assessment = seeded_assessment(&repo, WorkflowStatus::InReview).await;
    let id = assessment.id;

    let verifier = Actor::new(Uuid::new_v4(), "verifier@example.com");
    let descriptor =
        ChangeDescriptor::new(verifier).with_explicit_status(ExplicitStatus::Verified);
    let verified = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
        .await
        .unwrap();
    assert_eq!(verified.status, WorkflowStatus::Completed);
    assert!(verified.verified);
    assert_eq!(verified.verified_by.as_deref(), Some("verifier@example.com"));
    let first_stamp = verified.verified_at;

    // A later qualifying change demotes but does not unstamp or re-stamp.
    let descriptor = ChangeDescriptor::new(actor())
        .with_added(RelationshipCategory::Document(DocumentKind::Evidence));
    let demoted = commit_assessment_change(&*repo, &engine, None, verified, &descriptor)
        .await
        .unwrap();
    assert_eq!(demoted.status, WorkflowStatus::InProgress);
    assert!(demoted.verified);
    assert_eq!(demoted.verified_at, first_stamp);

    let stored = repo.get_assessment(id).await.unwrap().unwrap();
    assert_eq!(stored.status, WorkflowStatus::InProgress);
}

#[tokio::test]
async fn a_simultaneous_edit_overrides_the_requested_status() {
    let (repo, engine) = harness();
    let assessment = seeded_assessment(&repo, WorkflowStatus::InReview).await;
    let descriptor = ChangeDescriptor::new(actor())
        .with_field("notes", None, Some("final pass".to_string()))
        .with_explicit_status(ExplicitStatus::Status(WorkflowStatus::Completed));
    let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
        .await
        .unwrap();
    assert_eq!(updated.status, WorkflowStatus::InProgress);
}

#[tokio::test]
async fn import_cannot_force_status_past_a_qualifying_edit() {
    let (repo, engine) = harness();
    let assessment = seeded_assessment(&repo, WorkflowStatus::Completed).await;

    // One import row edits a qualifying field and carries State = Completed.
    let descriptor = ChangeDescriptor::new(actor())
        .bulk_import()
        .with_field("test_plan", None, Some("revised".to_string()))
        .with_explicit_status(ExplicitStatus::Status(WorkflowStatus::Completed));
    let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
        .await
        .unwrap();
    assert_eq!(updated.status, WorkflowStatus::InProgress);
}

#[tokio::test]
async fn import_status_alone_is_honored() {
    let (repo, engine) = harness();
    let assessment = seeded_assessment(&repo, WorkflowStatus::NotStarted).await;
    let descriptor = ChangeDescriptor::new(actor())
        .bulk_import()
        .with_explicit_status(ExplicitStatus::Status(WorkflowStatus::InReview));
    let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
        .await
        .unwrap();
    assert_eq!(updated.status, WorkflowStatus::InReview);
}

#[tokio::test]
async fn full_review_cycle() {
    let (repo, _engine) = harness();
    let control = Control::new("Segregation of duties");
    repo.put_control(control.clone()).await.unwrap();
    let reviewable = ReviewableRef::Control(control.id);

    let review = Review::new(reviewable, NotificationType::Email, "creator@example.com");
    repo.put_review(review.clone()).await.unwrap();
    assert_eq!(review.status, ReviewStatus::Unreviewed);

    // Approve: stamped with the reviewer.
    let review = set_review_status(&*repo, review, ReviewStatus::Reviewed, "reviewer@example.com")
        .await
        .unwrap();
    assert_eq!(review.status, ReviewStatus::Reviewed);
    assert_eq!(
        review.last_reviewed_by.as_deref(),
        Some("reviewer@example.com")
    );
    let stamp = review.last_reviewed_at;

    // Any edit to the reviewed object resets the review.
    let descriptor = ChangeDescriptor::new(actor()).with_field(
        "description",
        None,
        Some("tightened wording".to_string()),
    );
    let review = commit_reviewable_change(&*repo, &reviewable, &descriptor)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(review.status, ReviewStatus::Unreviewed);
    // The historical stamp survives the reset.
    assert_eq!(review.last_reviewed_at, stamp);

    // An inert change (assignee mapping) leaves the review alone.
    let review = set_review_status(&*repo, review, ReviewStatus::Reviewed, "reviewer@example.com")
        .await
        .unwrap();
    let descriptor =
        ChangeDescriptor::new(actor()).with_added(RelationshipCategory::Assignee);
    let review = commit_reviewable_change(&*repo, &reviewable, &descriptor)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(review.status, ReviewStatus::Reviewed);
}

#[tokio::test]
async fn issue_link_mapping_resets_a_review_but_not_an_assessment() {
    let (repo, engine) = harness();

    // Assessments ignore Issue mappings.
    let assessment = seeded_assessment(&repo, WorkflowStatus::Completed).await;
    let descriptor = ChangeDescriptor::new(actor()).with_added(RelationshipCategory::IssueLink);
    let updated = commit_assessment_change(&*repo, &engine, None, assessment, &descriptor)
        .await
        .unwrap();
    assert_eq!(updated.status, WorkflowStatus::Completed);

    // Reviews treat them as qualifying.
    let reviewable = ReviewableRef::Risk(Uuid::new_v4());
    let mut review = Review::new(reviewable, NotificationType::Email, "creator@example.com");
    review.status = ReviewStatus::Reviewed;
    repo.put_review(review).await.unwrap();

    let review = commit_reviewable_change(&*repo, &reviewable, &descriptor)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(review.status, ReviewStatus::Unreviewed);
}
