//! Assessment handlers.
//!
//! Each mutating handler applies the request to the record, builds the
//! change descriptor for what it did, and commits through the mutation
//! boundary so the status engine sees every persistence unit exactly once.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::actor_from_headers;
use crate::error::ApiError;
use crate::records::{
    Assessment, AssessmentPatch, Comment, Document, Relationship, RelationshipTarget, TrackerLink,
};
use crate::tracker::IssueRequest;
use crate::AppState;
use gavel_core::{ChangeDescriptor, DocumentKind, ExplicitStatus, ObjectKind, RelationshipCategory};

#[derive(Debug, Deserialize)]
pub struct CreateAssessment {
    pub title: String,
    pub assessment_type: ObjectKind,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub test_plan: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub label: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAssessment>,
) -> Result<(StatusCode, Json<Assessment>), ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::validation("title must not be empty"));
    }
    let mut assessment = Assessment::new(body.title, body.assessment_type);
    assessment.description = body.description.unwrap_or_default();
    assessment.notes = body.notes.unwrap_or_default();
    assessment.test_plan = body.test_plan.unwrap_or_default();
    assessment.slug = body.slug.unwrap_or_default();
    assessment.start_date = body.start_date;
    assessment.label = body.label;

    state.repository.put_assessment(assessment.clone()).await?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Assessment>, ApiError> {
    let assessment = state
        .repository
        .get_assessment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no assessment {id}")))?;
    Ok(Json(assessment))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Assessment>>, ApiError> {
    Ok(Json(state.repository.list_assessments().await?))
}

/// Patch an assessment. Field edits and an explicit status-set may arrive in
/// the same request; the engine arbitrates between them.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(mut patch): Json<AssessmentPatch>,
) -> Result<Json<Assessment>, ApiError> {
    let mut assessment = state
        .repository
        .get_assessment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no assessment {id}")))?;

    let requested_status = patch.status.take();
    let changes = patch.apply(&mut assessment);

    let mut descriptor = ChangeDescriptor::new(actor_from_headers(&headers))
        .with_focus(assessment.assessment_type);
    descriptor.changed_fields = changes;

    if let Some(value) = requested_status {
        let explicit = ExplicitStatus::parse(&value)?;
        if !echoes_current(&assessment, explicit) {
            descriptor = descriptor.with_explicit_status(explicit);
        }
    }

    let updated = crate::mutation::commit_assessment_change(
        &*state.repository,
        &state.engine,
        state.tracker.as_ref(),
        assessment,
        &descriptor,
    )
    .await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct EnableTracker {
    #[serde(default)]
    pub component_id: Option<String>,
    #[serde(default)]
    pub hotlist_id: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

/// Attach an issue-tracker link to an assessment. Creates the remote issue
/// when a tracker is configured; otherwise the link is stored disabled so an
/// operator can re-enable sync later. Attaching the link is bookkeeping, not
/// a qualifying change.
pub async fn enable_tracker(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<EnableTracker>,
) -> Result<(StatusCode, Json<Assessment>), ApiError> {
    let mut assessment = state
        .repository
        .get_assessment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no assessment {id}")))?;
    if assessment.tracker.is_some() {
        return Err(ApiError::validation(
            "a tracker link already exists for this assessment",
        ));
    }

    let link = match &state.tracker {
        Some(client) => {
            let request = IssueRequest {
                title: assessment.title.clone(),
                description: assessment.description.clone(),
                component_id: body.component_id,
                hotlist_id: body.hotlist_id,
                priority: body.priority,
                severity: body.severity,
            };
            client.create_link(&request).await
        }
        None => {
            let mut link = TrackerLink::enabled();
            link.enabled = false;
            link.component_id = body.component_id;
            link.hotlist_id = body.hotlist_id;
            link.priority = body.priority;
            link.severity = body.severity;
            link
        }
    };

    assessment.tracker = Some(link);
    assessment.updated_at = Utc::now();
    state.repository.put_assessment(assessment.clone()).await?;
    Ok((StatusCode::CREATED, Json(assessment)))
}

/// A re-send of the stored status is not an explicit set.
fn echoes_current(assessment: &Assessment, explicit: ExplicitStatus) -> bool {
    match explicit {
        ExplicitStatus::Status(status) => status == assessment.status,
        ExplicitStatus::Verified => {
            assessment.verified && assessment.status == gavel_core::WorkflowStatus::Completed
        }
    }
}

pub async fn add_relationship(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(target): Json<RelationshipTarget>,
) -> Result<(StatusCode, Json<Relationship>), ApiError> {
    let assessment = state
        .repository
        .get_assessment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no assessment {id}")))?;

    let relationship = Relationship::new(id, target);
    state
        .repository
        .put_relationship(relationship.clone())
        .await?;

    let descriptor = ChangeDescriptor::new(actor_from_headers(&headers))
        .with_focus(assessment.assessment_type)
        .with_added(relationship.target.category());
    crate::mutation::commit_assessment_change(
        &*state.repository,
        &state.engine,
        state.tracker.as_ref(),
        assessment,
        &descriptor,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(relationship)))
}

pub async fn list_relationships(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Relationship>>, ApiError> {
    Ok(Json(state.repository.list_relationships(id).await?))
}

pub async fn remove_relationship(
    State(state): State<Arc<AppState>>,
    Path((id, relationship_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<Relationship>, ApiError> {
    let assessment = state
        .repository
        .get_assessment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no assessment {id}")))?;
    let relationship = state
        .repository
        .get_relationship(relationship_id)
        .await?
        .filter(|r| r.assessment_id == id)
        .ok_or_else(|| ApiError::not_found(format!("no relationship {relationship_id}")))?;

    state.repository.delete_relationship(relationship_id).await?;

    // Unmapping is symmetric with mapping for status purposes.
    let descriptor = ChangeDescriptor::new(actor_from_headers(&headers))
        .with_focus(assessment.assessment_type)
        .with_removed(relationship.target.category());
    crate::mutation::commit_assessment_change(
        &*state.repository,
        &state.engine,
        state.tracker.as_ref(),
        assessment,
        &descriptor,
    )
    .await?;

    Ok(Json(relationship))
}

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    pub description: String,
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    if body.description.trim().is_empty() {
        return Err(ApiError::validation("comment description must not be empty"));
    }
    let assessment = state
        .repository
        .get_assessment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no assessment {id}")))?;

    let actor = actor_from_headers(&headers);
    let comment = Comment {
        id: Uuid::new_v4(),
        assessment_id: id,
        description: body.description,
        created_by: actor.email.clone(),
        created_at: Utc::now(),
    };
    state.repository.put_comment(comment.clone()).await?;

    let descriptor = ChangeDescriptor::new(actor)
        .with_focus(assessment.assessment_type)
        .with_added(RelationshipCategory::Comment);
    crate::mutation::commit_assessment_change(
        &*state.repository,
        &state.engine,
        state.tracker.as_ref(),
        assessment,
        &descriptor,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(state.repository.list_comments(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateDocument {
    pub kind: DocumentKind,
    pub title: String,
    pub link: String,
}

pub async fn add_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<CreateDocument>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let assessment = state
        .repository
        .get_assessment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no assessment {id}")))?;

    let now = Utc::now();
    let document = Document {
        id: Uuid::new_v4(),
        assessment_id: id,
        kind: body.kind,
        title: body.title,
        link: body.link,
        created_at: now,
        updated_at: now,
    };
    state.repository.put_document(document.clone()).await?;

    let descriptor = ChangeDescriptor::new(actor_from_headers(&headers))
        .with_focus(assessment.assessment_type)
        .with_added(RelationshipCategory::Document(document.kind));
    crate::mutation::commit_assessment_change(
        &*state.repository,
        &state.engine,
        state.tracker.as_ref(),
        assessment,
        &descriptor,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.repository.list_documents(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub link: Option<String>,
}

/// Edit a document in place. An edit counts the same as a detach plus a
/// re-attach of that document subtype.
pub async fn update_document(
    State(state): State<Arc<AppState>>,
    Path((id, document_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
    Json(patch): Json<DocumentPatch>,
) -> Result<Json<Document>, ApiError> {
    let assessment = state
        .repository
        .get_assessment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no assessment {id}")))?;
    let mut document = state
        .repository
        .get_document(document_id)
        .await?
        .filter(|d| d.assessment_id == id)
        .ok_or_else(|| ApiError::not_found(format!("no document {document_id}")))?;

    let mut changed = false;
    if let Some(title) = patch.title {
        if document.title != title {
            document.title = title;
            changed = true;
        }
    }
    if let Some(link) = patch.link {
        if document.link != link {
            document.link = link;
            changed = true;
        }
    }
    if !changed {
        return Ok(Json(document));
    }

    document.updated_at = Utc::now();
    state.repository.put_document(document.clone()).await?;

    let descriptor = ChangeDescriptor::new(actor_from_headers(&headers))
        .with_focus(assessment.assessment_type)
        .with_removed(RelationshipCategory::Document(document.kind))
        .with_added(RelationshipCategory::Document(document.kind));
    crate::mutation::commit_assessment_change(
        &*state.repository,
        &state.engine,
        state.tracker.as_ref(),
        assessment,
        &descriptor,
    )
    .await?;

    Ok(Json(document))
}

pub async fn remove_document(
    State(state): State<Arc<AppState>>,
    Path((id, document_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<Document>, ApiError> {
    let assessment = state
        .repository
        .get_assessment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no assessment {id}")))?;
    let document = state
        .repository
        .get_document(document_id)
        .await?
        .filter(|d| d.assessment_id == id)
        .ok_or_else(|| ApiError::not_found(format!("no document {document_id}")))?;

    state.repository.delete_document(document_id).await?;

    let descriptor = ChangeDescriptor::new(actor_from_headers(&headers))
        .with_focus(assessment.assessment_type)
        .with_removed(RelationshipCategory::Document(document.kind));
    crate::mutation::commit_assessment_change(
        &*state.repository,
        &state.engine,
        state.tracker.as_ref(),
        assessment,
        &descriptor,
    )
    .await?;

    Ok(Json(document))
}
