//! Control and risk handlers.
//!
//! Mutating a reviewable object feeds its attached review record: any
//! qualifying change resets the review to unreviewed. Deleting the object
//! deletes the review with it.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::actor_from_headers;
use crate::error::ApiError;
use crate::mutation::commit_reviewable_change;
use crate::records::{Control, ControlPatch, ReviewableRef, Risk, RiskPatch, TrackerLink};
use crate::AppState;
use gavel_core::{ChangeDescriptor, ReviewStatus};
use serde::Serialize;

/// REST representation of a reviewable object: the record plus the review
/// state projected onto it. No review record reads as `Unreviewed`.
#[derive(Debug, Serialize)]
pub struct ReviewableView<T> {
    #[serde(flatten)]
    pub record: T,
    pub review_status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_issue_link: Option<TrackerLink>,
}

async fn project<T>(
    state: &AppState,
    reviewable: ReviewableRef,
    record: T,
) -> Result<ReviewableView<T>, ApiError> {
    let review = state.repository.find_review_for(&reviewable).await?;
    Ok(ReviewableView {
        record,
        review_status: review
            .as_ref()
            .map(|r| r.status)
            .unwrap_or(ReviewStatus::Unreviewed),
        review_issue_link: review.and_then(|r| r.issue_link),
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewable {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn create_control(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateReviewable>,
) -> Result<(StatusCode, Json<Control>), ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::validation("title must not be empty"));
    }
    let mut control = Control::new(body.title);
    control.description = body.description.unwrap_or_default();
    control.notes = body.notes.unwrap_or_default();
    state.repository.put_control(control.clone()).await?;
    Ok((StatusCode::CREATED, Json(control)))
}

pub async fn get_control(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewableView<Control>>, ApiError> {
    let control = state
        .repository
        .get_control(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no control {id}")))?;
    Ok(Json(
        project(&state, ReviewableRef::Control(id), control).await?,
    ))
}

pub async fn list_controls(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Control>>, ApiError> {
    Ok(Json(state.repository.list_controls().await?))
}

pub async fn update_control(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(patch): Json<ControlPatch>,
) -> Result<Json<Control>, ApiError> {
    let mut control = state
        .repository
        .get_control(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no control {id}")))?;

    let changes = patch.apply(&mut control);
    if changes.is_empty() {
        return Ok(Json(control));
    }
    control.updated_at = Utc::now();
    state.repository.put_control(control.clone()).await?;

    let mut descriptor = ChangeDescriptor::new(actor_from_headers(&headers));
    descriptor.changed_fields = changes;
    commit_reviewable_change(&*state.repository, &ReviewableRef::Control(id), &descriptor)
        .await?;

    Ok(Json(control))
}

pub async fn delete_control(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Control>, ApiError> {
    let control = state
        .repository
        .delete_control(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no control {id}")))?;

    // The review record has no life of its own.
    if let Some(review) = state
        .repository
        .find_review_for(&ReviewableRef::Control(id))
        .await?
    {
        state.repository.delete_review(review.id).await?;
    }
    Ok(Json(control))
}

pub async fn create_risk(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateReviewable>,
) -> Result<(StatusCode, Json<Risk>), ApiError> {
    if body.title.trim().is_empty() {
        return Err(ApiError::validation("title must not be empty"));
    }
    let mut risk = Risk::new(body.title);
    risk.description = body.description.unwrap_or_default();
    risk.notes = body.notes.unwrap_or_default();
    state.repository.put_risk(risk.clone()).await?;
    Ok((StatusCode::CREATED, Json(risk)))
}

pub async fn get_risk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewableView<Risk>>, ApiError> {
    let risk = state
        .repository
        .get_risk(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no risk {id}")))?;
    Ok(Json(project(&state, ReviewableRef::Risk(id), risk).await?))
}

pub async fn list_risks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Risk>>, ApiError> {
    Ok(Json(state.repository.list_risks().await?))
}

pub async fn update_risk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(patch): Json<RiskPatch>,
) -> Result<Json<Risk>, ApiError> {
    let mut risk = state
        .repository
        .get_risk(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no risk {id}")))?;

    let changes = patch.apply(&mut risk);
    if changes.is_empty() {
        return Ok(Json(risk));
    }
    risk.updated_at = Utc::now();
    state.repository.put_risk(risk.clone()).await?;

    let mut descriptor = ChangeDescriptor::new(actor_from_headers(&headers));
    descriptor.changed_fields = changes;
    commit_reviewable_change(&*state.repository, &ReviewableRef::Risk(id), &descriptor).await?;

    Ok(Json(risk))
}

pub async fn delete_risk(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Risk>, ApiError> {
    let risk = state
        .repository
        .delete_risk(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no risk {id}")))?;

    if let Some(review) = state
        .repository
        .find_review_for(&ReviewableRef::Risk(id))
        .await?
    {
        state.repository.delete_review(review.id).await?;
    }
    Ok(Json(risk))
}
