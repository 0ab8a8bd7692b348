//! Review record handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::actor_from_headers;
use crate::error::ApiError;
use crate::mutation::set_review_status;
use crate::records::{NotificationType, Review, ReviewableRef, TrackerLink};
use crate::tracker::IssueRequest;
use crate::AppState;
use gavel_core::ReviewStatus;

#[derive(Debug, Deserialize)]
pub struct CreateReview {
    pub reviewable: ReviewableRef,
    #[serde(default)]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub email_message: Option<String>,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateReview>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let title = reviewable_title(&state, &body.reviewable).await?;

    if state
        .repository
        .find_review_for(&body.reviewable)
        .await?
        .is_some()
    {
        return Err(ApiError::validation(
            "a review already exists for this object",
        ));
    }

    let actor = actor_from_headers(&headers);
    let mut review = Review::new(body.reviewable, body.notification_type, actor.email);
    review.email_message = body.email_message.unwrap_or_default();

    if body.notification_type == NotificationType::IssueTracker {
        review.issue_link = Some(match &state.tracker {
            Some(client) => {
                let request = IssueRequest {
                    title: format!("Review requested: {title}"),
                    description: review.email_message.clone(),
                    component_id: None,
                    hotlist_id: None,
                    priority: None,
                    severity: None,
                };
                client.create_link(&request).await
            }
            None => {
                // No tracker configured: keep the link, leave sync off.
                let mut link = TrackerLink::enabled();
                link.enabled = false;
                link
            }
        });
    }

    state.repository.put_review(review.clone()).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn reviewable_title(
    state: &AppState,
    reviewable: &ReviewableRef,
) -> Result<String, ApiError> {
    match reviewable {
        ReviewableRef::Control(id) => state
            .repository
            .get_control(*id)
            .await?
            .map(|c| c.title)
            .ok_or_else(|| ApiError::validation(format!("no control {id}"))),
        ReviewableRef::Risk(id) => state
            .repository
            .get_risk(*id)
            .await?
            .map(|r| r.title)
            .ok_or_else(|| ApiError::validation(format!("no risk {id}"))),
    }
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Review>, ApiError> {
    let review = state
        .repository
        .get_review(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no review {id}")))?;
    Ok(Json(review))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(state.repository.list_reviews().await?))
}

#[derive(Debug, Deserialize)]
pub struct ReviewPatch {
    pub status: Option<String>,
    pub email_message: Option<String>,
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(patch): Json<ReviewPatch>,
) -> Result<Json<Review>, ApiError> {
    let mut review = state
        .repository
        .get_review(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no review {id}")))?;

    if let Some(message) = patch.email_message {
        review.email_message = message;
        review.updated_at = Utc::now();
        state.repository.put_review(review.clone()).await?;
    }

    if let Some(value) = patch.status {
        let target = ReviewStatus::parse(&value)?;
        let actor = actor_from_headers(&headers);
        review = set_review_status(&*state.repository, review, target, &actor.email).await?;
    }

    Ok(Json(review))
}
