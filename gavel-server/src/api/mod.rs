//! HTTP surface.
//!
//! Handlers translate requests into change descriptors and hand them to the
//! mutation boundary; no handler writes a governed status field itself.

mod assessments;
mod import;
mod reviewables;
mod reviews;

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::AppState;
use gavel_core::Actor;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status_handler))
        .route(
            "/assessments",
            post(assessments::create).get(assessments::list),
        )
        .route(
            "/assessments/{id}",
            get(assessments::get).patch(assessments::update),
        )
        .route(
            "/assessments/{id}/tracker",
            post(assessments::enable_tracker),
        )
        .route(
            "/assessments/{id}/relationships",
            post(assessments::add_relationship).get(assessments::list_relationships),
        )
        .route(
            "/assessments/{id}/relationships/{relationship_id}",
            delete(assessments::remove_relationship),
        )
        .route(
            "/assessments/{id}/comments",
            post(assessments::add_comment).get(assessments::list_comments),
        )
        .route(
            "/assessments/{id}/documents",
            post(assessments::add_document).get(assessments::list_documents),
        )
        .route(
            "/assessments/{id}/documents/{document_id}",
            patch(assessments::update_document).delete(assessments::remove_document),
        )
        .route(
            "/controls",
            post(reviewables::create_control).get(reviewables::list_controls),
        )
        .route(
            "/controls/{id}",
            get(reviewables::get_control)
                .patch(reviewables::update_control)
                .delete(reviewables::delete_control),
        )
        .route(
            "/risks",
            post(reviewables::create_risk).get(reviewables::list_risks),
        )
        .route(
            "/risks/{id}",
            get(reviewables::get_risk)
                .patch(reviewables::update_risk)
                .delete(reviewables::delete_risk),
        )
        .route("/reviews", post(reviews::create).get(reviews::list))
        .route("/reviews/{id}", get(reviews::get).patch(reviews::update))
        .route("/import", post(import::run))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "gavel"
    }))
}

/// Summary counts of every governed record, keyed by status.
async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let assessments = state.repository.list_assessments().await?;
    let reviews = state.repository.list_reviews().await?;

    let mut by_status = std::collections::BTreeMap::new();
    for assessment in &assessments {
        *by_status.entry(assessment.status.as_str()).or_insert(0u64) += 1;
    }
    let reviewed = reviews
        .iter()
        .filter(|r| r.status == gavel_core::ReviewStatus::Reviewed)
        .count();

    Ok(Json(json!({
        "version": crate::service_version(),
        "assessments": {
            "total": assessments.len(),
            "by_status": by_status,
        },
        "reviews": {
            "total": reviews.len(),
            "reviewed": reviewed,
            "unreviewed": reviews.len() - reviewed,
        },
    })))
}

/// The acting user, from the `X-Actor-Email` header. Unauthenticated
/// automation falls back to the service identity.
fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let email = headers
        .get("x-actor-email")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("system@gavel.local")
        .to_string();
    Actor {
        id: uuid::Uuid::new_v4(),
        email,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_falls_back_to_service_identity() {
        let headers = HeaderMap::new();
        assert_eq!(actor_from_headers(&headers).email, "system@gavel.local");

        let mut headers = HeaderMap::new();
        headers.insert("x-actor-email", "person@example.com".parse().unwrap());
        assert_eq!(actor_from_headers(&headers).email, "person@example.com");
    }
}
