//! Bulk import.
//!
//! Rows are keyed by slug: a known slug updates the existing assessment, an
//! unknown one creates a new record. Each row is one persistence unit; the
//! engine sees the row's edits and its explicit `status` column together, so
//! an imported status cannot override a demotion the same row causes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::actor_from_headers;
use crate::error::ApiError;
use crate::mutation::commit_assessment_change;
use crate::records::{Assessment, AssessmentPatch};
use crate::AppState;
use gavel_core::{Actor, ChangeDescriptor, ExplicitStatus, ObjectKind};

#[derive(Debug, Clone, Deserialize)]
pub struct ImportRow {
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub assessment_type: Option<ObjectKind>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub test_plan: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub label: Option<String>,
    /// The explicit `State` column, if the sheet carries one.
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub rows: Vec<ImportRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RowOutcome {
    Created { slug: String, status: String },
    Updated { slug: String, status: String },
    Failed { slug: String, error: String },
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub results: Vec<RowOutcome>,
}

pub async fn run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, ApiError> {
    let actor = actor_from_headers(&headers);
    let mut results = Vec::with_capacity(body.rows.len());

    for row in body.rows {
        let slug = row.slug.clone();
        match import_row(&state, &actor, row).await {
            Ok(outcome) => results.push(outcome),
            Err(e) => {
                warn!(slug = %slug, "Import row failed: {e}");
                results.push(RowOutcome::Failed {
                    slug,
                    error: e.to_string(),
                });
            }
        }
    }

    Ok(Json(ImportResponse { results }))
}

async fn import_row(
    state: &AppState,
    actor: &Actor,
    row: ImportRow,
) -> Result<RowOutcome, ApiError> {
    if row.slug.trim().is_empty() {
        return Err(ApiError::validation("row is missing a slug"));
    }

    let explicit = row
        .status
        .as_deref()
        .map(ExplicitStatus::parse)
        .transpose()?;

    match state.repository.find_assessment_by_slug(&row.slug).await? {
        Some(mut assessment) => {
            let patch = AssessmentPatch {
                title: row.title,
                description: row.description,
                notes: row.notes,
                test_plan: row.test_plan,
                start_date: row.start_date,
                assessment_type: row.assessment_type,
                label: row.label,
                ..Default::default()
            };
            let changes = patch.apply(&mut assessment);

            let mut descriptor = ChangeDescriptor::new(actor.clone())
                .with_focus(assessment.assessment_type)
                .bulk_import();
            descriptor.changed_fields = changes;
            if let Some(explicit) = explicit {
                descriptor = descriptor.with_explicit_status(explicit);
            }

            let updated =
                commit_assessment_change(
                &*state.repository,
                &state.engine,
                state.tracker.as_ref(),
                assessment,
                &descriptor,
            )
            .await?;
            Ok(RowOutcome::Updated {
                slug: row.slug,
                status: updated.status.to_string(),
            })
        }
        None => {
            let title = row
                .title
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| ApiError::validation("new row is missing a title"))?;
            let assessment_type = row
                .assessment_type
                .ok_or_else(|| ApiError::validation("new row is missing an assessment type"))?;

            let mut assessment = Assessment::new(title, assessment_type);
            assessment.slug = row.slug.clone();
            assessment.description = row.description.unwrap_or_default();
            assessment.notes = row.notes.unwrap_or_default();
            assessment.test_plan = row.test_plan.unwrap_or_default();
            assessment.start_date = row.start_date;
            assessment.label = row.label;
            state.repository.put_assessment(assessment.clone()).await?;

            // A freshly created row has no prior edits, so its explicit
            // status column is honored as-is.
            let mut descriptor = ChangeDescriptor::new(actor.clone())
                .with_focus(assessment.assessment_type)
                .bulk_import();
            if let Some(explicit) = explicit {
                descriptor = descriptor.with_explicit_status(explicit);
            }
            let created =
                commit_assessment_change(
                &*state.repository,
                &state.engine,
                state.tracker.as_ref(),
                assessment,
                &descriptor,
            )
            .await?;
            Ok(RowOutcome::Created {
                slug: row.slug,
                status: created.status.to_string(),
            })
        }
    }
}
