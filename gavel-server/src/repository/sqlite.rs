//! SQLite implementation of `GrcRepository`.
//!
//! Records are stored as JSON blobs keyed by id, with the columns the
//! queries filter on (slug, owning assessment, reviewable reference) lifted
//! into indexed columns.
//!
//! # Schema versioning
//!
//! A `schema_version` table tracks the schema. When the schema changes,
//! increment `CURRENT_SCHEMA_VERSION` and add a migration step in
//! `run_migrations`; migrations run sequentially from the stored version to
//! the target.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::{GrcRepository, RepositoryError};
use crate::records::{
    Assessment, Comment, Control, Document, Relationship, Review, ReviewableRef, Risk,
};

/// Increment when making schema changes, with a matching migration step.
const CURRENT_SCHEMA_VERSION: i64 = 1;

/// SQLite-backed repository.
///
/// rusqlite is synchronous; every operation runs on the blocking thread pool
/// via `tokio::task::spawn_blocking` so it never stalls the async runtime.
pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRepository {
    /// Open (or create) the database at `path` and bring the schema up to
    /// date. `:memory:` is accepted for tests.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path_ref = path.as_ref();
        let path_str = path_ref.to_string_lossy();

        if path_str != ":memory:" && !path_str.is_empty() {
            if let Some(parent) = path_ref.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        RepositoryError::storage(
                            "create database directory",
                            format!("{}: {}", parent.display(), e),
                        )
                    })?;
                }
            }
        }

        let conn = Connection::open(path_ref)
            .map_err(|e| RepositoryError::storage("open database", e.to_string()))?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA busy_timeout = 5000;
            "#,
        )
        .map_err(|e| RepositoryError::storage("configure pragmas", e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );
            "#,
        )
        .map_err(|e| RepositoryError::storage("create schema_version", e.to_string()))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> Result<T, RepositoryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, RepositoryError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| {
                RepositoryError::storage(operation, "connection mutex poisoned")
            })?;
            f(&guard)
        })
        .await
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?
    }
}

fn run_migrations(conn: &Connection) -> Result<(), RepositoryError> {
    let version: Option<i64> = conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .optional()
        .map_err(|e| RepositoryError::storage("read schema version", e.to_string()))?;

    let mut version = match version {
        Some(v) => v,
        None => {
            conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])
                .map_err(|e| {
                    RepositoryError::storage("initialize schema version", e.to_string())
                })?;
            0
        }
    };

    while version < CURRENT_SCHEMA_VERSION {
        match version {
            0 => {
                info!("Migrating database schema to version 1");
                conn.execute_batch(
                    r#"
                    CREATE TABLE assessments (
                        id TEXT PRIMARY KEY,
                        slug TEXT NOT NULL DEFAULT '',
                        data TEXT NOT NULL
                    );
                    CREATE INDEX idx_assessments_slug ON assessments (slug);

                    CREATE TABLE relationships (
                        id TEXT PRIMARY KEY,
                        assessment_id TEXT NOT NULL,
                        data TEXT NOT NULL
                    );
                    CREATE INDEX idx_relationships_assessment
                        ON relationships (assessment_id);

                    CREATE TABLE documents (
                        id TEXT PRIMARY KEY,
                        assessment_id TEXT NOT NULL,
                        data TEXT NOT NULL
                    );
                    CREATE INDEX idx_documents_assessment ON documents (assessment_id);

                    CREATE TABLE comments (
                        id TEXT PRIMARY KEY,
                        assessment_id TEXT NOT NULL,
                        data TEXT NOT NULL
                    );
                    CREATE INDEX idx_comments_assessment ON comments (assessment_id);

                    CREATE TABLE controls (
                        id TEXT PRIMARY KEY,
                        data TEXT NOT NULL
                    );

                    CREATE TABLE risks (
                        id TEXT PRIMARY KEY,
                        data TEXT NOT NULL
                    );

                    CREATE TABLE reviews (
                        id TEXT PRIMARY KEY,
                        reviewable_kind TEXT NOT NULL,
                        reviewable_id TEXT NOT NULL,
                        data TEXT NOT NULL
                    );
                    CREATE UNIQUE INDEX idx_reviews_reviewable
                        ON reviews (reviewable_kind, reviewable_id);
                    "#,
                )
                .map_err(|e| {
                    RepositoryError::storage("migrate to schema v1", e.to_string())
                })?;
            }
            other => {
                return Err(RepositoryError::storage(
                    "run migrations",
                    format!("no migration defined from schema version {other}"),
                ));
            }
        }
        version += 1;
        conn.execute("UPDATE schema_version SET version = ?1", params![version])
            .map_err(|e| RepositoryError::storage("bump schema version", e.to_string()))?;
    }

    Ok(())
}

fn encode<T: Serialize>(operation: &'static str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::storage(operation, e.to_string()))
}

fn decode<T: DeserializeOwned>(operation: &'static str, data: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(data).map_err(|e| RepositoryError::storage(operation, e.to_string()))
}

fn get_by_id<T: DeserializeOwned>(
    conn: &Connection,
    operation: &'static str,
    table: &str,
    id: Uuid,
) -> Result<Option<T>, RepositoryError> {
    let data: Option<String> = conn
        .query_row(
            &format!("SELECT data FROM {table} WHERE id = ?1"),
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?;
    data.map(|d| decode(operation, &d)).transpose()
}

fn delete_by_id<T: DeserializeOwned>(
    conn: &Connection,
    operation: &'static str,
    table: &str,
    id: Uuid,
) -> Result<Option<T>, RepositoryError> {
    let existing = get_by_id(conn, operation, table, id)?;
    if existing.is_some() {
        conn.execute(
            &format!("DELETE FROM {table} WHERE id = ?1"),
            params![id.to_string()],
        )
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?;
    }
    Ok(existing)
}

fn list_all<T: DeserializeOwned>(
    conn: &Connection,
    operation: &'static str,
    table: &str,
) -> Result<Vec<T>, RepositoryError> {
    let mut stmt = conn
        .prepare(&format!("SELECT data FROM {table}"))
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        let data = row.map_err(|e| RepositoryError::storage(operation, e.to_string()))?;
        out.push(decode(operation, &data)?);
    }
    Ok(out)
}

fn list_by_assessment<T: DeserializeOwned>(
    conn: &Connection,
    operation: &'static str,
    table: &str,
    assessment_id: Uuid,
) -> Result<Vec<T>, RepositoryError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT data FROM {table} WHERE assessment_id = ?1"
        ))
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?;
    let rows = stmt
        .query_map(params![assessment_id.to_string()], |row| {
            row.get::<_, String>(0)
        })
        .map_err(|e| RepositoryError::storage(operation, e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        let data = row.map_err(|e| RepositoryError::storage(operation, e.to_string()))?;
        out.push(decode(operation, &data)?);
    }
    Ok(out)
}

#[async_trait]
impl GrcRepository for SqliteRepository {
    async fn put_assessment(&self, assessment: Assessment) -> Result<(), RepositoryError> {
        self.with_conn("put assessment", move |conn| {
            let data = encode("put assessment", &assessment)?;
            conn.execute(
                "INSERT INTO assessments (id, slug, data) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET slug = ?2, data = ?3",
                params![assessment.id.to_string(), assessment.slug, data],
            )
            .map_err(|e| RepositoryError::storage("put assessment", e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_assessment(&self, id: Uuid) -> Result<Option<Assessment>, RepositoryError> {
        self.with_conn("get assessment", move |conn| {
            get_by_id(conn, "get assessment", "assessments", id)
        })
        .await
    }

    async fn list_assessments(&self) -> Result<Vec<Assessment>, RepositoryError> {
        self.with_conn("list assessments", move |conn| {
            list_all(conn, "list assessments", "assessments")
        })
        .await
    }

    async fn find_assessment_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Assessment>, RepositoryError> {
        let slug = slug.to_string();
        self.with_conn("find assessment by slug", move |conn| {
            let data: Option<String> = conn
                .query_row(
                    "SELECT data FROM assessments WHERE slug = ?1 AND slug != ''",
                    params![slug],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| {
                    RepositoryError::storage("find assessment by slug", e.to_string())
                })?;
            data.map(|d| decode("find assessment by slug", &d)).transpose()
        })
        .await
    }

    async fn put_relationship(&self, relationship: Relationship) -> Result<(), RepositoryError> {
        self.with_conn("put relationship", move |conn| {
            let data = encode("put relationship", &relationship)?;
            conn.execute(
                "INSERT INTO relationships (id, assessment_id, data) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET assessment_id = ?2, data = ?3",
                params![
                    relationship.id.to_string(),
                    relationship.assessment_id.to_string(),
                    data
                ],
            )
            .map_err(|e| RepositoryError::storage("put relationship", e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_relationship(
        &self,
        id: Uuid,
    ) -> Result<Option<Relationship>, RepositoryError> {
        self.with_conn("get relationship", move |conn| {
            get_by_id(conn, "get relationship", "relationships", id)
        })
        .await
    }

    async fn delete_relationship(
        &self,
        id: Uuid,
    ) -> Result<Option<Relationship>, RepositoryError> {
        self.with_conn("delete relationship", move |conn| {
            delete_by_id(conn, "delete relationship", "relationships", id)
        })
        .await
    }

    async fn list_relationships(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<Relationship>, RepositoryError> {
        self.with_conn("list relationships", move |conn| {
            list_by_assessment(conn, "list relationships", "relationships", assessment_id)
        })
        .await
    }

    async fn put_document(&self, document: Document) -> Result<(), RepositoryError> {
        self.with_conn("put document", move |conn| {
            let data = encode("put document", &document)?;
            conn.execute(
                "INSERT INTO documents (id, assessment_id, data) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET assessment_id = ?2, data = ?3",
                params![
                    document.id.to_string(),
                    document.assessment_id.to_string(),
                    data
                ],
            )
            .map_err(|e| RepositoryError::storage("put document", e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, RepositoryError> {
        self.with_conn("get document", move |conn| {
            get_by_id(conn, "get document", "documents", id)
        })
        .await
    }

    async fn delete_document(&self, id: Uuid) -> Result<Option<Document>, RepositoryError> {
        self.with_conn("delete document", move |conn| {
            delete_by_id(conn, "delete document", "documents", id)
        })
        .await
    }

    async fn list_documents(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<Document>, RepositoryError> {
        self.with_conn("list documents", move |conn| {
            list_by_assessment(conn, "list documents", "documents", assessment_id)
        })
        .await
    }

    async fn put_comment(&self, comment: Comment) -> Result<(), RepositoryError> {
        self.with_conn("put comment", move |conn| {
            let data = encode("put comment", &comment)?;
            conn.execute(
                "INSERT INTO comments (id, assessment_id, data) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET assessment_id = ?2, data = ?3",
                params![
                    comment.id.to_string(),
                    comment.assessment_id.to_string(),
                    data
                ],
            )
            .map_err(|e| RepositoryError::storage("put comment", e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn list_comments(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<Comment>, RepositoryError> {
        self.with_conn("list comments", move |conn| {
            let mut comments: Vec<Comment> =
                list_by_assessment(conn, "list comments", "comments", assessment_id)?;
            comments.sort_by_key(|c| c.created_at);
            Ok(comments)
        })
        .await
    }

    async fn put_control(&self, control: Control) -> Result<(), RepositoryError> {
        self.with_conn("put control", move |conn| {
            let data = encode("put control", &control)?;
            conn.execute(
                "INSERT INTO controls (id, data) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET data = ?2",
                params![control.id.to_string(), data],
            )
            .map_err(|e| RepositoryError::storage("put control", e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_control(&self, id: Uuid) -> Result<Option<Control>, RepositoryError> {
        self.with_conn("get control", move |conn| {
            get_by_id(conn, "get control", "controls", id)
        })
        .await
    }

    async fn delete_control(&self, id: Uuid) -> Result<Option<Control>, RepositoryError> {
        self.with_conn("delete control", move |conn| {
            delete_by_id(conn, "delete control", "controls", id)
        })
        .await
    }

    async fn list_controls(&self) -> Result<Vec<Control>, RepositoryError> {
        self.with_conn("list controls", move |conn| {
            list_all(conn, "list controls", "controls")
        })
        .await
    }

    async fn put_risk(&self, risk: Risk) -> Result<(), RepositoryError> {
        self.with_conn("put risk", move |conn| {
            let data = encode("put risk", &risk)?;
            conn.execute(
                "INSERT INTO risks (id, data) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET data = ?2",
                params![risk.id.to_string(), data],
            )
            .map_err(|e| RepositoryError::storage("put risk", e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_risk(&self, id: Uuid) -> Result<Option<Risk>, RepositoryError> {
        self.with_conn("get risk", move |conn| get_by_id(conn, "get risk", "risks", id))
            .await
    }

    async fn delete_risk(&self, id: Uuid) -> Result<Option<Risk>, RepositoryError> {
        self.with_conn("delete risk", move |conn| {
            delete_by_id(conn, "delete risk", "risks", id)
        })
        .await
    }

    async fn list_risks(&self) -> Result<Vec<Risk>, RepositoryError> {
        self.with_conn("list risks", move |conn| list_all(conn, "list risks", "risks"))
            .await
    }

    async fn put_review(&self, review: Review) -> Result<(), RepositoryError> {
        self.with_conn("put review", move |conn| {
            let data = encode("put review", &review)?;
            conn.execute(
                "INSERT INTO reviews (id, reviewable_kind, reviewable_id, data)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE
                 SET reviewable_kind = ?2, reviewable_id = ?3, data = ?4",
                params![
                    review.id.to_string(),
                    review.reviewable.kind().as_str(),
                    review.reviewable.id().to_string(),
                    data
                ],
            )
            .map_err(|e| RepositoryError::storage("put review", e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_review(&self, id: Uuid) -> Result<Option<Review>, RepositoryError> {
        self.with_conn("get review", move |conn| {
            get_by_id(conn, "get review", "reviews", id)
        })
        .await
    }

    async fn delete_review(&self, id: Uuid) -> Result<Option<Review>, RepositoryError> {
        self.with_conn("delete review", move |conn| {
            delete_by_id(conn, "delete review", "reviews", id)
        })
        .await
    }

    async fn find_review_for(
        &self,
        reviewable: &ReviewableRef,
    ) -> Result<Option<Review>, RepositoryError> {
        let kind = reviewable.kind().as_str();
        let id = reviewable.id().to_string();
        self.with_conn("find review", move |conn| {
            let data: Option<String> = conn
                .query_row(
                    "SELECT data FROM reviews
                     WHERE reviewable_kind = ?1 AND reviewable_id = ?2",
                    params![kind, id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| RepositoryError::storage("find review", e.to_string()))?;
            data.map(|d| decode("find review", &d)).transpose()
        })
        .await
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        self.with_conn("list reviews", move |conn| {
            list_all(conn, "list reviews", "reviews")
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::NotificationType;
    use gavel_core::{ObjectKind, ReviewStatus, WorkflowStatus};

    fn temp_repo() -> (tempfile::TempDir, SqliteRepository) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let repo = SqliteRepository::new(dir.path().join("gavel-state.db"))
            .expect("open sqlite repository");
        (dir, repo)
    }

    #[tokio::test]
    async fn test_assessment_round_trip() {
        let (_dir, repo) = temp_repo();
        let mut assessment = Assessment::new("Access review", ObjectKind::Control);
        assessment.slug = "ASSESSMENT-1".to_string();
        assessment.status = WorkflowStatus::InReview;

        repo.put_assessment(assessment.clone()).await.unwrap();
        let fetched = repo.get_assessment(assessment.id).await.unwrap().unwrap();
        assert_eq!(fetched, assessment);

        let by_slug = repo
            .find_assessment_by_slug("ASSESSMENT-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_slug.id, assessment.id);
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let (_dir, repo) = temp_repo();
        let mut assessment = Assessment::new("Access review", ObjectKind::Control);
        repo.put_assessment(assessment.clone()).await.unwrap();

        assessment.status = WorkflowStatus::InProgress;
        repo.put_assessment(assessment.clone()).await.unwrap();

        let fetched = repo.get_assessment(assessment.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, WorkflowStatus::InProgress);
        assert_eq!(repo.list_assessments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_review_lookup_and_delete() {
        let (_dir, repo) = temp_repo();
        let control = Control::new("Segregation of duties");
        let reviewable = ReviewableRef::Control(control.id);
        let mut review = Review::new(reviewable, NotificationType::Email, "creator@example.com");
        review.status = ReviewStatus::Reviewed;

        repo.put_review(review.clone()).await.unwrap();
        let found = repo.find_review_for(&reviewable).await.unwrap().unwrap();
        assert_eq!(found.status, ReviewStatus::Reviewed);

        let deleted = repo.delete_review(review.id).await.unwrap();
        assert!(deleted.is_some());
        assert!(repo.find_review_for(&reviewable).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_schema_survives_reopen() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("gavel-state.db");

        let assessment = Assessment::new("Persisted", ObjectKind::Risk);
        {
            let repo = SqliteRepository::new(&path).unwrap();
            repo.put_assessment(assessment.clone()).await.unwrap();
        }

        let repo = SqliteRepository::new(&path).unwrap();
        let fetched = repo.get_assessment(assessment.id).await.unwrap().unwrap();
        assert_eq!(fetched, assessment);
    }

    #[tokio::test]
    async fn test_documents_scoped_to_assessment() {
        let (_dir, repo) = temp_repo();
        let a = Assessment::new("A", ObjectKind::Control);
        let b = Assessment::new("B", ObjectKind::Control);
        let now = chrono::Utc::now();
        for (owner, title) in [(&a, "evidence-a"), (&b, "evidence-b")] {
            repo.put_document(Document {
                id: Uuid::new_v4(),
                assessment_id: owner.id,
                kind: gavel_core::DocumentKind::Evidence,
                title: title.to_string(),
                link: format!("https://example.com/{title}"),
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        }

        let docs = repo.list_documents(a.id).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "evidence-a");
    }
}
