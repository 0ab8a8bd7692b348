//! Repository abstraction for record persistence.
//!
//! The `GrcRepository` trait abstracts storage for all record types so the
//! mutation boundary and handlers never see a concrete backend. Two
//! implementations are provided: in-memory (tests, ephemeral runs) and
//! SQLite (the deployed backend).

mod memory;
mod sqlite;

pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::records::{
    Assessment, Comment, Control, Document, Relationship, Review, ReviewableRef, Risk,
};

/// Errors from the storage backend.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage failure during {operation}: {message}")]
    Storage { operation: String, message: String },
}

impl RepositoryError {
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Storage operations for all record types. All writes are upserts.
#[async_trait]
pub trait GrcRepository: Send + Sync {
    async fn put_assessment(&self, assessment: Assessment) -> Result<(), RepositoryError>;
    async fn get_assessment(&self, id: Uuid) -> Result<Option<Assessment>, RepositoryError>;
    async fn list_assessments(&self) -> Result<Vec<Assessment>, RepositoryError>;
    /// Lookup by the import key (the human-facing code).
    async fn find_assessment_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Assessment>, RepositoryError>;

    async fn put_relationship(&self, relationship: Relationship) -> Result<(), RepositoryError>;
    async fn get_relationship(&self, id: Uuid)
        -> Result<Option<Relationship>, RepositoryError>;
    async fn delete_relationship(
        &self,
        id: Uuid,
    ) -> Result<Option<Relationship>, RepositoryError>;
    async fn list_relationships(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<Relationship>, RepositoryError>;

    async fn put_document(&self, document: Document) -> Result<(), RepositoryError>;
    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, RepositoryError>;
    async fn delete_document(&self, id: Uuid) -> Result<Option<Document>, RepositoryError>;
    async fn list_documents(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<Document>, RepositoryError>;

    async fn put_comment(&self, comment: Comment) -> Result<(), RepositoryError>;
    async fn list_comments(&self, assessment_id: Uuid) -> Result<Vec<Comment>, RepositoryError>;

    async fn put_control(&self, control: Control) -> Result<(), RepositoryError>;
    async fn get_control(&self, id: Uuid) -> Result<Option<Control>, RepositoryError>;
    async fn delete_control(&self, id: Uuid) -> Result<Option<Control>, RepositoryError>;
    async fn list_controls(&self) -> Result<Vec<Control>, RepositoryError>;

    async fn put_risk(&self, risk: Risk) -> Result<(), RepositoryError>;
    async fn get_risk(&self, id: Uuid) -> Result<Option<Risk>, RepositoryError>;
    async fn delete_risk(&self, id: Uuid) -> Result<Option<Risk>, RepositoryError>;
    async fn list_risks(&self) -> Result<Vec<Risk>, RepositoryError>;

    async fn put_review(&self, review: Review) -> Result<(), RepositoryError>;
    async fn get_review(&self, id: Uuid) -> Result<Option<Review>, RepositoryError>;
    async fn delete_review(&self, id: Uuid) -> Result<Option<Review>, RepositoryError>;
    /// The review attached to a reviewable object, if one exists.
    async fn find_review_for(
        &self,
        reviewable: &ReviewableRef,
    ) -> Result<Option<Review>, RepositoryError>;
    async fn list_reviews(&self) -> Result<Vec<Review>, RepositoryError>;
}
