//! In-memory implementation of `GrcRepository`.
//!
//! All state is held in `RwLock`-protected maps and lost on restart. Used by
//! tests and for ephemeral runs without a state directory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{GrcRepository, RepositoryError};
use crate::records::{
    Assessment, Comment, Control, Document, Relationship, Review, ReviewableRef, Risk,
};

#[derive(Default)]
pub struct InMemoryRepository {
    assessments: RwLock<HashMap<Uuid, Assessment>>,
    relationships: RwLock<HashMap<Uuid, Relationship>>,
    documents: RwLock<HashMap<Uuid, Document>>,
    comments: RwLock<HashMap<Uuid, Comment>>,
    controls: RwLock<HashMap<Uuid, Control>>,
    risks: RwLock<HashMap<Uuid, Risk>>,
    reviews: RwLock<HashMap<Uuid, Review>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GrcRepository for InMemoryRepository {
    async fn put_assessment(&self, assessment: Assessment) -> Result<(), RepositoryError> {
        self.assessments
            .write()
            .await
            .insert(assessment.id, assessment);
        Ok(())
    }

    async fn get_assessment(&self, id: Uuid) -> Result<Option<Assessment>, RepositoryError> {
        Ok(self.assessments.read().await.get(&id).cloned())
    }

    async fn list_assessments(&self) -> Result<Vec<Assessment>, RepositoryError> {
        Ok(self.assessments.read().await.values().cloned().collect())
    }

    async fn find_assessment_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<Assessment>, RepositoryError> {
        Ok(self
            .assessments
            .read()
            .await
            .values()
            .find(|a| a.slug == slug)
            .cloned())
    }

    async fn put_relationship(&self, relationship: Relationship) -> Result<(), RepositoryError> {
        self.relationships
            .write()
            .await
            .insert(relationship.id, relationship);
        Ok(())
    }

    async fn get_relationship(
        &self,
        id: Uuid,
    ) -> Result<Option<Relationship>, RepositoryError> {
        Ok(self.relationships.read().await.get(&id).cloned())
    }

    async fn delete_relationship(
        &self,
        id: Uuid,
    ) -> Result<Option<Relationship>, RepositoryError> {
        Ok(self.relationships.write().await.remove(&id))
    }

    async fn list_relationships(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<Relationship>, RepositoryError> {
        Ok(self
            .relationships
            .read()
            .await
            .values()
            .filter(|r| r.assessment_id == assessment_id)
            .cloned()
            .collect())
    }

    async fn put_document(&self, document: Document) -> Result<(), RepositoryError> {
        self.documents.write().await.insert(document.id, document);
        Ok(())
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<Document>, RepositoryError> {
        Ok(self.documents.read().await.get(&id).cloned())
    }

    async fn delete_document(&self, id: Uuid) -> Result<Option<Document>, RepositoryError> {
        Ok(self.documents.write().await.remove(&id))
    }

    async fn list_documents(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<Document>, RepositoryError> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .filter(|d| d.assessment_id == assessment_id)
            .cloned()
            .collect())
    }

    async fn put_comment(&self, comment: Comment) -> Result<(), RepositoryError> {
        self.comments.write().await.insert(comment.id, comment);
        Ok(())
    }

    async fn list_comments(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<Comment>, RepositoryError> {
        let mut comments: Vec<Comment> = self
            .comments
            .read()
            .await
            .values()
            .filter(|c| c.assessment_id == assessment_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn put_control(&self, control: Control) -> Result<(), RepositoryError> {
        self.controls.write().await.insert(control.id, control);
        Ok(())
    }

    async fn get_control(&self, id: Uuid) -> Result<Option<Control>, RepositoryError> {
        Ok(self.controls.read().await.get(&id).cloned())
    }

    async fn delete_control(&self, id: Uuid) -> Result<Option<Control>, RepositoryError> {
        Ok(self.controls.write().await.remove(&id))
    }

    async fn list_controls(&self) -> Result<Vec<Control>, RepositoryError> {
        Ok(self.controls.read().await.values().cloned().collect())
    }

    async fn put_risk(&self, risk: Risk) -> Result<(), RepositoryError> {
        self.risks.write().await.insert(risk.id, risk);
        Ok(())
    }

    async fn get_risk(&self, id: Uuid) -> Result<Option<Risk>, RepositoryError> {
        Ok(self.risks.read().await.get(&id).cloned())
    }

    async fn delete_risk(&self, id: Uuid) -> Result<Option<Risk>, RepositoryError> {
        Ok(self.risks.write().await.remove(&id))
    }

    async fn list_risks(&self) -> Result<Vec<Risk>, RepositoryError> {
        Ok(self.risks.read().await.values().cloned().collect())
    }

    async fn put_review(&self, review: Review) -> Result<(), RepositoryError> {
        self.reviews.write().await.insert(review.id, review);
        Ok(())
    }

    async fn get_review(&self, id: Uuid) -> Result<Option<Review>, RepositoryError> {
        Ok(self.reviews.read().await.get(&id).cloned())
    }

    async fn delete_review(&self, id: Uuid) -> Result<Option<Review>, RepositoryError> {
        Ok(self.reviews.write().await.remove(&id))
    }

    async fn find_review_for(
        &self,
        reviewable: &ReviewableRef,
    ) -> Result<Option<Review>, RepositoryError> {
        Ok(self
            .reviews
            .read()
            .await
            .values()
            .find(|r| r.reviewable == *reviewable)
            .cloned())
    }

    async fn list_reviews(&self) -> Result<Vec<Review>, RepositoryError> {
        Ok(self.reviews.read().await.values().cloned().collect())
    }
}
