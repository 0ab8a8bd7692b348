//! The per-flush change descriptor.
//!
//! A descriptor is built once per persistence unit (one mutation, one import
//! row) by the transaction boundary, handed to the engine, and discarded
//! after the decision is applied. It never outlives one unit.

use uuid::Uuid;

use super::state::{DocumentKind, ExplicitStatus, ObjectKind};

/// The identity performing the mutation, used for verification and review
/// stamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
}

impl Actor {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// A scalar field edit with before/after values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl FieldChange {
    pub fn new(
        field: impl Into<String>,
        from: Option<String>,
        to: Option<String>,
    ) -> Self {
        Self {
            field: field.into(),
            from,
            to,
        }
    }
}

/// Category of a relationship being mapped or unmapped.
///
/// The category, not the concrete related object, is what the rule tables
/// consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipCategory {
    /// An attached reference/evidence document of any subtype.
    Document(DocumentKind),
    /// A free-text comment.
    Comment,
    /// A mapped snapshot whose underlying object is of `child_kind`.
    Snapshot { child_kind: ObjectKind },
    /// A mapping to an Issue object.
    IssueLink,
    /// A person/role (assignee) mapping.
    Assignee,
    /// Custom access-role definition bookkeeping.
    CustomRoleDefinition,
}

/// Normalized summary of everything that changed on one record in one
/// persistence unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDescriptor {
    pub changed_fields: Vec<FieldChange>,
    pub added_relationships: Vec<RelationshipCategory>,
    pub removed_relationships: Vec<RelationshipCategory>,
    /// Status value explicitly supplied in the same unit, if any.
    pub explicit_status: Option<ExplicitStatus>,
    pub is_bulk_import: bool,
    /// The record's declared focus type, for the snapshot matching rule.
    pub focus_kind: Option<ObjectKind>,
    pub actor: Actor,
}

impl ChangeDescriptor {
    pub fn new(actor: Actor) -> Self {
        Self {
            changed_fields: Vec::new(),
            added_relationships: Vec::new(),
            removed_relationships: Vec::new(),
            explicit_status: None,
            is_bulk_import: false,
            focus_kind: None,
            actor,
        }
    }

    pub fn with_field(
        mut self,
        field: impl Into<String>,
        from: Option<String>,
        to: Option<String>,
    ) -> Self {
        self.changed_fields.push(FieldChange::new(field, from, to));
        self
    }

    pub fn with_added(mut self, category: RelationshipCategory) -> Self {
        self.added_relationships.push(category);
        self
    }

    pub fn with_removed(mut self, category: RelationshipCategory) -> Self {
        self.removed_relationships.push(category);
        self
    }

    pub fn with_explicit_status(mut self, status: ExplicitStatus) -> Self {
        self.explicit_status = Some(status);
        self
    }

    pub fn with_focus(mut self, kind: ObjectKind) -> Self {
        self.focus_kind = Some(kind);
        self
    }

    pub fn bulk_import(mut self) -> Self {
        self.is_bulk_import = true;
        self
    }

    /// True when the unit carries no edits at all (an explicit status-set
    /// alone still counts as a mutation, but not as a change).
    pub fn is_empty(&self) -> bool {
        self.changed_fields.is_empty()
            && self.added_relationships.is_empty()
            && self.removed_relationships.is_empty()
    }

    /// All relationship categories touched in this unit, added or removed.
    /// Mapping and unmapping are symmetric for rule purposes.
    pub fn touched_relationships(&self) -> impl Iterator<Item = &RelationshipCategory> {
        self.added_relationships
            .iter()
            .chain(self.removed_relationships.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::state::WorkflowStatus;

    fn actor() -> Actor {
        Actor::new(Uuid::new_v4(), "auditor@example.com")
    }

    #[test]
    fn test_empty_descriptor() {
        let d = ChangeDescriptor::new(actor());
        assert!(d.is_empty());

        let d = d.with_explicit_status(ExplicitStatus::Status(WorkflowStatus::Completed));
        // An explicit status-set alone is not a change.
        assert!(d.is_empty());
    }

    #[test]
    fn test_touched_relationships_covers_both_directions() {
        let d = ChangeDescriptor::new(actor())
            .with_added(RelationshipCategory::Comment)
            .with_removed(RelationshipCategory::Document(DocumentKind::Evidence));
        let touched: Vec<_> = d.touched_relationships().collect();
        assert_eq!(touched.len(), 2);
        assert!(!d.is_empty());
    }
}
