//! Authoritative rule tables: which changes qualify for a status transition.
//!
//! Membership is enumerated here, per record kind, rather than scattered
//! across record types. A change is qualifying when it is not on the
//! ignore-list; only qualifying changes can move a status.

use super::change::{ChangeDescriptor, RelationshipCategory};
use super::state::ObjectKind;

/// The ignore-list and relationship policy for one record kind.
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    /// Scalar fields that never trigger a transition.
    pub ignored_fields: &'static [&'static str],
    /// Snapshot mappings qualify only when the snapshot's child kind equals
    /// the record's declared focus type.
    pub snapshots_match_focus: bool,
    /// Whether mapping/unmapping an Issue object qualifies.
    pub issue_links_qualify: bool,
}

/// Rules for the assessment workflow: `label` is the ignored scalar;
/// assignee, custom-role and issue-link relationship edits never qualify;
/// documents and comments always do; snapshots only of the focus type.
pub const ASSESSMENT_RULES: RuleSet = RuleSet {
    ignored_fields: &["label"],
    snapshots_match_focus: true,
    issue_links_qualify: false,
};

/// Rules for review-record resets, scoped to the reviewed object. The net is
/// wider than the workflow net: any scalar edit except `label` qualifies
/// (including an object-state change), and any mapping except assignee/role
/// bookkeeping qualifies.
pub const REVIEW_RULES: RuleSet = RuleSet {
    ignored_fields: &["label"],
    snapshots_match_focus: false,
    issue_links_qualify: true,
};

impl RuleSet {
    /// Whether a scalar field edit qualifies.
    pub fn field_qualifies(&self, field: &str) -> bool {
        !self.ignored_fields.contains(&field)
    }

    /// Whether mapping or unmapping a relationship of this category
    /// qualifies. `focus` is the record's declared focus type, if it has one.
    pub fn category_qualifies(
        &self,
        category: &RelationshipCategory,
        focus: Option<ObjectKind>,
    ) -> bool {
        match category {
            RelationshipCategory::Document(_) => true,
            RelationshipCategory::Comment => true,
            RelationshipCategory::Snapshot { child_kind } => {
                if self.snapshots_match_focus {
                    focus == Some(*child_kind)
                } else {
                    true
                }
            }
            RelationshipCategory::IssueLink => self.issue_links_qualify,
            RelationshipCategory::Assignee => false,
            RelationshipCategory::CustomRoleDefinition => false,
        }
    }

    /// Whether the descriptor contains at least one qualifying change.
    pub fn has_qualifying_change(&self, descriptor: &ChangeDescriptor) -> bool {
        if descriptor
            .changed_fields
            .iter()
            .any(|change| self.field_qualifies(&change.field))
        {
            return true;
        }
        descriptor
            .touched_relationships()
            .any(|category| self.category_qualifies(category, descriptor.focus_kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::change::Actor;
    use crate::status::state::DocumentKind;
    use uuid::Uuid;

    fn descriptor() -> ChangeDescriptor {
        ChangeDescriptor::new(Actor::new(Uuid::new_v4(), "auditor@example.com"))
    }

    #[test]
    fn test_label_is_ignored() {
        assert!(!ASSESSMENT_RULES.field_qualifies("label"));
        assert!(ASSESSMENT_RULES.field_qualifies("title"));
        assert!(ASSESSMENT_RULES.field_qualifies("test_plan"));
        assert!(ASSESSMENT_RULES.field_qualifies("custom:best employee"));
    }

    #[test]
    fn test_documents_always_qualify() {
        for kind in [
            DocumentKind::Evidence,
            DocumentKind::Url,
            DocumentKind::ReferenceUrl,
        ] {
            assert!(ASSESSMENT_RULES
                .category_qualifies(&RelationshipCategory::Document(kind), None));
        }
    }

    #[test]
    fn test_snapshot_matches_focus_type_only() {
        let matching = RelationshipCategory::Snapshot {
            child_kind: ObjectKind::Control,
        };
        let other = RelationshipCategory::Snapshot {
            child_kind: ObjectKind::Contract,
        };
        assert!(ASSESSMENT_RULES.category_qualifies(&matching, Some(ObjectKind::Control)));
        assert!(!ASSESSMENT_RULES.category_qualifies(&other, Some(ObjectKind::Control)));
        // No declared focus type: no snapshot qualifies.
        assert!(!ASSESSMENT_RULES.category_qualifies(&matching, None));
    }

    #[test]
    fn test_assignee_and_role_edits_never_qualify() {
        for rules in [ASSESSMENT_RULES, REVIEW_RULES] {
            assert!(!rules.category_qualifies(&RelationshipCategory::Assignee, None));
            assert!(
                !rules.category_qualifies(&RelationshipCategory::CustomRoleDefinition, None)
            );
        }
    }

    #[test]
    fn test_issue_links_qualify_only_for_reviews() {
        assert!(!ASSESSMENT_RULES.category_qualifies(&RelationshipCategory::IssueLink, None));
        assert!(REVIEW_RULES.category_qualifies(&RelationshipCategory::IssueLink, None));
    }

    #[test]
    fn test_review_rules_catch_object_state_changes() {
        let d = descriptor().with_field("status", Some("Draft".into()), Some("Active".into()));
        assert!(REVIEW_RULES.has_qualifying_change(&d));
    }

    #[test]
    fn test_ignored_only_descriptor_has_no_qualifying_change() {
        let d = descriptor()
            .with_field("label", None, Some("Followup".into()))
            .with_added(RelationshipCategory::Assignee);
        assert!(!ASSESSMENT_RULES.has_qualifying_change(&d));
        assert!(!REVIEW_RULES.has_qualifying_change(&d));
    }
}
