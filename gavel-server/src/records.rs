//! Domain records stored by the service.
//!
//! Statuses on these records only move through the engine or the explicit
//! status-set paths in the mutation boundary; nothing else writes them.

use chrono::{DateTime, NaiveDate, Utc};
use gavel_core::{
    DocumentKind, FieldChange, ObjectKind, ObjectState, RecordKind, RelationshipCategory,
    ReviewStatus, WorkflowStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Local record of an external issue-tracker issue.
///
/// `enabled` degrades to false when the external client fails; the primary
/// mutation commits regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerLink {
    pub enabled: bool,
    pub issue_id: Option<String>,
    pub issue_url: Option<String>,
    pub component_id: Option<String>,
    pub hotlist_id: Option<String>,
    pub priority: Option<String>,
    pub severity: Option<String>,
}

impl TrackerLink {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            issue_id: None,
            issue_url: None,
            component_id: None,
            hotlist_id: None,
            priority: None,
            severity: None,
        }
    }
}

/// A multi-stage trackable record whose status the engine governs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub test_plan: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub design: String,
    #[serde(default)]
    pub operationally: String,
    /// The declared focus type: snapshots of this kind qualify for status
    /// transitions, others do not.
    pub assessment_type: ObjectKind,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub custom_attributes: BTreeMap<String, String>,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub verified_by: Option<String>,
    #[serde(default)]
    pub tracker: Option<TrackerLink>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assessment {
    pub fn new(title: impl Into<String>, assessment_type: ObjectKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            notes: String::new(),
            test_plan: String::new(),
            slug: String::new(),
            start_date: None,
            design: String::new(),
            operationally: String::new(),
            assessment_type,
            label: None,
            custom_attributes: BTreeMap::new(),
            status: WorkflowStatus::NotStarted,
            verified: false,
            verified_at: None,
            verified_by: None,
            tracker: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Scalar-field patch for an assessment. `apply` records before/after values
/// for every field it actually changes, which is what the change descriptor
/// consumes. The `status` member is not a field change; it is the explicit
/// status-set action and is handled by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssessmentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub test_plan: Option<String>,
    pub slug: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub design: Option<String>,
    pub operationally: Option<String>,
    pub assessment_type: Option<ObjectKind>,
    pub label: Option<String>,
    pub custom_attributes: Option<BTreeMap<String, String>>,
    pub status: Option<String>,
}

impl AssessmentPatch {
    /// Apply the patch, returning the field changes it caused.
    pub fn apply(self, assessment: &mut Assessment) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        apply_string(&mut changes, "title", &mut assessment.title, self.title);
        apply_string(
            &mut changes,
            "description",
            &mut assessment.description,
            self.description,
        );
        apply_string(&mut changes, "notes", &mut assessment.notes, self.notes);
        apply_string(
            &mut changes,
            "test_plan",
            &mut assessment.test_plan,
            self.test_plan,
        );
        apply_string(&mut changes, "slug", &mut assessment.slug, self.slug);
        apply_string(&mut changes, "design", &mut assessment.design, self.design);
        apply_string(
            &mut changes,
            "operationally",
            &mut assessment.operationally,
            self.operationally,
        );

        if let Some(date) = self.start_date {
            if assessment.start_date != Some(date) {
                changes.push(FieldChange::new(
                    "start_date",
                    assessment.start_date.map(|d| d.to_string()),
                    Some(date.to_string()),
                ));
                assessment.start_date = Some(date);
            }
        }

        if let Some(kind) = self.assessment_type {
            if assessment.assessment_type != kind {
                changes.push(FieldChange::new(
                    "assessment_type",
                    Some(assessment.assessment_type.to_string()),
                    Some(kind.to_string()),
                ));
                assessment.assessment_type = kind;
            }
        }

        if let Some(label) = self.label {
            if assessment.label.as_deref() != Some(label.as_str()) {
                changes.push(FieldChange::new(
                    "label",
                    assessment.label.clone(),
                    Some(label.clone()),
                ));
                assessment.label = Some(label);
            }
        }

        if let Some(values) = self.custom_attributes {
            for (name, value) in values {
                let previous = assessment.custom_attributes.get(&name).cloned();
                if previous.as_deref() != Some(value.as_str()) {
                    changes.push(FieldChange::new(
                        format!("custom:{name}"),
                        previous,
                        Some(value.clone()),
                    ));
                    assessment.custom_attributes.insert(name, value);
                }
            }
        }

        changes
    }
}

fn apply_string(
    changes: &mut Vec<FieldChange>,
    field: &'static str,
    current: &mut String,
    incoming: Option<String>,
) {
    if let Some(value) = incoming {
        if *current != value {
            changes.push(FieldChange::new(
                field,
                Some(current.clone()),
                Some(value.clone()),
            ));
            *current = value;
        }
    }
}

/// A reviewable control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub test_plan: String,
    #[serde(default)]
    pub fraud_related: bool,
    #[serde(default)]
    pub key_control: bool,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    pub status: ObjectState,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub means: Option<String>,
    #[serde(default)]
    pub verify_frequency: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Control {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            notes: String::new(),
            test_plan: String::new(),
            fraud_related: false,
            key_control: false,
            start_date: None,
            status: ObjectState::Draft,
            kind: None,
            means: None,
            verify_frequency: None,
            label: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Scalar-field patch for a control. An object-state change appears as a
/// regular `status` field change: it qualifies for review resets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub test_plan: Option<String>,
    pub fraud_related: Option<bool>,
    pub key_control: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub status: Option<ObjectState>,
    pub kind: Option<String>,
    pub means: Option<String>,
    pub verify_frequency: Option<String>,
    pub label: Option<String>,
}

impl ControlPatch {
    pub fn apply(self, control: &mut Control) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        apply_string(&mut changes, "title", &mut control.title, self.title);
        apply_string(
            &mut changes,
            "description",
            &mut control.description,
            self.description,
        );
        apply_string(&mut changes, "notes", &mut control.notes, self.notes);
        apply_string(
            &mut changes,
            "test_plan",
            &mut control.test_plan,
            self.test_plan,
        );

        if let Some(value) = self.fraud_related {
            if control.fraud_related != value {
                changes.push(FieldChange::new(
                    "fraud_related",
                    Some(control.fraud_related.to_string()),
                    Some(value.to_string()),
                ));
                control.fraud_related = value;
            }
        }
        if let Some(value) = self.key_control {
            if control.key_control != value {
                changes.push(FieldChange::new(
                    "key_control",
                    Some(control.key_control.to_string()),
                    Some(value.to_string()),
                ));
                control.key_control = value;
            }
        }
        if let Some(date) = self.start_date {
            if control.start_date != Some(date) {
                changes.push(FieldChange::new(
                    "start_date",
                    control.start_date.map(|d| d.to_string()),
                    Some(date.to_string()),
                ));
                control.start_date = Some(date);
            }
        }
        if let Some(state) = self.status {
            if control.status != state {
                changes.push(FieldChange::new(
                    "status",
                    Some(control.status.to_string()),
                    Some(state.to_string()),
                ));
                control.status = state;
            }
        }

        apply_option(&mut changes, "kind", &mut control.kind, self.kind);
        apply_option(&mut changes, "means", &mut control.means, self.means);
        apply_option(
            &mut changes,
            "verify_frequency",
            &mut control.verify_frequency,
            self.verify_frequency,
        );
        apply_option(&mut changes, "label", &mut control.label, self.label);

        changes
    }
}

fn apply_option(
    changes: &mut Vec<FieldChange>,
    field: &'static str,
    current: &mut Option<String>,
    incoming: Option<String>,
) {
    if let Some(value) = incoming {
        if current.as_deref() != Some(value.as_str()) {
            changes.push(FieldChange::new(field, current.clone(), Some(value.clone())));
            *current = Some(value);
        }
    }
}

/// A reviewable risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    pub status: ObjectState,
    #[serde(default)]
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Risk {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            notes: String::new(),
            status: ObjectState::Draft,
            label: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub status: Option<ObjectState>,
    pub label: Option<String>,
}

impl RiskPatch {
    pub fn apply(self, risk: &mut Risk) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        apply_string(&mut changes, "title", &mut risk.title, self.title);
        apply_string(
            &mut changes,
            "description",
            &mut risk.description,
            self.description,
        );
        apply_string(&mut changes, "notes", &mut risk.notes, self.notes);
        if let Some(state) = self.status {
            if risk.status != state {
                changes.push(FieldChange::new(
                    "status",
                    Some(risk.status.to_string()),
                    Some(state.to_string()),
                ));
                risk.status = state;
            }
        }
        apply_option(&mut changes, "label", &mut risk.label, self.label);
        changes
    }
}

/// The object a review record reviews: an explicit tagged union over the
/// known reviewable kinds, not a `(type, id)` string pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum ReviewableRef {
    Control(Uuid),
    Risk(Uuid),
}

impl ReviewableRef {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Control(id) | Self::Risk(id) => *id,
        }
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Control(_) => RecordKind::Control,
            Self::Risk(_) => RecordKind::Risk,
        }
    }
}

/// How the reviewer is notified about a pending review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    #[default]
    Email,
    IssueTracker,
}

/// The satellite review record attached to a reviewable object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub reviewable: ReviewableRef,
    pub status: ReviewStatus,
    pub notification_type: NotificationType,
    #[serde(default)]
    pub email_message: String,
    #[serde(default)]
    pub last_reviewed_by: Option<String>,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    #[serde(default)]
    pub issue_link: Option<TrackerLink>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn new(
        reviewable: ReviewableRef,
        notification_type: NotificationType,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            reviewable,
            status: ReviewStatus::Unreviewed,
            notification_type,
            email_message: String::new(),
            last_reviewed_by: None,
            last_reviewed_at: None,
            created_by: created_by.into(),
            issue_link: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An attached reference/evidence document, owned by an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub kind: DocumentKind,
    pub title: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A free-text comment on an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// The far side of an assessment relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelationshipTarget {
    /// A snapshot of some object, taken within an audit.
    Snapshot {
        child_kind: ObjectKind,
        child_id: Uuid,
    },
    /// A mapping to an Issue object.
    Issue { issue_id: Uuid },
    /// A person/role (assignee) mapping.
    Person { email: String, roles: Vec<String> },
}

impl RelationshipTarget {
    /// The category the rule tables consume.
    pub fn category(&self) -> RelationshipCategory {
        match self {
            Self::Snapshot { child_kind, .. } => RelationshipCategory::Snapshot {
                child_kind: *child_kind,
            },
            Self::Issue { .. } => RelationshipCategory::IssueLink,
            Self::Person { .. } => RelationshipCategory::Assignee,
        }
    }
}

/// A stored relationship between an assessment and another object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub target: RelationshipTarget,
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    pub fn new(assessment_id: Uuid, target: RelationshipTarget) -> Self {
        Self {
            id: Uuid::new_v4(),
            assessment_id,
            target,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_records_before_and_after_values() {
        let mut assessment = Assessment::new("Quarterly access review", ObjectKind::Control);
        assessment.notes = "initial".to_string();

        let patch = AssessmentPatch {
            notes: Some("revised".to_string()),
            ..Default::default()
        };
        let changes = patch.apply(&mut assessment);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "notes");
        assert_eq!(changes[0].from.as_deref(), Some("initial"));
        assert_eq!(changes[0].to.as_deref(), Some("revised"));
        assert_eq!(assessment.notes, "revised");
    }

    #[test]
    fn test_patch_skips_unchanged_values() {
        let mut assessment = Assessment::new("Quarterly access review", ObjectKind::Control);
        let patch = AssessmentPatch {
            title: Some("Quarterly access review".to_string()),
            ..Default::default()
        };
        let changes = patch.apply(&mut assessment);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_custom_attribute_changes_use_prefixed_field_names() {
        let mut assessment = Assessment::new("CA test", ObjectKind::Control);
        let patch = AssessmentPatch {
            custom_attributes: Some(BTreeMap::from([(
                "best employee".to_string(),
                "person:42".to_string(),
            )])),
            ..Default::default()
        };
        let changes = patch.apply(&mut assessment);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "custom:best employee");
        assert_eq!(changes[0].from, None);
    }

    #[test]
    fn test_control_status_change_is_a_field_change() {
        let mut control = Control::new("Segregation of duties");
        let patch = ControlPatch {
            status: Some(ObjectState::Active),
            ..Default::default()
        };
        let changes = patch.apply(&mut control);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "status");
        assert_eq!(changes[0].from.as_deref(), Some("Draft"));
        assert_eq!(changes[0].to.as_deref(), Some("Active"));
    }

    #[test]
    fn test_reviewable_ref_wire_format() {
        let reviewable = ReviewableRef::Control(Uuid::nil());
        let json = serde_json::to_value(&reviewable).unwrap();
        assert_eq!(json["type"], "Control");
        let back: ReviewableRef = serde_json::from_value(json).unwrap();
        assert_eq!(back, reviewable);
    }

    #[test]
    fn test_relationship_target_categories() {
        let snapshot = RelationshipTarget::Snapshot {
            child_kind: ObjectKind::Control,
            child_id: Uuid::new_v4(),
        };
        assert!(matches!(
            snapshot.category(),
            RelationshipCategory::Snapshot {
                child_kind: ObjectKind::Control
            }
        ));

        let person = RelationshipTarget::Person {
            email: "assessor@example.com".to_string(),
            roles: vec!["Assignees".to_string()],
        };
        assert!(matches!(person.category(), RelationshipCategory::Assignee));
    }
}
