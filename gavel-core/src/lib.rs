//! Pure domain logic for the gavel GRC service.
//!
//! This crate contains no I/O. The status engine, rule tables and review
//! machine are deterministic functions over plain data; the server crate
//! owns persistence, HTTP and external integrations.

pub mod status;

pub use status::change::{Actor, ChangeDescriptor, FieldChange, RelationshipCategory};
pub use status::engine::{StatusDecision, StatusEngine};
pub use status::observer::{AssessmentObserver, NormalizedStatus, StatusObserver};
pub use status::review::{decide_review, ReviewDecision, ReviewEvent};
pub use status::rules::RuleSet;
pub use status::state::{
    DocumentKind, ExplicitStatus, ObjectKind, ObjectState, ParseStateError, RecordKind,
    ReviewStatus, WorkflowStatus,
};
