//! Status types for trackable and reviewable records.
//!
//! Every status is one of the declared enumerated values; transitions happen
//! only through the rule engine or an explicit status-set action, which is
//! itself subject to the engine within the same persistence unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned when a wire value does not name a declared state or kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what}: {value:?}")]
pub struct ParseStateError {
    pub what: &'static str,
    pub value: String,
}

impl ParseStateError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

/// Kinds of record the status machinery knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Assessment,
    Control,
    Risk,
    Issue,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assessment => "Assessment",
            Self::Control => "Control",
            Self::Risk => "Risk",
            Self::Issue => "Issue",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ParseStateError> {
        match value {
            "Assessment" => Ok(Self::Assessment),
            "Control" => Ok(Self::Control),
            "Risk" => Ok(Self::Risk),
            "Issue" => Ok(Self::Issue),
            other => Err(ParseStateError::new("record kind", other)),
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Object kinds that can appear as snapshot children and as an assessment's
/// declared focus type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Control,
    Risk,
    Contract,
    Policy,
    Standard,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Control => "Control",
            Self::Risk => "Risk",
            Self::Contract => "Contract",
            Self::Policy => "Policy",
            Self::Standard => "Standard",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ParseStateError> {
        match value {
            "Control" => Ok(Self::Control),
            "Risk" => Ok(Self::Risk),
            "Contract" => Ok(Self::Contract),
            "Policy" => Ok(Self::Policy),
            "Standard" => Ok(Self::Standard),
            other => Err(ParseStateError::new("object kind", other)),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Workflow status for multi-stage trackable records.
///
/// `InReview` and `Completed` are done-like: any qualifying change demotes
/// the record to `InProgress`. The remaining states absorb changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "In Review")]
    InReview,
    #[serde(rename = "Rework Needed")]
    ReworkNeeded,
    Completed,
    Deprecated,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::InProgress => "In Progress",
            Self::InReview => "In Review",
            Self::ReworkNeeded => "Rework Needed",
            Self::Completed => "Completed",
            Self::Deprecated => "Deprecated",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ParseStateError> {
        match value {
            "Not Started" => Ok(Self::NotStarted),
            "In Progress" => Ok(Self::InProgress),
            "In Review" => Ok(Self::InReview),
            "Rework Needed" => Ok(Self::ReworkNeeded),
            "Completed" => Ok(Self::Completed),
            "Deprecated" => Ok(Self::Deprecated),
            other => Err(ParseStateError::new("workflow status", other)),
        }
    }

    /// Returns true for states a qualifying change demotes to `InProgress`.
    pub fn is_done_like(&self) -> bool {
        matches!(self, Self::InReview | Self::Completed)
    }
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An explicit status-set value as supplied on the wire.
///
/// `Verified` is accepted as input but is not a resting state: setting it
/// lands the record in `Completed` with verification stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplicitStatus {
    Status(WorkflowStatus),
    Verified,
}

impl ExplicitStatus {
    pub fn parse(value: &str) -> Result<Self, ParseStateError> {
        if value == "Verified" {
            return Ok(Self::Verified);
        }
        WorkflowStatus::parse(value).map(Self::Status)
    }
}

impl fmt::Display for ExplicitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(s) => write!(f, "{}", s),
            Self::Verified => write!(f, "Verified"),
        }
    }
}

/// Status of a review record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReviewStatus {
    #[default]
    Unreviewed,
    Reviewed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreviewed => "Unreviewed",
            Self::Reviewed => "Reviewed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ParseStateError> {
        match value {
            "Unreviewed" => Ok(Self::Unreviewed),
            "Reviewed" => Ok(Self::Reviewed),
            other => Err(ParseStateError::new("review status", other)),
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Object state for reviewable records (controls, risks). Not governed by
/// the workflow engine; changing it is still a qualifying change for the
/// attached review record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ObjectState {
    #[default]
    Draft,
    Active,
    Deprecated,
}

impl ObjectState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Active => "Active",
            Self::Deprecated => "Deprecated",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ParseStateError> {
        match value {
            "Draft" => Ok(Self::Draft),
            "Active" => Ok(Self::Active),
            "Deprecated" => Ok(Self::Deprecated),
            other => Err(ParseStateError::new("object state", other)),
        }
    }
}

impl fmt::Display for ObjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subtype of an attached reference/evidence document.
///
/// All subtypes qualify for status purposes; the distinction only matters to
/// the REST representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    #[serde(rename = "EVIDENCE")]
    Evidence,
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "REFERENCE_URL")]
    ReferenceUrl,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evidence => "EVIDENCE",
            Self::Url => "URL",
            Self::ReferenceUrl => "REFERENCE_URL",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ParseStateError> {
        match value {
            "EVIDENCE" => Ok(Self::Evidence),
            "URL" => Ok(Self::Url),
            "REFERENCE_URL" => Ok(Self::ReferenceUrl),
            other => Err(ParseStateError::new("document kind", other)),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
