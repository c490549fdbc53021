//! Core domain types shared by the validator, the CRM client and the orchestrator.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SubmissionId
// ---------------------------------------------------------------------------

/// A UUID v7 minted for every inbound submission (time-sortable).
///
/// Only used to correlate log lines of one request. It is never sent to the
/// CRM, so it does not deduplicate anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    /// Generate a new time-sortable submission identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SubmissionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ObjectType
// ---------------------------------------------------------------------------

/// CRM object collections this service creates records in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Companies,
    Contacts,
    Deals,
}

impl ObjectType {
    /// Path segment under the object API base URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Companies => "companies",
            Self::Contacts => "contacts",
            Self::Deals => "deals",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Associations
// ---------------------------------------------------------------------------

/// Who defined an association type in the CRM schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssociationCategory {
    HubspotDefined,
}

/// The built-in association types used when wiring objects to the parent company.
///
/// The numeric ids belong to the CRM's schema and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationType {
    CompanyToCompany,
    ContactToCompany,
    DealToCompany,
}

impl AssociationType {
    pub fn type_id(&self) -> u32 {
        match self {
            Self::CompanyToCompany => 14,
            Self::ContactToCompany => 1,
            Self::DealToCompany => 5,
        }
    }

    pub fn category(&self) -> AssociationCategory {
        AssociationCategory::HubspotDefined
    }
}

/// Target side of an association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationTarget {
    pub id: String,
}

/// One typed relation inside an association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationSpec {
    pub association_category: AssociationCategory,
    pub association_type_id: u32,
}

/// A directed link from a newly created object to an existing one, in the
/// shape the object-create endpoint expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub to: AssociationTarget,
    pub types: Vec<AssociationSpec>,
}

impl Association {
    /// Link to `target_id` with a single association type.
    pub fn to(target_id: impl Into<String>, kind: AssociationType) -> Self {
        Self {
            to: AssociationTarget {
                id: target_id.into(),
            },
            types: vec![AssociationSpec {
                association_category: kind.category(),
                association_type_id: kind.type_id(),
            }],
        }
    }

    /// Id of the object this association points at.
    pub fn target_id(&self) -> &str {
        &self.to.id
    }
}

// ---------------------------------------------------------------------------
// CrmObjectRef
// ---------------------------------------------------------------------------

/// Reference to an object the CRM just created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmObjectRef {
    /// Opaque identifier assigned by the CRM.
    pub id: String,
    /// Properties echoed back by the CRM.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// The four orchestration steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ParentCompany,
    ChildOrganization,
    Contact,
    Deal,
}

impl Step {
    /// All steps in the order they run.
    pub const ALL: [Step; 4] = [
        Step::ParentCompany,
        Step::ChildOrganization,
        Step::Contact,
        Step::Deal,
    ];

    /// Human label used in logs and response bodies.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ParentCompany => "parent company",
            Self::ChildOrganization => "child organization",
            Self::Contact => "contact",
            Self::Deal => "deal",
        }
    }

    /// Object collection this step creates a record in.
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::ParentCompany | Self::ChildOrganization => ObjectType::Companies,
            Self::Contact => ObjectType::Contacts,
            Self::Deal => ObjectType::Deals,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// An object created by a completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedObject {
    pub step: Step,
    pub object: CrmObjectRef,
}
