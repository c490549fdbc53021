//! Error types for crmbridge.
//!
//! Library crates use [`CrmBridgeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::{CommittedObject, ObjectType, Step};

/// Top-level error type for all crmbridge operations.
#[derive(Debug, thiserror::Error)]
pub enum CrmBridgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The inbound submission failed schema checks. No side effects happened.
    #[error("invalid submission: {0}")]
    Validation(ValidationFailure),

    /// The CRM answered a create call with a non-success status.
    #[error("CRM request to {object_type} failed with status {status}")]
    CrmRequest {
        object_type: ObjectType,
        status: u16,
        body: String,
    },

    /// One orchestration step failed; earlier steps stay committed.
    #[error("{0}")]
    Step(StepFailure),

    /// Transport-level HTTP error.
    #[error("network error: {0}")]
    Network(String),

    /// The CRM answered with a body we could not interpret.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Anything that does not fit the categories above (e.g. malformed JSON).
    #[error("{0}")]
    Unexpected(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CrmBridgeError>;

impl CrmBridgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Tag an error with the step it happened in.
    pub fn at_step(self, step: Step, committed: Vec<CommittedObject>) -> Self {
        Self::Step(StepFailure {
            step,
            committed,
            source: Box::new(self),
        })
    }

    /// HTTP status this error maps to at the endpoint.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            _ => 500,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation failures
// ---------------------------------------------------------------------------

/// A single invalid field of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Wire name of the field (e.g. `Org POC Email`, `Org POC Name.first`).
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field error found in one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

impl ValidationFailure {
    /// Whether `field` is among the invalid fields.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Step failures
// ---------------------------------------------------------------------------

/// Failure of one orchestration step.
///
/// `committed` holds the objects created by the steps before `step`. They are
/// not rolled back.
#[derive(Debug)]
pub struct StepFailure {
    pub step: Step,
    pub committed: Vec<CommittedObject>,
    pub source: Box<CrmBridgeError>,
}

impl std::fmt::Display for StepFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to create {}: {}", self.step, self.source)
    }
}

impl StepFailure {
    /// Upstream status code, when the step failed on a CRM response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self.source.as_ref() {
            CrmBridgeError::CrmRequest { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CrmObjectRef;

    #[test]
    fn error_display_formatting() {
        let err = CrmBridgeError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = CrmBridgeError::CrmRequest {
            object_type: ObjectType::Deals,
            status: 409,
            body: "{}".into(),
        };
        assert_eq!(
            err.to_string(),
            "CRM request to deals failed with status 409"
        );
    }

    #[test]
    fn validation_failure_lists_fields() {
        let err = CrmBridgeError::Validation(ValidationFailure {
            errors: vec![
                FieldError::new("Company ID", "must be a positive integer"),
                FieldError::new("Org POC Email", "must be a valid email address"),
            ],
        });
        assert_eq!(
            err.to_string(),
            "invalid submission: Company ID: must be a positive integer; \
             Org POC Email: must be a valid email address"
        );
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn step_failure_names_the_step() {
        let committed = vec![CommittedObject {
            step: Step::ParentCompany,
            object: CrmObjectRef {
                id: "1".into(),
                properties: Default::default(),
                created_at: None,
            },
        }];
        let err = CrmBridgeError::CrmRequest {
            object_type: ObjectType::Companies,
            status: 409,
            body: "conflict".into(),
        }
        .at_step(Step::ChildOrganization, committed);

        assert_eq!(
            err.to_string(),
            "failed to create child organization: CRM request to companies failed with status 409"
        );
        assert_eq!(err.status_code(), 500);
        match err {
            CrmBridgeError::Step(failure) => {
                assert_eq!(failure.upstream_status(), Some(409));
                assert_eq!(failure.committed.len(), 1);
            }
            other => panic!("expected step failure, got {other:?}"),
        }
    }
}
