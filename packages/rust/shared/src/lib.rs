//! Shared types, error model, and configuration for crmbridge.
//!
//! This crate is the foundation depended on by all other crmbridge crates.
//! It provides:
//! - [`CrmBridgeError`] — the unified error type
//! - Domain types ([`ObjectType`], [`Association`], [`CrmObjectRef`], [`Step`])
//! - Configuration ([`AppConfig`], [`ApiKey`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiKey, AppConfig, CrmConfig, ServerConfig, config_dir, config_file_path, init_config,
    load_api_key, load_config, load_config_from,
};
pub use error::{CrmBridgeError, FieldError, Result, StepFailure, ValidationFailure};
pub use types::{
    Association, AssociationCategory, AssociationSpec, AssociationTarget, AssociationType,
    CommittedObject, CrmObjectRef, ObjectType, Step, SubmissionId,
};
