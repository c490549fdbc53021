//! Submission handling and CRM orchestration for crmbridge.
//!
//! This crate ties validation and the CRM client together into the
//! end-to-end request flow (see [`bridge::Bridge::handle`]).

pub mod bridge;
pub mod orchestrator;

pub use bridge::{Bridge, BridgeResponse};
pub use orchestrator::{OrchestrationReport, Orchestrator};
