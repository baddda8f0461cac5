//! Orchestration API boundary
//!
//! Outbound HTTP to the RelayForge backend. Workflow storage and execution
//! live there; this module only fetches on behalf of dependent views.

mod client;
pub mod dto;

pub use client::{ApiClient, CURRENT_USER_PATH, WORKFLOWS_PATH};
pub use dto::WorkflowSummary;
