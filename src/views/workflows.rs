//! Workflow list page

use serde::Serialize;

use crate::auth::{Session, gate};
use crate::backend::{ApiClient, WorkflowSummary};
use crate::error::AppError;

/// View model of the workflow list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowsView {
    /// No session; shown instead of fetching
    PleaseAuthenticate { message: String, login_href: String },
    /// Fetch in flight
    Loading,
    /// Signed in, nothing to show
    Empty,
    Loaded { workflows: Vec<WorkflowSummary> },
    /// The backend could not be reached or failed; the session is intact
    Unavailable { message: String, retryable: bool },
}

impl WorkflowsView {
    /// What the page shows on mount, before any fetch completes
    pub fn initial(session: &Session) -> Self {
        if gate::is_authenticated(session) {
            WorkflowsView::Loading
        } else {
            Self::please_authenticate()
        }
    }

    /// Consult the gate, fetch if it is open, and map the outcome
    pub async fn load(api: &ApiClient) -> Self {
        if !gate::is_authenticated(&api.store().read()) {
            return Self::please_authenticate();
        }

        Self::from_result(api.list_workflows().await)
    }

    pub fn from_result(result: Result<Vec<WorkflowSummary>, AppError>) -> Self {
        match result {
            Ok(workflows) if workflows.is_empty() => WorkflowsView::Empty,
            Ok(workflows) => WorkflowsView::Loaded { workflows },
            Err(e) if e.is_auth_failure() => Self::please_authenticate(),
            Err(AppError::Transport(_)) => WorkflowsView::Unavailable {
                message: "Could not reach the RelayForge API".to_string(),
                retryable: true,
            },
            Err(AppError::UnexpectedStatus(status)) => WorkflowsView::Unavailable {
                message: format!("The RelayForge API answered with status {status}"),
                retryable: status >= 500,
            },
            Err(e) => WorkflowsView::Unavailable {
                message: e.to_string(),
                retryable: false,
            },
        }
    }

    fn please_authenticate() -> Self {
        WorkflowsView::PleaseAuthenticate {
            message: "Please login to manage workflows".to_string(),
            login_href: "/login".to_string(),
        }
    }
}
