//! Page endpoints
//!
//! Each page answers with the view model of its dependent view, computed
//! from the session at request time.

use axum::{Json, Router, extract::State, routing::get};

use crate::AppState;
use crate::auth::SessionSummary;
use crate::views::{NavigationModel, WorkflowsView};

/// Create page router
///
/// Routes:
/// - GET / - Navigation chrome
/// - GET /workflows - Workflow list
/// - GET /session - Who is signed in (never the credential)
pub fn pages_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/workflows", get(workflows))
        .route("/session", get(session))
}

/// GET /
async fn home(State(state): State<AppState>) -> Json<NavigationModel> {
    Json(NavigationModel::from_session(&state.session.read()))
}

/// GET /workflows
async fn workflows(State(state): State<AppState>) -> Json<WorkflowsView> {
    Json(WorkflowsView::load(&state.api).await)
}

/// GET /session
async fn session(State(state): State<AppState>) -> Json<SessionSummary> {
    Json(state.session.read().summary())
}
