//! Login, return and logout routes
//!
//! The host side of the GitHub handoff. These handlers only translate HTTP
//! into calls on the handoff controller and the session store.

use axum::{
    Router,
    extract::{RawQuery, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};

use super::handoff::ReturnPayload;
use crate::AppState;

/// Create authentication router
///
/// Routes:
/// - GET /login - Redirect to the backend's GitHub login
/// - GET /auth/callback - Return route (query string)
/// - POST /auth/callback - Return route (backend JSON body)
/// - POST /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/auth/callback", get(callback_query).post(callback_body))
        .route("/logout", post(logout))
}

// =============================================================================
// Login
// =============================================================================

/// GET /login
///
/// Full-page navigation to `{backend}/api/auth/github`.
async fn login(State(state): State<AppState>) -> impl IntoResponse {
    let navigation = state.handoff.initiate();
    Redirect::to(navigation.location())
}

// =============================================================================
// Return route
// =============================================================================

/// GET /auth/callback
///
/// Completes the handoff from query parameters, then redirects to the
/// default view. A failed login lands on the same view, unauthenticated.
async fn callback_query(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let payload = query
        .as_deref()
        .map(ReturnPayload::from_query)
        .unwrap_or_default();
    finish(&state, payload)
}

/// POST /auth/callback
///
/// Same as the GET variant, for the backend's JSON callback body.
async fn callback_body(State(state): State<AppState>, body: String) -> impl IntoResponse {
    match ReturnPayload::from_json(&body) {
        Ok(payload) => finish(&state, payload),
        Err(e) => {
            tracing::warn!(error = %e, "Rejected callback body");
            Redirect::to(state.handoff.default_view().location())
        }
    }
}

fn finish(state: &AppState, payload: ReturnPayload) -> Redirect {
    // Failures are logged by the controller and surface as the
    // unauthenticated default view.
    let _ = state.handoff.complete(payload);
    Redirect::to(state.handoff.default_view().location())
}

// =============================================================================
// Logout
// =============================================================================

/// POST /logout
///
/// Clears the session and redirects to the default view.
async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    state.api.logout().await;
    Redirect::to(state.handoff.default_view().location())
}
