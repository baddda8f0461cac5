//! RelayForge Web - session and authorization core of the RelayForge client
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Host Shell (Axum)                         │
//! │  - Login / return route / logout                            │
//! │  - Navigation and workflow view models                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Session Layer                            │
//! │  - Session store (single source of truth, observable)       │
//! │  - Auth gate and login handoff                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Orchestration API client                    │
//! │  - Bearer credential on protected requests                  │
//! │  - 401/403 clears the session                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers of the host shell
//! - `auth`: Session store, auth gate, login handoff
//! - `backend`: Orchestration API client
//! - `views`: Navigation and workflow view models
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod metrics;
pub mod views;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// One process hosts exactly one session: every handler sees the same
/// store, and the API client and handoff controller are bound to it.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// The session store
    pub session: Arc<auth::SessionStore>,

    /// Login handoff controller
    pub handoff: Arc<auth::HandoffController>,

    /// Orchestration API client
    pub api: Arc<backend::ApiClient>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Create the session store (with persistence if configured)
    /// 2. Restore a persisted session, if any
    /// 3. Create the API client and the handoff controller
    /// 4. Verify a restored session against the backend
    ///
    /// # Errors
    /// Returns error if the backend configuration is invalid
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let session = Arc::new(auth::SessionStore::from_config(&config.session));
        let restored = session.rehydrate();

        let api = Arc::new(backend::ApiClient::new(&config.backend, session.clone())?);
        let handoff = Arc::new(auth::HandoffController::new(
            &config.backend,
            session.clone(),
        )?);

        if restored && !api.verify_session().await {
            tracing::info!("Starting unauthenticated");
        }

        tracing::info!(
            authenticated = auth::is_authenticated(&session.read()),
            backend = %config.backend.base_url,
            "Application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            session,
            handoff,
            api,
        })
    }
}

/// Build the Axum router with all routes
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .merge(api::pages_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
