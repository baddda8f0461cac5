//! Error types for RelayForge Web
//!
//! Every fallible operation of the session core returns `AppError`.
//! The host shell converts it into an HTTP response through `IntoResponse`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// `set_session` called with a missing or empty field
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// A protected action was attempted without a session
    #[error("Authentication required")]
    NotAuthenticated,

    /// The provider or backend declined the login
    #[error("Authentication denied: {0}")]
    AuthenticationDenied(String),

    /// The return route was invoked again with an already consumed payload
    #[error("Login handoff already completed")]
    HandoffReplayed,

    /// The backend rejected the credential (401/403)
    #[error("Credential expired or revoked")]
    CredentialExpired,

    /// The backend could not be reached
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with an unexpected status
    #[error("Unexpected backend status: {0}")]
    UnexpectedStatus(u16),

    /// Durable session storage failed
    #[error("Session persistence error: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Short machine-readable label, used for metrics and JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidSession(_) => "invalid_session",
            AppError::NotAuthenticated => "not_authenticated",
            AppError::AuthenticationDenied(_) => "authentication_denied",
            AppError::HandoffReplayed => "handoff_replayed",
            AppError::CredentialExpired => "credential_expired",
            AppError::Transport(_) => "transport",
            AppError::UnexpectedStatus(_) => "unexpected_status",
            AppError::Persistence(_) => "persistence",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    /// True when the error means the current credential can no longer be used.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AppError::NotAuthenticated
                | AppError::CredentialExpired
                | AppError::AuthenticationDenied(_)
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Maps each variant to a status code and a JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let status = match &self {
            AppError::InvalidSession(_) => StatusCode::BAD_REQUEST,
            AppError::NotAuthenticated
            | AppError::CredentialExpired
            | AppError::AuthenticationDenied(_) => StatusCode::UNAUTHORIZED,
            AppError::HandoffReplayed => StatusCode::CONFLICT,
            AppError::Transport(_) | AppError::UnexpectedStatus(_) => StatusCode::BAD_GATEWAY,
            AppError::Persistence(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            AppError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        };

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.kind()]).inc();

        let body = Json(serde_json::json!({
            "error": message,
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
