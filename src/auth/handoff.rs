//! GitHub login handoff
//!
//! Two phases, with no local state in between:
//!
//! 1. [`HandoffController::initiate`] names the backend endpoint that starts
//!    the GitHub authorization flow. The host navigates there; the process may
//!    be torn down while the user is at GitHub.
//! 2. [`HandoffController::complete`] is the single entry point for the
//!    return route. It consumes the identity and credential delivered by the
//!    backend and writes them to the session store.
//!
//! The provider secret exchange happens on the backend; no token exchange is
//! performed here.

use serde::Deserialize;
use std::sync::{Arc, Mutex};
use url::Url;

use super::session::{Credential, Identity};
use super::store::SessionStore;
use crate::backend::dto::BackendUser;
use crate::config::BackendConfig;
use crate::error::AppError;
use crate::metrics::HANDOFF_TOTAL;

/// Backend endpoint that starts the GitHub OAuth flow
pub const LOGIN_PATH: &str = "/api/auth/github";

/// Where the return route sends the user afterwards
pub const DEFAULT_VIEW: &str = "/";

/// A navigation the host must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Full-page navigation away from the application
    External(Url),
    /// Navigation to a view of the application
    Internal(String),
}

impl Navigation {
    pub fn location(&self) -> &str {
        match self {
            Navigation::External(url) => url.as_str(),
            Navigation::Internal(path) => path,
        }
    }
}

/// Data delivered to the return route
///
/// Accepted transports: query string, URL fragment, or the backend's JSON
/// callback body (`{"user": {...}, "token": "..."}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReturnPayload {
    pub token: Option<String>,
    pub id: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Backend JSON callback body
#[derive(Debug, Deserialize)]
struct CallbackBody {
    user: Option<BackendUser>,
    token: Option<String>,
    error: Option<String>,
}

impl ReturnPayload {
    /// Parse an `application/x-www-form-urlencoded` string
    pub fn from_query(query: &str) -> Self {
        let mut payload = Self::default();
        let query = query.trim_start_matches(['?', '#']);
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "token" => payload.token = value,
                "id" => payload.id = value,
                "username" => payload.username = value,
                "avatar_url" => payload.avatar_url = value,
                "error" => payload.error = value,
                "error_description" => payload.error_description = value,
                _ => {}
            }
        }
        payload
    }

    /// Read the payload from the return URL, query first, then fragment
    ///
    /// For embedders that own the browser URL. Fragments never reach the
    /// shell's `/auth/callback` route, which reads only the query.
    pub fn from_url(url: &Url) -> Self {
        let from_query = url.query().map(Self::from_query).unwrap_or_default();
        if from_query.token.is_some() || from_query.error.is_some() {
            return from_query;
        }

        match url.fragment() {
            Some(fragment) => Self::from_query(fragment),
            None => from_query,
        }
    }

    /// Parse the backend's JSON callback body
    ///
    /// # Errors
    /// `AppError::AuthenticationDenied` if the body is not JSON of the
    /// expected shape.
    pub fn from_json(body: &str) -> Result<Self, AppError> {
        let body: CallbackBody = serde_json::from_str(body).map_err(|e| {
            AppError::AuthenticationDenied(format!("unreadable callback body: {e}"))
        })?;

        let (id, username, avatar_url) = match body.user {
            Some(user) => (Some(user.id), Some(user.username), Some(user.avatar_url)),
            None => (None, None, None),
        };

        Ok(Self {
            token: body.token,
            id,
            username,
            avatar_url,
            error: body.error,
            error_description: None,
        })
    }

    /// Reason the provider or backend declined, if it did
    pub fn denial(&self) -> Option<String> {
        self.error.as_ref().map(|error| match &self.error_description {
            Some(description) => format!("{error}: {description}"),
            None => error.clone(),
        })
    }

    /// Split into the two halves of a session
    ///
    /// The identity is `None` unless both id and username are present.
    pub fn into_parts(self) -> (Option<Identity>, Option<String>) {
        let identity = match (self.id, self.username) {
            (Some(id), Some(username)) => Some(Identity {
                id,
                username,
                avatar_url: self.avatar_url.unwrap_or_default(),
            }),
            _ => None,
        };
        (identity, self.token)
    }
}

/// Drives the login round trip
pub struct HandoffController {
    login_url: Url,
    store: Arc<SessionStore>,
    /// Fingerprint of the last credential consumed by `complete`
    consumed: Mutex<Option<String>>,
}

impl HandoffController {
    /// # Errors
    /// `AppError::Config` if the backend URL is invalid
    pub fn new(backend: &BackendConfig, store: Arc<SessionStore>) -> Result<Self, AppError> {
        Ok(Self {
            login_url: backend.endpoint(LOGIN_PATH)?,
            store,
            consumed: Mutex::new(None),
        })
    }

    /// Start the login
    ///
    /// Never touches the session store; the only later state change comes
    /// from [`HandoffController::complete`].
    pub fn initiate(&self) -> Navigation {
        HANDOFF_TOTAL
            .with_label_values(&["initiate", "redirect"])
            .inc();
        tracing::info!(login_url = %self.login_url, "Starting GitHub login");
        Navigation::External(self.login_url.clone())
    }

    /// Finish the login from the return route
    ///
    /// On any failure the store is left as it was (empty during a login).
    ///
    /// # Errors
    /// - `AuthenticationDenied` when the provider declined or the payload
    ///   lacks an identity or a credential
    /// - `HandoffReplayed` when this credential was already consumed
    pub fn complete(&self, payload: ReturnPayload) -> Result<Identity, AppError> {
        let result = self.try_complete(payload);

        let outcome = match &result {
            Ok(_) => "authenticated",
            Err(AppError::HandoffReplayed) => "replayed",
            Err(_) => "denied",
        };
        HANDOFF_TOTAL
            .with_label_values(&["complete", outcome])
            .inc();

        match &result {
            Ok(identity) => {
                tracing::info!(username = %identity.username, "GitHub login completed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "GitHub login not completed");
            }
        }

        result
    }

    fn try_complete(&self, payload: ReturnPayload) -> Result<Identity, AppError> {
        if let Some(reason) = payload.denial() {
            return Err(AppError::AuthenticationDenied(reason));
        }

        let (identity, token) = payload.into_parts();
        let identity = identity.ok_or_else(|| {
            AppError::AuthenticationDenied("return payload has no identity".to_string())
        })?;
        let token = token.ok_or_else(|| {
            AppError::AuthenticationDenied("return payload has no credential".to_string())
        })?;

        let credential = Credential::parse(token)
            .map_err(|e| AppError::AuthenticationDenied(e.to_string()))?;
        let fingerprint = credential.fingerprint();

        let mut consumed = match self.consumed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if consumed.as_deref() == Some(fingerprint.as_str()) {
            return Err(AppError::HandoffReplayed);
        }

        self.store
            .set_session(Some(identity.clone()), Some(credential.expose().to_string()))
            .map_err(|e| AppError::AuthenticationDenied(e.to_string()))?;
        *consumed = Some(fingerprint);

        Ok(identity)
    }

    /// Where the host goes once the return route is done
    pub fn default_view(&self) -> Navigation {
        Navigation::Internal(DEFAULT_VIEW.to_string())
    }
}
