//! Orchestration API client
//!
//! All protected requests go through the dependent-view gate:
//! - no credential, no request (`NotAuthenticated`)
//! - 401/403 revokes the credential that was sent (`CredentialExpired`)
//! - transport failures never touch the session (`Transport`)

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};

use super::dto::{CurrentUserResponse, WorkflowListResponse, WorkflowSummary};
use crate::auth::{Credential, Identity, SessionStore, gate};
use crate::config::BackendConfig;
use crate::error::AppError;
use crate::metrics::{BACKEND_REQUEST_DURATION_SECONDS, BACKEND_REQUESTS_TOTAL};

/// Workflow list endpoint
pub const WORKFLOWS_PATH: &str = "/api/workflows";

/// Current user endpoint
pub const CURRENT_USER_PATH: &str = "/api/auth/user";

/// Authorization header built for one credential
struct CachedAuthorization {
    fingerprint: String,
    value: HeaderValue,
}

/// HTTP client for the orchestration API
pub struct ApiClient {
    http: reqwest::Client,
    backend: BackendConfig,
    store: Arc<SessionStore>,
    /// Dropped by a logout hook before views observe the logout
    authorization: Arc<RwLock<Option<CachedAuthorization>>>,
}

impl ApiClient {
    /// Create the client and register its logout hook on `store`
    ///
    /// # Errors
    /// `AppError::Config` for an invalid backend URL, `AppError::Internal`
    /// if the HTTP client cannot be built
    pub fn new(backend: &BackendConfig, store: Arc<SessionStore>) -> Result<Self, AppError> {
        backend.base()?;

        let http = reqwest::Client::builder()
            .user_agent(backend.user_agent.clone())
            .timeout(backend.timeout())
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        let authorization: Arc<RwLock<Option<CachedAuthorization>>> = Arc::new(RwLock::new(None));
        {
            let authorization = authorization.clone();
            store.on_clear(Box::new(move || {
                let mut cached = match authorization.write() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                if cached.take().is_some() {
                    tracing::debug!("Cached authorization header revoked");
                }
            }));
        }

        Ok(Self {
            http,
            backend: backend.clone(),
            store,
            authorization,
        })
    }

    /// The session store this client reads credentials from
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// True if an authorization header is currently cached
    pub fn has_cached_authorization(&self) -> bool {
        match self.authorization.read() {
            Ok(cached) => cached.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    /// `GET /api/workflows`
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>, AppError> {
        let response: WorkflowListResponse = self.get_protected(WORKFLOWS_PATH).await?;
        Ok(response.into_workflows())
    }

    /// `GET /api/auth/user`
    pub async fn current_user(&self) -> Result<Identity, AppError> {
        let response: CurrentUserResponse = self.get_protected(CURRENT_USER_PATH).await?;
        Ok(response.user.into())
    }

    /// Check a rehydrated session against the backend
    ///
    /// Returns false if there was no session or the backend rejected it.
    /// An unreachable backend keeps the session; it is no evidence against
    /// the credential.
    pub async fn verify_session(&self) -> bool {
        if !gate::is_authenticated(&self.store.read()) {
            return false;
        }

        match self.current_user().await {
            Ok(user) => {
                tracing::info!(username = %user.username, "Restored session verified");
                true
            }
            Err(AppError::CredentialExpired) | Err(AppError::NotAuthenticated) => {
                tracing::info!("Restored session was rejected by the backend");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not verify restored session; keeping it");
                true
            }
        }
    }

    /// Log out
    ///
    /// Local first: the session is cleared before anything else happens.
    /// When `backend.logout_path` is configured, the old credential is then
    /// sent there so the backend can invalidate it. Failures of that call are
    /// logged only.
    pub async fn logout(&self) {
        let previous = self.store.read();
        self.store.clear_session();

        let (Some(path), Some(credential)) = (&self.backend.logout_path, previous.credential())
        else {
            return;
        };

        let url = match self.backend.endpoint(path) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid logout endpoint");
                return;
            }
        };

        let header = match header_for(credential) {
            Ok(header) => header,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot build logout authorization header");
                return;
            }
        };

        match self.http.post(url).header(AUTHORIZATION, header).send().await {
            Ok(response) => {
                record_status(path, Some(response.status()));
                tracing::debug!(status = %response.status(), "Backend session invalidated");
            }
            Err(e) => {
                record_status(path, None);
                tracing::warn!(error = %e, "Backend logout failed");
            }
        }
    }

    async fn get_protected<T: DeserializeOwned>(&self, path: &'static str) -> Result<T, AppError> {
        let session = self.store.read();
        let credential = gate::require_credential(&session)?.clone();
        let url = self.backend.endpoint(path)?;
        let header = self.authorization_for(&credential)?;

        let timer = BACKEND_REQUEST_DURATION_SECONDS
            .with_label_values(&[path])
            .start_timer();
        let result = self.http.get(url).header(AUTHORIZATION, header).send().await;
        timer.observe_duration();

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                record_status(path, None);
                tracing::warn!(error = %e, endpoint = path, "Orchestration API unreachable");
                return Err(AppError::Transport(e));
            }
        };

        let status = response.status();
        record_status(path, Some(status));

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::warn!(status = %status, endpoint = path, "Credential rejected by backend");
            self.store.revoke(&credential);
            return Err(AppError::CredentialExpired);
        }

        if !status.is_success() {
            tracing::warn!(status = %status, endpoint = path, "Unexpected backend status");
            return Err(AppError::UnexpectedStatus(status.as_u16()));
        }

        response.json::<T>().await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("invalid response body from {path}: {e}"))
        })
    }

    /// Header for `credential`, reusing the cached one when it matches
    fn authorization_for(&self, credential: &Credential) -> Result<HeaderValue, AppError> {
        let fingerprint = credential.fingerprint();

        {
            let cached = match self.authorization.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(cached) = cached.as_ref() {
                if cached.fingerprint == fingerprint {
                    return Ok(cached.value.clone());
                }
            }
        }

        let value = header_for(credential)?;
        let mut cached = match self.authorization.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *cached = Some(CachedAuthorization {
            fingerprint,
            value: value.clone(),
        });
        Ok(value)
    }
}

fn header_for(credential: &Credential) -> Result<HeaderValue, AppError> {
    let mut value = HeaderValue::from_str(&credential.bearer()).map_err(|_| {
        AppError::InvalidSession("credential is not a valid header value".to_string())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn record_status(path: &str, status: Option<StatusCode>) {
    let status = match status {
        Some(status) => status.as_u16().to_string(),
        None => "transport_error".to_string(),
    };
    BACKEND_REQUESTS_TOTAL
        .with_label_values(&[path, status.as_str()])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str) -> BackendConfig {
        BackendConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 2,
            user_agent: "RelayForge-Web/test".to_string(),
            logout_path: None,
        }
    }

    fn signed_in_store() -> Arc<SessionStore> {
        let store = Arc::new(SessionStore::new());
        store
            .set_session(
                Some(Identity::new("u1", "alice", "a.png")),
                Some("tok-123".to_string()),
            )
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_no_credential_means_no_request() {
        let store = Arc::new(SessionStore::new());
        let client = ApiClient::new(&backend("http://127.0.0.1:1"), store.clone()).unwrap();

        let result = client.list_workflows().await;

        assert!(matches!(result, Err(AppError::NotAuthenticated)));
        assert!(!client.has_cached_authorization());
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_session() {
        let store = signed_in_store();
        let client = ApiClient::new(&backend("http://127.0.0.1:1"), store.clone()).unwrap();

        let result = client.list_workflows().await;

        assert!(matches!(result, Err(AppError::Transport(_))));
        assert!(gate::is_authenticated(&store.read()));
    }

    #[test]
    fn test_authorization_header_is_cached_and_revoked_on_logout() {
        let store = signed_in_store();
        let client = ApiClient::new(&backend("http://localhost:8080"), store.clone()).unwrap();

        let credential = store.read().credential().cloned().unwrap();
        let header = client.authorization_for(&credential).unwrap();
        assert_eq!(header.to_str().unwrap(), "Bearer tok-123");
        assert!(header.is_sensitive());
        assert!(client.has_cached_authorization());

        store.clear_session();
        assert!(!client.has_cached_authorization());
    }

    #[test]
    fn test_cached_header_follows_new_credential() {
        let store = signed_in_store();
        let client = ApiClient::new(&backend("http://localhost:8080"), store.clone()).unwrap();

        let first = store.read().credential().cloned().unwrap();
        client.authorization_for(&first).unwrap();

        store
            .set_session(
                Some(Identity::new("u1", "alice", "a.png")),
                Some("tok-456".to_string()),
            )
            .unwrap();
        let second = store.read().credential().cloned().unwrap();
        let header = client.authorization_for(&second).unwrap();
        assert_eq!(header.to_str().unwrap(), "Bearer tok-456");
    }

    #[tokio::test]
    async fn test_verify_without_session_is_false() {
        let store = Arc::new(SessionStore::new());
        let client = ApiClient::new(&backend("http://127.0.0.1:1"), store).unwrap();
        assert!(!client.verify_session().await);
    }

    #[tokio::test]
    async fn test_verify_keeps_session_when_backend_unreachable() {
        let store = signed_in_store();
        let client = ApiClient::new(&backend("http://127.0.0.1:1"), store.clone()).unwrap();
        assert!(client.verify_session().await);
        assert!(gate::is_authenticated(&store.read()));
    }
}
