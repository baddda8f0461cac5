//! Session data model
//!
//! A session pairs the signed-in GitHub identity with the bearer credential
//! issued by the orchestration API. Both halves are present or both absent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the signed-in user
///
/// Delivered by the backend at the end of the GitHub login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique external id assigned by the backend
    pub id: String,
    /// Display name (GitHub login)
    pub username: String,
    /// Avatar URL from GitHub
    #[serde(default)]
    pub avatar_url: String,
}

impl Identity {
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        avatar_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            avatar_url: avatar_url.into(),
        }
    }

    /// Check the fields a session cannot do without
    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.id.trim().is_empty() {
            return Err(crate::error::AppError::InvalidSession(
                "identity id is empty".to_string(),
            ));
        }
        if self.username.trim().is_empty() {
            return Err(crate::error::AppError::InvalidSession(
                "identity username is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Opaque bearer token authorizing calls to the orchestration API
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token exactly as delivered
    ///
    /// # Errors
    /// `AppError::InvalidSession` if the token is empty, carries surrounding
    /// whitespace, or cannot be sent in an `Authorization` header.
    pub fn parse(token: impl Into<String>) -> Result<Self, crate::error::AppError> {
        use axum::http::HeaderValue;

        let token = token.into();
        if token.trim().is_empty() {
            return Err(crate::error::AppError::InvalidSession(
                "credential is empty".to_string(),
            ));
        }
        if token.trim() != token {
            return Err(crate::error::AppError::InvalidSession(
                "credential has surrounding whitespace".to_string(),
            ));
        }
        if HeaderValue::from_str(&format!("Bearer {token}")).is_err() {
            return Err(crate::error::AppError::InvalidSession(
                "credential is not a valid header value".to_string(),
            ));
        }
        Ok(Self(token))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Stable, non-reversible label for the token
    ///
    /// Format: base64url(sha256(token))
    pub fn fingerprint(&self) -> String {
        use base64::{Engine as _, engine::general_purpose};
        use sha2::{Digest, Sha256};

        let digest = Sha256::digest(self.0.as_bytes());
        general_purpose::URL_SAFE_NO_PAD.encode(digest)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Current authentication state of the tab
///
/// Construct through [`Session::empty`] or [`Session::authenticated`];
/// the fields cannot be set independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
    credential: Option<Credential>,
}

impl Session {
    /// The unauthenticated session
    pub fn empty() -> Self {
        Self::default()
    }

    /// A session holding both halves
    pub fn authenticated(identity: Identity, credential: Credential) -> Self {
        Self {
            identity: Some(identity),
            credential: Some(credential),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.identity.is_none() && self.credential.is_none()
    }

    /// Public view of the session, without the credential
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            authenticated: super::gate::is_authenticated(self),
            user: self.identity.clone(),
        }
    }
}

/// Serializable session view for dependent pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub authenticated: bool,
    pub user: Option<Identity>,
}
