//! Dependent-view gate
//!
//! Every protected view and every protected action asks the gate before it
//! runs. Fetch logic obtains the credential only through
//! [`require_credential`], so a request can never leave without one.

use serde::Serialize;

use super::session::{Credential, Identity, Session};
use crate::error::AppError;

/// True iff the session holds both an identity and a credential
pub fn is_authenticated(session: &Session) -> bool {
    session.identity().is_some() && session.credential().is_some()
}

/// Credential for a protected request
///
/// # Errors
/// `AppError::NotAuthenticated` when the gate is closed. Callers show a
/// "please authenticate" affordance instead of fetching.
pub fn require_credential(session: &Session) -> Result<&Credential, AppError> {
    match (session.identity(), session.credential()) {
        (Some(_), Some(credential)) => Ok(credential),
        _ => Err(AppError::NotAuthenticated),
    }
}

/// Gate decision for views that branch on the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum Access {
    Granted { identity: Identity },
    Denied,
}

impl Access {
    pub fn is_granted(&self) -> bool {
        matches!(self, Access::Granted { .. })
    }
}

/// Decide access for a session
pub fn access(session: &Session) -> Access {
    match session.identity() {
        Some(identity) if is_authenticated(session) => Access::Granted {
            identity: identity.clone(),
        },
        _ => Access::Denied,
    }
}
