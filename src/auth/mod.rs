//! GitHub authentication and session state
//!
//! Handles:
//! - Session store and change notification
//! - Login handoff (initiate / complete)
//! - The dependent-view gate
//! - Session persistence
//! - Login, return and logout routes

pub mod gate;
pub mod handoff;
mod oauth;
pub mod persist;
pub mod session;
mod store;

pub use gate::{Access, is_authenticated, require_credential};
pub use handoff::{HandoffController, Navigation, ReturnPayload};
pub use oauth::auth_router;
pub use persist::{FileSessionStorage, PersistedSession, SessionPersistence};
pub use session::{Credential, Identity, Session, SessionSummary};
pub use store::{ClearHook, SessionStore, SessionWatcher};
