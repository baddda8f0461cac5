//! Session store
//!
//! Single source of truth for the authentication state of one tab.
//! Owned by `AppState` and handed to views as `Arc<SessionStore>`.
//!
//! # Ordering
//! - Mutations publish through a `watch` channel, so every read after
//!   `set_session`/`clear_session` returns sees the new value.
//! - `clear_session` runs the registered logout hooks before subscribers
//!   are notified.

use chrono::Duration;
use std::sync::RwLock;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::persist::{FileSessionStorage, PersistedSession, SessionPersistence};
use super::session::{Credential, Identity, Session};
use crate::config::SessionConfig;
use crate::error::AppError;
use crate::metrics::{SESSION_AUTHENTICATED, SESSION_TRANSITIONS_TOTAL};

/// Logout side effect, run synchronously by `clear_session`
///
/// Hooks must not register further hooks.
pub type ClearHook = Box<dyn Fn() + Send + Sync>;

/// Session store
pub struct SessionStore {
    tx: watch::Sender<Session>,
    clear_hooks: RwLock<Vec<ClearHook>>,
    persistence: Option<Box<dyn SessionPersistence>>,
    max_age: Duration,
}

impl SessionStore {
    /// Create an empty, in-memory store
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::empty());
        Self {
            tx,
            clear_hooks: RwLock::new(Vec::new()),
            persistence: None,
            max_age: Duration::hours(24),
        }
    }

    /// Create an empty store backed by durable storage
    ///
    /// Nothing is read until [`SessionStore::rehydrate`] is called.
    pub fn with_persistence(persistence: Box<dyn SessionPersistence>, max_age: Duration) -> Self {
        Self {
            persistence: Some(persistence),
            max_age,
            ..Self::new()
        }
    }

    /// Build the store described by configuration
    pub fn from_config(config: &SessionConfig) -> Self {
        match (&config.persist, &config.path) {
            (true, Some(path)) => Self::with_persistence(
                Box::new(FileSessionStorage::new(path.clone())),
                Duration::seconds(config.max_age_seconds),
            ),
            _ => Self::new(),
        }
    }

    /// Snapshot of the current session
    pub fn read(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Replace the stored session
    ///
    /// # Errors
    /// `AppError::InvalidSession` when either half is missing or empty.
    /// The store is left unchanged in that case.
    pub fn set_session(
        &self,
        identity: Option<Identity>,
        credential: Option<String>,
    ) -> Result<(), AppError> {
        let (identity, credential) = match validate(identity, credential) {
            Ok(parts) => parts,
            Err(e) => {
                SESSION_TRANSITIONS_TOTAL
                    .with_label_values(&["rejected"])
                    .inc();
                tracing::warn!(error = %e, "Rejected session update");
                return Err(e);
            }
        };

        if let Some(persistence) = &self.persistence {
            let record = PersistedSession::new(identity.clone(), credential.clone());
            if let Err(e) = persistence.save(&record) {
                tracing::warn!(error = %e, "Failed to persist session; keeping it in memory only");
            }
        }

        self.install(identity, credential, "login");
        Ok(())
    }

    /// Reset to the empty session
    ///
    /// Idempotent. Logout hooks run on every call; subscribers are only
    /// notified when a session was actually removed.
    pub fn clear_session(&self) {
        self.clear_where(|_| true);
    }

    /// Clear the session only if it still holds `credential`
    ///
    /// Returns true if the session was cleared. A rejection that arrives for
    /// a credential that has since been replaced leaves the newer session alone.
    pub fn revoke(&self, credential: &Credential) -> bool {
        self.clear_where(|session| session.credential() == Some(credential))
    }

    /// Register a logout side effect
    pub fn on_clear(&self, hook: ClearHook) {
        match self.clear_hooks.write() {
            Ok(mut hooks) => hooks.push(hook),
            Err(poisoned) => poisoned.into_inner().push(hook),
        }
    }

    /// Subscribe to session changes
    pub fn subscribe(&self) -> SessionWatcher {
        SessionWatcher {
            rx: self.tx.subscribe(),
        }
    }

    /// Restore the session from durable storage
    ///
    /// Called once at startup. Stale, corrupt or inconsistent records are
    /// discarded and removed. Returns true if a session was restored.
    pub fn rehydrate(&self) -> bool {
        let Some(persistence) = &self.persistence else {
            return false;
        };

        let record = match persistence.load() {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!("No persisted session to restore");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted session");
                self.discard_persisted(&**persistence);
                return false;
            }
        };

        if record.is_stale(self.max_age) {
            tracing::info!(
                saved_at = %record.saved_at,
                "Persisted session is older than the maximum age; discarding"
            );
            self.discard_persisted(&**persistence);
            return false;
        }

        let validated = validate(
            Some(record.identity),
            Some(record.credential.expose().to_string()),
        );
        match validated {
            Ok((identity, credential)) => {
                self.install(identity, credential, "rehydrated");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Discarding invalid persisted session");
                self.discard_persisted(&**persistence);
                false
            }
        }
    }

    fn install(&self, identity: Identity, credential: Credential, transition: &'static str) {
        let username = identity.username.clone();
        self.tx
            .send_replace(Session::authenticated(identity, credential));

        SESSION_TRANSITIONS_TOTAL
            .with_label_values(&[transition])
            .inc();
        SESSION_AUTHENTICATED.set(1);
        tracing::info!(username = %username, transition, "Session established");
    }

    fn clear_where(&self, should_clear: impl Fn(&Session) -> bool) -> bool {
        if !should_clear(&*self.tx.borrow()) {
            return false;
        }

        self.run_clear_hooks();

        let cleared = self.tx.send_if_modified(|session| {
            if session.is_empty() || !should_clear(&*session) {
                return false;
            }
            *session = Session::empty();
            true
        });

        if cleared {
            if let Some(persistence) = &self.persistence {
                self.discard_persisted(&**persistence);
            }

            SESSION_TRANSITIONS_TOTAL
                .with_label_values(&["logout"])
                .inc();
            SESSION_AUTHENTICATED.set(0);
            tracing::info!("Session cleared");
        } else {
            tracing::debug!("Session already empty");
        }

        cleared
    }

    fn run_clear_hooks(&self) {
        let hooks = match self.clear_hooks.read() {
            Ok(hooks) => hooks,
            Err(poisoned) => poisoned.into_inner(),
        };
        for hook in hooks.iter() {
            hook();
        }
    }

    fn discard_persisted(&self, persistence: &dyn SessionPersistence) {
        if let Err(e) = persistence.clear() {
            tracing::warn!(error = %e, "Failed to remove persisted session");
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(
    identity: Option<Identity>,
    credential: Option<String>,
) -> Result<(Identity, Credential), AppError> {
    let identity =
        identity.ok_or_else(|| AppError::InvalidSession("identity is missing".to_string()))?;
    let credential =
        credential.ok_or_else(|| AppError::InvalidSession("credential is missing".to_string()))?;

    identity.validate()?;
    let credential = Credential::parse(credential)?;
    Ok((identity, credential))
}

/// Subscription to session changes
///
/// Held by dependent views; yields snapshots, never a mutable handle.
pub struct SessionWatcher {
    rx: watch::Receiver<Session>,
}

impl SessionWatcher {
    /// Latest session, marking it as seen
    pub fn current(&mut self) -> Session {
        self.rx.borrow_and_update().clone()
    }

    /// True if the session changed since it was last seen
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next change
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Session> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Stream of sessions, starting with the current one
    pub fn into_stream(self) -> WatchStream<Session> {
        WatchStream::new(self.rx)
    }
}
