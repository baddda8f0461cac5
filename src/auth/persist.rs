//! Durable session storage
//!
//! The session store calls into a [`SessionPersistence`] on every login and
//! logout, and reads it once at startup through `SessionStore::rehydrate`.
//! The file backend writes JSON with restricted permissions (0600).
//! Tokens are never logged.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::session::{Credential, Identity};
use crate::error::AppError;

/// On-disk session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub identity: Identity,
    pub credential: Credential,
    /// When the login that produced this record happened
    pub saved_at: DateTime<Utc>,
}

impl PersistedSession {
    pub fn new(identity: Identity, credential: Credential) -> Self {
        Self {
            identity,
            credential,
            saved_at: Utc::now(),
        }
    }

    /// Check if the record is older than `max_age`
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.saved_at + max_age < Utc::now()
    }
}

/// Durable storage behind the session store
#[cfg_attr(test, mockall::automock)]
pub trait SessionPersistence: Send + Sync {
    /// Read the stored record, `None` when nothing is stored
    fn load(&self) -> Result<Option<PersistedSession>, AppError>;

    /// Replace the stored record
    fn save(&self, record: &PersistedSession) -> Result<(), AppError>;

    /// Remove the stored record; succeeds when nothing is stored
    fn clear(&self) -> Result<(), AppError>;
}

/// JSON file storage
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionStorage {
    fn load(&self) -> Result<Option<PersistedSession>, AppError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| {
            AppError::Persistence(format!("failed to read {}: {e}", self.path.display()))
        })?;

        let record = serde_json::from_str(&contents).map_err(|e| {
            AppError::Persistence(format!("failed to parse {}: {e}", self.path.display()))
        })?;

        Ok(Some(record))
    }

    fn save(&self, record: &PersistedSession) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = serde_json::to_string_pretty(record)
            .map_err(|e| AppError::Persistence(format!("failed to serialize session: {e}")))?;

        #[cfg(unix)]
        let mut file = {
            use std::os::unix::fs::OpenOptionsExt;
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)?
        };

        #[cfg(not(unix))]
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;

        file.write_all(contents.as_bytes())?;

        tracing::debug!(path = %self.path.display(), "Session persisted");
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Persisted session removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> PersistedSession {
        PersistedSession::new(
            Identity::new("u1", "alice", "a.png"),
            Credential::parse("tok-123").unwrap(),
        )
    }

    #[test]
    fn test_missing_file_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("session.json"));
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("nested").join("session.json"));

        let saved = record();
        storage.save(&saved).unwrap();

        assert_eq!(storage.load().unwrap(), Some(saved));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("session.json"));
        storage.save(&record()).unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("session.json"));
        storage.save(&record()).unwrap();

        storage.clear().unwrap();
        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let storage = FileSessionStorage::new(path);
        assert!(matches!(storage.load(), Err(AppError::Persistence(_))));
    }

    #[test]
    fn test_staleness() {
        let mut old = record();
        old.saved_at = Utc::now() - Duration::hours(25);
        assert!(old.is_stale(Duration::hours(24)));
        assert!(!record().is_stale(Duration::hours(24)));
    }
}
