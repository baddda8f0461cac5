//! E2E tests for restoring a persisted session at startup

mod common;

use chrono::{Duration, Utc};
use common::{MockBackend, TestServer, VALID_TOKEN, test_config};
use relayforge_web::auth::{
    Credential, FileSessionStorage, Identity, PersistedSession, SessionPersistence,
    is_authenticated,
};
use tempfile::TempDir;

fn persisted(token: &str) -> PersistedSession {
    PersistedSession::new(
        Identity::new("42", "octocat", "https://avatars.example.com/octocat.png"),
        Credential::parse(token).unwrap(),
    )
}

#[tokio::test]
async fn test_login_survives_restart() {
    let backend = MockBackend::start().await;
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&backend, &temp_dir);
    config.session.persist = true;

    // First run: log in
    let first = TestServer::start(backend, temp_dir, config.clone()).await;
    first.login_as(VALID_TOKEN).await;
    assert!(is_authenticated(&first.state.session.read()));

    // Second run against the same file
    let backend = MockBackend::start().await;
    let mut config = config;
    config.backend.base_url = backend.addr.clone();
    let second = TestServer::start(backend, first._temp_dir, config).await;

    assert!(is_authenticated(&second.state.session.read()));
    assert_eq!(second.backend.user_requests(), 1);
    let nav = second.view("/").await;
    assert_eq!(nav["account"]["username"], "octocat");
}

#[tokio::test]
async fn test_rejected_restored_session_is_discarded() {
    let backend = MockBackend::start().await;
    backend.reject_credentials();
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&backend, &temp_dir);
    config.session.persist = true;

    let path = config.session.path.clone().unwrap();
    FileSessionStorage::new(&path)
        .save(&persisted(VALID_TOKEN))
        .unwrap();

    let server = TestServer::start(backend, temp_dir, config).await;

    assert!(server.state.session.read().is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_stale_session_is_not_restored() {
    let backend = MockBackend::start().await;
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&backend, &temp_dir);
    config.session.persist = true;

    let path = config.session.path.clone().unwrap();
    let mut record = persisted(VALID_TOKEN);
    record.saved_at = Utc::now() - Duration::hours(25);
    FileSessionStorage::new(&path).save(&record).unwrap();

    let server = TestServer::start(backend, temp_dir, config).await;

    assert!(server.state.session.read().is_empty());
    assert_eq!(server.backend.user_requests(), 0);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_persistence_disabled_ignores_file() {
    let backend = MockBackend::start().await;
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(&backend, &temp_dir);

    let path = config.session.path.clone().unwrap();
    FileSessionStorage::new(&path)
        .save(&persisted(VALID_TOKEN))
        .unwrap();

    let server = TestServer::start(backend, temp_dir, config).await;

    assert!(server.state.session.read().is_empty());
    assert!(path.exists());
}

#[tokio::test]
async fn test_logout_removes_persisted_session() {
    let server = TestServer::with_config(|config| config.session.persist = true).await;
    let path = server.state.config.session.path.clone().unwrap();

    server.login_as(VALID_TOKEN).await;
    assert!(path.exists());

    server
        .client
        .post(server.url("/logout"))
        .send()
        .await
        .unwrap();

    assert!(!path.exists());
}
