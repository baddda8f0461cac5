//! Common test utilities for E2E tests
#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use relayforge_web::{AppState, config};
use serde_json::{Value, json};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU16, AtomicUsize, Ordering},
};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// The only credential the mock backend accepts
pub const VALID_TOKEN: &str = "tok-123";

/// Observable state of the mock orchestration API
#[derive(Default)]
pub struct BackendState {
    pub workflow_requests: AtomicUsize,
    pub user_requests: AtomicUsize,
    /// Status answered to every credential; 0 accepts the valid one
    pub rejection_status: AtomicU16,
    pub workflows: Mutex<Vec<Value>>,
    pub logged_out: Mutex<Vec<String>>,
}

/// Mock orchestration API
pub struct MockBackend {
    pub addr: String,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    /// Start the mock backend on a random port
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());

        let app = Router::new()
            .route("/api/auth/github", get(github_login))
            .route("/api/auth/user", get(current_user))
            .route("/api/auth/logout", post(logout))
            .route("/api/workflows", get(list_workflows))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn set_workflows(&self, workflows: Vec<Value>) {
        *self.state.workflows.lock().unwrap() = workflows;
    }

    /// From now on every credential is answered with 401
    pub fn reject_credentials(&self) {
        self.reject_with(StatusCode::UNAUTHORIZED);
    }

    /// From now on every credential is answered with 403
    pub fn forbid_credentials(&self) {
        self.reject_with(StatusCode::FORBIDDEN);
    }

    fn reject_with(&self, status: StatusCode) {
        self.state
            .rejection_status
            .store(status.as_u16(), Ordering::SeqCst);
    }

    pub fn workflow_requests(&self) -> usize {
        self.state.workflow_requests.load(Ordering::SeqCst)
    }

    pub fn user_requests(&self) -> usize {
        self.state.user_requests.load(Ordering::SeqCst)
    }

    /// Tokens presented to the logout endpoint
    pub fn logged_out(&self) -> Vec<String> {
        self.state.logged_out.lock().unwrap().clone()
    }
}

type BearerHeader = Option<TypedHeader<Authorization<Bearer>>>;

fn authorize(state: &BackendState, header: &BearerHeader) -> Result<(), StatusCode> {
    let rejection = state.rejection_status.load(Ordering::SeqCst);
    if rejection != 0 {
        return Err(StatusCode::from_u16(rejection).unwrap());
    }

    match header {
        Some(TypedHeader(auth)) if auth.token() == VALID_TOKEN => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn github_login() -> &'static str {
    "GitHub authorization"
}

async fn current_user(
    State(state): State<Arc<BackendState>>,
    header: BearerHeader,
) -> Result<Json<Value>, StatusCode> {
    state.user_requests.fetch_add(1, Ordering::SeqCst);
    authorize(&state, &header)?;

    Ok(Json(json!({
        "user": {
            "id": 42,
            "github_id": 583231,
            "username": "octocat",
            "email": "octocat@example.com",
            "avatar_url": "https://avatars.example.com/octocat.png"
        }
    })))
}

async fn list_workflows(
    State(state): State<Arc<BackendState>>,
    header: BearerHeader,
) -> Result<Json<Value>, StatusCode> {
    state.workflow_requests.fetch_add(1, Ordering::SeqCst);
    authorize(&state, &header)?;

    let workflows = state.workflows.lock().unwrap().clone();
    Ok(Json(json!({ "workflows": workflows })))
}

async fn logout(State(state): State<Arc<BackendState>>, header: BearerHeader) -> StatusCode {
    match header {
        Some(TypedHeader(auth)) => {
            state
                .logged_out
                .lock()
                .unwrap()
                .push(auth.token().to_string());
            StatusCode::NO_CONTENT
        }
        None => StatusCode::UNAUTHORIZED,
    }
}

/// A workflow as the backend serializes it
pub fn sample_workflow(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("{name} pipeline"),
        "user_id": 42,
        "is_active": true,
        "created_at": "2025-01-15T10:00:00Z",
        "updated_at": "2025-01-16T12:30:00Z"
    })
}

/// Configuration pointing at `backend`, persisting into `temp_dir` if enabled
pub fn test_config(backend: &MockBackend, temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
        },
        backend: config::BackendConfig {
            base_url: backend.addr.clone(),
            timeout_seconds: 5,
            user_agent: "RelayForge-Web/test".to_string(),
            logout_path: None,
        },
        session: config::SessionConfig {
            persist: false,
            path: Some(temp_dir.path().join("session.json")),
            max_age_seconds: 86400,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub backend: MockBackend,
    pub _temp_dir: TempDir,
    /// Does not follow redirects
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server with default configuration
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a new test server, adjusting the configuration first
    pub async fn with_config(configure: impl FnOnce(&mut config::AppConfig)) -> Self {
        let backend = MockBackend::start().await;
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&backend, &temp_dir);
        configure(&mut config);
        Self::start(backend, temp_dir, config).await
    }

    /// Start a test server against an existing backend and directory
    pub async fn start(backend: MockBackend, temp_dir: TempDir, config: config::AppConfig) -> Self {
        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        let app = relayforge_web::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            backend,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for shell requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Complete a login through the return route
    pub async fn login_as(&self, token: &str) -> reqwest::Response {
        self.client
            .get(self.url("/auth/callback"))
            .query(&[
                ("token", token),
                ("id", "42"),
                ("username", "octocat"),
                ("avatar_url", "https://avatars.example.com/octocat.png"),
            ])
            .send()
            .await
            .unwrap()
    }

    /// GET a JSON view model
    pub async fn view(&self, path: &str) -> Value {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        assert_eq!(response.status(), 200);
        response.json().await.unwrap()
    }
}
