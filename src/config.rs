//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Host shell configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
}

impl ServerConfig {
    /// Address the shell listens on
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Orchestration API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the API (e.g., "http://localhost:8080")
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    pub timeout_seconds: u64,
    /// User agent sent with every request
    pub user_agent: String,
    /// Optional server-side session invalidation endpoint, called on logout
    #[serde(default)]
    pub logout_path: Option<String>,
}

impl BackendConfig {
    /// Parsed base URL
    ///
    /// # Errors
    /// Returns `AppError::Config` if the URL is malformed or not http(s)
    pub fn base(&self) -> Result<Url, crate::error::AppError> {
        let url = Url::parse(self.base_url.trim()).map_err(|e| {
            crate::error::AppError::Config(format!(
                "backend.base_url '{}' is invalid: {e}",
                self.base_url
            ))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(crate::error::AppError::Config(format!(
                "backend.base_url must use http or https, got '{other}'"
            ))),
        }
    }

    /// Join a path onto the base URL
    ///
    /// Any path already present on the base URL is kept as a prefix.
    pub fn endpoint(&self, path: &str) -> Result<Url, crate::error::AppError> {
        let mut url = self.base()?;
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/{}", prefix, path.trim_start_matches('/')));
        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Session persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Keep the session across restarts
    pub persist: bool,
    /// Where the persisted session is written
    pub path: Option<PathBuf>,
    /// Maximum age of a persisted session in seconds (default: 86400 = 24h)
    pub max_age_seconds: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (RELAYFORGE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("backend.base_url", "http://localhost:8080")?
            .set_default("backend.timeout_seconds", 30)?
            .set_default("backend.user_agent", "RelayForge-Web/0.1.0")?
            .set_default("session.persist", false)?
            .set_default("session.path", ".relayforge/session.json")?
            .set_default("session.max_age_seconds", 86400)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("RELAYFORGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        self.backend.base()?;

        if self.backend.timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "backend.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.session.max_age_seconds <= 0 {
            return Err(crate::error::AppError::Config(
                "session.max_age_seconds must be greater than 0".to_string(),
            ));
        }

        if self.session.persist && self.session.path.is_none() {
            return Err(crate::error::AppError::Config(
                "session.path is required when session.persist=true".to_string(),
            ));
        }

        if let Some(path) = &self.backend.logout_path {
            if !path.starts_with('/') {
                return Err(crate::error::AppError::Config(
                    "backend.logout_path must start with '/'".to_string(),
                ));
            }
        }

        Ok(())
    }
}
