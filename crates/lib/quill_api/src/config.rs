//! API server configuration.

use std::time::Duration;

use quill_core::auth::jwt::resolve_secret;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis URL. `None` keeps tokens and cache in process memory.
    pub redis_url: Option<String>,
    /// Access token signing secret.
    pub jwt_secret: String,
    /// Refresh token signing secret.
    pub refresh_token_secret: String,
    pub request_timeout: Duration,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable               | Default                              |
    /// |------------------------|--------------------------------------|
    /// | `BIND_ADDR`            | `127.0.0.1:3100`                     |
    /// | `DATABASE_URL`         | `postgres://localhost:5432/quill`    |
    /// | `REDIS_URL`            | unset (in-process store)             |
    /// | `JWT_SECRET`           | generated & persisted to file        |
    /// | `REFRESH_TOKEN_SECRET` | generated & persisted to file        |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/quill".into()),
            redis_url: std::env::var("REDIS_URL").ok().filter(|u| !u.is_empty()),
            jwt_secret: resolve_secret("JWT_SECRET", "jwt_secret"),
            refresh_token_secret: resolve_secret("REFRESH_TOKEN_SECRET", "refresh_token_secret"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
