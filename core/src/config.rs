//! Client configuration passed explicitly at construction.
//!
//! `from_env` is the only place the process environment is read.

use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.postmarkapp.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a `PostmarkClient` needs, passed explicitly at construction.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub server_token: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(server_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            server_token: server_token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `POSTMARK_SERVER_TOKEN`, `POSTMARK_BASE_URL` and
    /// `POSTMARK_TIMEOUT_SECS`, after loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_token = lookup("POSTMARK_SERVER_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::MissingServerToken)?;
        let mut config = ClientConfig::new(server_token);

        if let Some(base_url) = lookup("POSTMARK_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(raw) = lookup("POSTMARK_TIMEOUT_SECS") {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout(raw.clone()))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("server_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("POSTMARK_SERVER_TOKEN environment variable is required")]
    MissingServerToken,
    #[error("POSTMARK_TIMEOUT_SECS must be a positive whole number of seconds, got {0:?}")]
    InvalidTimeout(String),
}
