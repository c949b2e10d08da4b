//! Client configuration.
//!
//! Use the builder methods to customize, or [`ClientConfig::from_env`] to
//! pick up overrides from the process environment.

use std::time::Duration;

use thiserror::Error;

/// Default backend address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default request timeout (seconds). Long enough for slow answers.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default maximum characters of a question used as a conversation title.
pub const DEFAULT_TITLE_MAX_CHARS: usize = 50;

pub const ENV_API_URL: &str = "DATACHAT_API_URL";
pub const ENV_TOKEN: &str = "DATACHAT_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "DATACHAT_TIMEOUT_SECS";

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Configuration for talking to the answering service.
///
/// # Example
///
/// ```ignore
/// use datachat::config::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_base_url("http://analytics.internal:8000")
///     .with_request_timeout_secs(30);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend address without a trailing slash
    pub base_url: String,
    /// Bearer token forwarded as `Authorization`, if any
    pub auth_token: Option<String>,
    /// Whole-request timeout, including reading a streamed answer
    pub request_timeout_secs: u64,
    /// Maximum characters of a question used as a derived title
    pub title_max_chars: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_token: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend address. A trailing slash is removed.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_title_max_chars(mut self, chars: usize) -> Self {
        self.title_max_chars = chars;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Create config from the environment, falling back to defaults.
    ///
    /// Reads `DATACHAT_API_URL`, `DATACHAT_TOKEN` and `DATACHAT_TIMEOUT_SECS`.
    /// The result is validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                config = config.with_base_url(url.trim());
            }
        }

        if let Ok(token) = std::env::var(ENV_TOKEN) {
            if !token.trim().is_empty() {
                config = config.with_auth_token(token.trim());
            }
        }

        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TIMEOUT_SECS.to_string(),
                value: raw.clone(),
            })?;
            config = config.with_request_timeout_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::InvalidUrl {
                url: self.base_url.clone(),
                reason: "empty".to_string(),
            });
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl {
                url: self.base_url.clone(),
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.title_max_chars == 0 {
            return Err(ConfigError::InvalidValue {
                key: "title_max_chars".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}
