//! Back-office configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARDAPIO_API_URL` - Base URL of the restaurant backend
//! - `BACKOFFICE_BASE_URL` - Public URL for the back-office
//!
//! ## Optional
//! - `BACKOFFICE_HOST` - Bind address (default: 127.0.0.1)
//! - `BACKOFFICE_PORT` - Listen port (default: 3001)
//! - `CARDAPIO_SOCKET_URL` - Realtime endpoint (default: the API URL)
//! - `CARDAPIO_UTC_OFFSET` - Offset used for dates on screen and in reports (default: -03:00)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};

use cardapio_client::ApiConfig;
use chrono::FixedOffset;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Back-office application configuration.
#[derive(Clone)]
pub struct BackofficeConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the back-office
    pub base_url: String,
    /// Backend REST and socket endpoints
    pub api: ApiConfig,
    /// Offset applied to timestamps shown to staff
    pub utc_offset: FixedOffset,
    /// Sentry DSN for error tracking (embeds the project key)
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for BackofficeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackofficeConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("api", &self.api)
            .field("utc_offset", &self.utc_offset)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish_non_exhaustive()
    }
}

impl BackofficeConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("BACKOFFICE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("BACKOFFICE_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("BACKOFFICE_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("BACKOFFICE_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("BACKOFFICE_BASE_URL")?;

        let api_url = get_required_env("CARDAPIO_API_URL")?;
        let socket_url = get_optional_env("CARDAPIO_SOCKET_URL");
        let api = ApiConfig::new(&api_url, socket_url.as_deref()).map_err(|e| {
            ConfigError::InvalidEnvVar("CARDAPIO_API_URL".to_string(), e.to_string())
        })?;

        let utc_offset = get_env_or_default("CARDAPIO_UTC_OFFSET", "-03:00")
            .trim()
            .parse::<FixedOffset>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CARDAPIO_UTC_OFFSET".to_string(), e.to_string())
            })?;

        Ok(Self {
            host,
            port,
            base_url,
            api,
            utc_offset,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_sample_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: parse_sample_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_sample_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    let rate = raw
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> BackofficeConfig {
        BackofficeConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: "https://gestao.cardapio.app".to_string(),
            api: ApiConfig::new("http://localhost:3333", None).unwrap(),
            utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
            sentry_dsn: Some("https://secretkey@o0.ingest.sentry.io/0".to_string()),
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_socket_addr_uses_backoffice_port() {
        assert_eq!(config().socket_addr().port(), 3001);
    }

    #[test]
    fn test_https_base_url_enables_secure_cookies() {
        let mut config = config();
        assert!(config.is_secure());
        config.base_url = "http://localhost:3001".to_string();
        assert!(!config.is_secure());
    }

    #[test]
    fn test_debug_hides_sentry_key() {
        let debug_output = format!("{:?}", config());
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("secretkey"));
    }

    #[test]
    fn test_sample_rate_default_when_unset() {
        assert!((parse_sample_rate("CARDAPIO_TEST_UNSET_RATE", 0.25).unwrap() - 0.25).abs() < f32::EPSILON);
    }
}
