//! Connection settings shared by the REST client and the realtime hub.

use std::time::Duration;

use url::Url;

/// Default REST request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default wait between socket reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Backend endpoints.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the backend, without the `/api/v1` suffix.
    pub api_url: Url,
    /// Base URL of the socket server; usually the same host as the API.
    pub socket_url: Url,
    pub timeout: Duration,
    pub reconnect_delay: Duration,
}

impl ApiConfig {
    /// Build the configuration from base URLs.
    ///
    /// `socket_url` defaults to `api_url` when `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL does not parse or is not http(s).
    pub fn new(api_url: &str, socket_url: Option<&str>) -> Result<Self, url::ParseError> {
        let api_url = parse_http_url(api_url)?;
        let socket_url = match socket_url {
            Some(raw) => parse_http_url(raw)?,
            None => api_url.clone(),
        };
        Ok(Self {
            api_url,
            socket_url,
            timeout: DEFAULT_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        })
    }

    /// REST root, e.g. `https://api.example.com/api/v1`.
    #[must_use]
    pub fn rest_base(&self) -> String {
        format!("{}/api/v1", self.api_url.as_str().trim_end_matches('/'))
    }

    /// socket.io WebSocket endpoint with the scheme switched to ws(s).
    #[must_use]
    pub fn socket_endpoint(&self) -> String {
        let base = self.socket_url.as_str().trim_end_matches('/');
        let base = base
            .strip_prefix("https://")
            .map(|rest| format!("wss://{rest}"))
            .or_else(|| base.strip_prefix("http://").map(|rest| format!("ws://{rest}")))
            .unwrap_or_else(|| base.to_string());
        format!("{base}/socket.io/?EIO=4&transport=websocket")
    }
}

fn parse_http_url(raw: &str) -> Result<Url, url::ParseError> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(url::ParseError::RelativeUrlWithoutBase),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_base_strips_trailing_slash() {
        let config = ApiConfig::new("https://api.cardapio.app/", None).unwrap();
        assert_eq!(config.rest_base(), "https://api.cardapio.app/api/v1");
    }

    #[test]
    fn test_socket_defaults_to_api_host() {
        let config = ApiConfig::new("https://api.cardapio.app", None).unwrap();
        assert_eq!(
            config.socket_endpoint(),
            "wss://api.cardapio.app/socket.io/?EIO=4&transport=websocket"
        );
        let config = ApiConfig::new("http://localhost:3333", Some("http://localhost:4444")).unwrap();
        assert_eq!(
            config.socket_endpoint(),
            "ws://localhost:4444/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(ApiConfig::new("ftp://x", None).is_err());
        assert!(ApiConfig::new("not a url", None).is_err());
    }
}
