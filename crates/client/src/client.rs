//! REST client for the restaurant backend.
//!
//! Public menu reads (company by slug) are cached with `moka` for five
//! minutes; everything else goes straight to the backend. Managerial calls
//! carry the staff member's bearer token.

use std::sync::Arc;
use std::time::Duration;

use cardapio_core::models::Empresa;
use moka::future::Cache;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{ApiError, extract_message};

/// Bearer token of a logged-in staff member.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    fn header_value(&self) -> Result<HeaderValue, ApiError> {
        HeaderValue::from_str(&format!("Bearer {}", self.0.expose_secret()))
            .map_err(|e| ApiError::Parse(format!("Invalid token format: {e}")))
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Empresa(Box<Empresa>),
}

/// Client for the restaurant REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(concat!("cardapio/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.rest_base(),
                cache,
            }),
        })
    }

    /// REST root this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub(crate) async fn cached_empresa(&self, slug: &str) -> Option<Empresa> {
        match self.inner.cache.get(&empresa_key(slug)).await {
            Some(CacheValue::Empresa(empresa)) => {
                debug!(slug, "Cache hit for empresa");
                Some(*empresa)
            }
            None => None,
        }
    }

    pub(crate) async fn cache_empresa(&self, empresa: &Empresa) {
        self.inner
            .cache
            .insert(
                empresa_key(empresa.slug.as_str()),
                CacheValue::Empresa(Box::new(empresa.clone())),
            )
            .await;
    }

    /// Drop the cached company so the next read hits the backend.
    pub async fn invalidate_empresa(&self, slug: &str) {
        self.inner.cache.invalidate(&empresa_key(slug)).await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        auth: Option<&BearerToken>,
    ) -> Result<RequestBuilder, ApiError> {
        let url = format!("{}{path}", self.inner.base_url);
        let mut builder = self.inner.client.request(method, url);
        if let Some(token) = auth {
            builder = builder.header(reqwest::header::AUTHORIZATION, token.header_value()?);
        }
        Ok(builder)
    }

    /// Execute a GET request.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: Option<&BearerToken>,
    ) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path, auth)?.send().await?;
        Self::handle_response(response).await
    }

    /// Execute a GET request with query-string parameters.
    pub(crate) async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
        auth: Option<&BearerToken>,
    ) -> Result<T, ApiError> {
        let response = self
            .request(Method::GET, path, auth)?
            .query(query)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Execute a POST request.
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: Option<&BearerToken>,
    ) -> Result<T, ApiError> {
        let response = self
            .request(Method::POST, path, auth)?
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Execute a PUT request.
    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: Option<&BearerToken>,
    ) -> Result<T, ApiError> {
        let response = self
            .request(Method::PUT, path, auth)?
            .json(body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Execute a PUT request whose response body is ignored.
    pub(crate) async fn put_unit<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
        auth: Option<&BearerToken>,
    ) -> Result<(), ApiError> {
        let response = self
            .request(Method::PUT, path, auth)?
            .json(body)
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    /// Execute a DELETE request.
    pub(crate) async fn delete(&self, path: &str, auth: Option<&BearerToken>) -> Result<(), ApiError> {
        let response = self.request(Method::DELETE, path, auth)?.send().await?;
        Self::handle_empty(response).await
    }

    async fn handle_empty(response: reqwest::Response) -> Result<(), ApiError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::parse_error(response).await)
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(format!("Failed to parse response: {e}"))
        })
    }

    /// Map an error response to [`ApiError`].
    async fn parse_error(response: reqwest::Response) -> ApiError {
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return ApiError::RateLimited(retry_after);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body);

        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(
                message.unwrap_or_else(|| "Sessão expirada. Entre novamente.".to_string()),
            ),
            StatusCode::FORBIDDEN => ApiError::Forbidden(
                message.unwrap_or_else(|| "Você não tem permissão para esta ação.".to_string()),
            ),
            StatusCode::NOT_FOUND => {
                ApiError::NotFound(message.unwrap_or_else(|| "Registro não encontrado.".to_string()))
            }
            _ => {
                if status.is_server_error() {
                    warn!(
                        status = %status,
                        body = %body.chars().take(500).collect::<String>(),
                        "Backend returned server error"
                    );
                }
                ApiError::Api {
                    status: status.as_u16(),
                    message: message.unwrap_or_default(),
                }
            }
        }
    }
}

fn empresa_key(slug: &str) -> String {
    format!("empresa:{slug}")
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_debug_is_redacted() {
        let token = BearerToken::new("eyJhbGciOi.secret");
        assert_eq!(format!("{token:?}"), "BearerToken([REDACTED])");
        assert_eq!(token.header_value().unwrap(), "Bearer eyJhbGciOi.secret");
    }

    #[test]
    fn test_client_uses_versioned_base() {
        let config = ApiConfig::new("http://localhost:3333", None).unwrap();
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3333/api/v1");
    }
}
