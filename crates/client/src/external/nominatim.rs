//! OpenStreetMap Nominatim address search for delivery checkout.
//!
//! Nominatim's usage policy requires an identifying User-Agent and at most
//! one request per second; the storefront only calls it from a
//! rate-limited route.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::ApiError;

/// Public Nominatim instance.
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// An address candidate shown under the checkout address field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSuggestion {
    pub descricao: String,
    pub rua: Option<String>,
    pub numero: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    display_name: String,
    lat: String,
    lon: String,
    #[serde(default)]
    address: SearchAddress,
}

#[derive(Debug, Default, Deserialize)]
struct SearchAddress {
    road: Option<String>,
    house_number: Option<String>,
    suburb: Option<String>,
    neighbourhood: Option<String>,
    city: Option<String>,
    town: Option<String>,
}

impl TryFrom<SearchResult> for AddressSuggestion {
    type Error = ApiError;

    fn try_from(result: SearchResult) -> Result<Self, Self::Error> {
        let coord = |raw: &str| {
            raw.parse::<f64>()
                .map_err(|e| ApiError::Parse(format!("Invalid coordinate {raw}: {e}")))
        };
        Ok(Self {
            lat: coord(&result.lat)?,
            lng: coord(&result.lon)?,
            descricao: result.display_name,
            rua: result.address.road,
            numero: result.address.house_number,
            bairro: result.address.suburb.or(result.address.neighbourhood),
            cidade: result.address.city.or(result.address.town),
        })
    }
}

/// Nominatim search client.
#[derive(Clone, Debug)]
pub struct NominatimClient {
    inner: Arc<NominatimInner>,
}

#[derive(Debug)]
struct NominatimInner {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    /// Create a client against the public instance.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(NOMINATIM_URL)
    }

    /// Create a client against another Nominatim-compatible server.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("cardapio/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            inner: Arc::new(NominatimInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Search Brazilian addresses matching free text.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response does not parse.
    #[instrument(skip(self))]
    pub async fn buscar(&self, consulta: &str, limite: u8) -> Result<Vec<AddressSuggestion>, ApiError> {
        let consulta = consulta.trim();
        if consulta.len() < 3 {
            return Ok(Vec::new());
        }
        let limite = limite.clamp(1, 10).to_string();
        let response = self
            .inner
            .client
            .get(format!("{}/search", self.inner.base_url))
            .query(&[
                ("q", consulta),
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("countrycodes", "br"),
                ("limit", limite.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: String::new(),
            });
        }

        let results: Vec<SearchResult> = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Failed to parse Nominatim response: {e}")))?;
        results.into_iter().map(AddressSuggestion::try_from).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_result_conversion() {
        let json = r#"{
            "display_name": "Rua da Bahia, 1000, Centro, Belo Horizonte",
            "lat": "-19.9227",
            "lon": "-43.9386",
            "address": {"road": "Rua da Bahia", "house_number": "1000",
                        "neighbourhood": "Centro", "town": "Belo Horizonte"}
        }"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        let suggestion = AddressSuggestion::try_from(result).unwrap();
        assert_eq!(suggestion.bairro.as_deref(), Some("Centro"));
        assert_eq!(suggestion.cidade.as_deref(), Some("Belo Horizonte"));
        assert!((suggestion.lat + 19.9227).abs() < 1e-9);
    }

    #[test]
    fn test_bad_coordinates_are_parse_errors() {
        let json = r#"{"display_name": "x", "lat": "abc", "lon": "1"}"#;
        let result: SearchResult = serde_json::from_str(json).unwrap();
        assert!(matches!(AddressSuggestion::try_from(result), Err(ApiError::Parse(_))));
    }

    #[tokio::test]
    async fn test_short_queries_skip_the_network() {
        let client = NominatimClient::with_base_url("http://127.0.0.1:9").unwrap();
        assert!(client.buscar(" ab ", 5).await.unwrap().is_empty());
    }
}
