//! Application state shared across handlers.

use std::sync::Arc;

use cardapio_client::external::NominatimClient;
use cardapio_client::{ApiClient, ApiError, RealtimeHub};

use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// backend client, the realtime hub and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    api: ApiClient,
    realtime: RealtimeHub,
    nominatim: NominatimClient,
}

impl AppState {
    /// Create a new application state and start the realtime hub.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client fails to build.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api)?;
        let realtime = RealtimeHub::spawn(&config.api);
        let nominatim = NominatimClient::new()?;
        Ok(Self::from_parts(config, api, realtime, nominatim))
    }

    /// Assemble state from already-built clients.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        api: ApiClient,
        realtime: RealtimeHub,
        nominatim: NominatimClient,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                realtime,
                nominatim,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the restaurant backend client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the realtime hub.
    #[must_use]
    pub fn realtime(&self) -> &RealtimeHub {
        &self.inner.realtime
    }

    /// Get a reference to the address search client.
    #[must_use]
    pub fn nominatim(&self) -> &NominatimClient {
        &self.inner.nominatim
    }
}
