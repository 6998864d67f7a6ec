//! Application state shared across handlers.

use std::sync::Arc;

use cardapio_client::external::CnpjClient;
use cardapio_client::{ApiClient, ApiError, RealtimeHub};

use crate::config::BackofficeConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BackofficeConfig,
    api: ApiClient,
    realtime: RealtimeHub,
    cnpj: CnpjClient,
}

impl AppState {
    /// Create a new application state and start the realtime hub.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client fails to build.
    pub fn new(config: BackofficeConfig) -> Result<Self, ApiError> {
        let api = ApiClient::new(&config.api)?;
        let realtime = RealtimeHub::spawn(&config.api);
        let cnpj = CnpjClient::new()?;
        Ok(Self::from_parts(config, api, realtime, cnpj))
    }

    /// Assemble state from already-built clients.
    #[must_use]
    pub fn from_parts(
        config: BackofficeConfig,
        api: ApiClient,
        realtime: RealtimeHub,
        cnpj: CnpjClient,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                realtime,
                cnpj,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &BackofficeConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn realtime(&self) -> &RealtimeHub {
        &self.inner.realtime
    }

    /// Company registry lookup used by the super-admin form.
    #[must_use]
    pub fn cnpj(&self) -> &CnpjClient {
        &self.inner.cnpj
    }
}
