//! Cardápio Client - backend access for the Cardápio binaries.
//!
//! - [`ApiClient`] - REST client for the restaurant backend (`/api/v1`)
//! - [`realtime`] - socket.io hub delivering order events to live views
//! - [`external`] - Nominatim address search and BrasilAPI CNPJ lookup
//!
//! # Example
//!
//! ```rust,ignore
//! use cardapio_client::{ApiClient, ApiConfig};
//!
//! let config = ApiConfig::new("https://api.cardapio.app", None)?;
//! let client = ApiClient::new(&config)?;
//! let empresa = client.empresa_por_slug("bar-do-ze").await?;
//! let produtos = client.cardapio(empresa.slug.as_str()).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod api;
mod client;
pub mod config;
pub mod error;
pub mod external;
pub mod realtime;

pub use client::{ApiClient, BearerToken};
pub use config::ApiConfig;
pub use error::ApiError;
pub use realtime::{RealtimeHub, Subscription, SubscriptionError};
