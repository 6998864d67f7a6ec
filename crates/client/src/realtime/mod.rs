//! Realtime order updates over the backend's socket.io channel.

mod hub;
pub mod protocol;

pub use hub::{HubClosed, RealtimeHub, Subscription, SubscriptionError};
