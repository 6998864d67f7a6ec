//! Storefront-local models. Domain records live in `cardapio-core`.

pub mod session;

pub use session::{Flash, FlashKind, keys as session_keys};
