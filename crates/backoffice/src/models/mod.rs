//! Back-office domain models.

pub mod session;

pub use session::{CurrentUser, Flash, FlashKind, keys as session_keys};
