//! Cardápio Core - Shared types library.
//!
//! This crate provides the domain types used by every Cardápio component:
//! - `client` - REST and realtime client for the restaurant backend
//! - `storefront` - Public digital menu (cart, checkout, order tracking)
//! - `backoffice` - Managerial back-office and super-admin panel
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no sockets. This keeps it lightweight and easy to test.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, slugs, emails and statuses
//! - [`models`] - Backend records (companies, products, orders, cash sessions)
//! - [`cart`] - The customer's cart and checkout payload
//! - [`schedule`] - Structured opening hours
//! - [`gate`] - Which order types the menu accepts right now
//! - [`events`] / [`board`] - Realtime order events and their reconciliation
//! - [`search`] - List filtering

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod board;
pub mod cart;
pub mod events;
pub mod gate;
pub mod models;
pub mod schedule;
pub mod search;
pub mod types;

pub use board::{OrderBoard, TrackedOrder};
pub use cart::{Carrinho, CartItem, CheckoutError, ClienteInfo, DeliveryDetails, LineKey};
pub use events::{PedidoRef, RealtimeEvent, Room};
pub use gate::OrderGate;
pub use schedule::{Schedule, ScheduleError, ScheduleRule, WeekdaySet};
pub use types::*;
