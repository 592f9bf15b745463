//! Shopify Insights webhook receiver.
//!
//! Accepts signed Shopify webhooks, verifies them over the raw body and
//! projects orders, customers, products and carts into a record store.
//!
//! # Request flow
//!
//! ```text
//! request -> signature -> dispatch (topic) -> handler -> store
//!                                                  \-> refresh notifier (orders/updated)
//! ```
//!
//! The binary in `main.rs` wires this library to `PostgreSQL`; tests use
//! [`store::MemoryRecordStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod payloads;
pub mod refresh;
pub mod routes;
pub mod signature;
pub mod state;
pub mod store;

pub use config::WebhookConfig;
pub use error::WebhookError;
pub use routes::app;
pub use state::AppState;
