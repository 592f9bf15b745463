//! Shopify Insights Core - Shared types library.
//!
//! This crate provides the types shared by the Shopify Insights components:
//! - `webhooks` - Signed webhook receivers that project Shopify events into Postgres
//! - `cli` - Command-line tools for migrations and payload signing
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for external IDs, money amounts and statuses
//! - [`records`] - The simplified projections persisted for each resource

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod records;
pub mod types;

pub use records::*;
pub use types::*;
