//! HTTP middleware stack for the webhook receiver.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Webhook ID (correlation ID per delivery)
//! 4. CORS (combined webhook route only)

pub mod webhook_id;

pub use webhook_id::webhook_id_middleware;
