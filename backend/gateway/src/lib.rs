//! OraCare Gateway HTTP API Server
//!
//! Accepts an image URL, asks the configured vision model about it, and
//! returns the scraped `{summary, confidence, recommendations}`.

pub mod analyze;
pub mod health;
pub mod server;

pub use server::{build_router, start_server, GatewayState};
