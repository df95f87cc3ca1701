//! Structured logging for OraCare.
//!
//! Handles log redaction, JSON file output, and daily file rotation.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_sensitive_data;
