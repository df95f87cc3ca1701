//! Structured Logger
//!
//! Wraps `tracing` with a console layer, an optional daily-rolling NDJSON
//! file, and environment-based level control.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prefix of the rolling log files: `oracare.log.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "oracare.log";

/// Initialize the global structured logger.
///
/// `RUST_LOG` wins over `level`. Without a `log_dir` only the console layer is
/// installed. Calling this twice is harmless; the second call is ignored.
pub fn init_logger(level: &str, log_dir: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // Console goes to stderr so command output on stdout stays clean.
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let file_layer = log_dir.map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let dir = std::env::temp_dir().join("oracare-logger-test");
        init_logger("debug", Some(&dir));
        init_logger("not a level ((", None);
        tracing::info!("still logging");
    }
}
