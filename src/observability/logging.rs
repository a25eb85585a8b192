//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config, overridable by `RUST_LOG`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Safe to call more than once; later calls report the existing subscriber

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter directive built from the configured level.
pub fn default_directive(config: &ObservabilityConfig) -> String {
    format!("frameroute={level},tower_http={level}", level = config.log_level)
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let (json, plain) = if config.json_logs {
        (Some(fmt::layer().json()), None)
    } else {
        (None, Some(fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init()
}

/// Install the subscriber, reporting on stderr when another one is already set.
///
/// Returns whether this call installed the subscriber.
pub fn init_logging_or_report(config: &ObservabilityConfig) -> bool {
    match init_logging(config) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("frameroute: logging left to the existing subscriber: {}", e);
            tracing::debug!(error = %e, "Tracing subscriber already installed");
            false
        }
    }
}
