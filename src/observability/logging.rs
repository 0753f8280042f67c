//! # Structured Logging
//!
//! Installs the global `tracing` subscriber. The filter comes from `RUST_LOG`
//! when present, otherwise from the configured level; output is either JSON
//! lines (the default, suited to hosted log collectors) or human readable text.

use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::core::error::{GatewayError, GatewayResult};
use crate::observability::config::{LogConfig, LogFormat};

/// Build the env filter, preferring `RUST_LOG` over the configured level
pub fn build_filter(config: &LogConfig) -> GatewayResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            GatewayError::config(format!("Invalid log level '{}': {}", config.level, e))
        }),
    }
}

/// Initialize the global subscriber.
///
/// Calling this twice is harmless: the second call logs a warning and keeps the
/// subscriber that is already installed.
pub fn init_logging(config: &LogConfig, service_name: &str) -> GatewayResult<()> {
    let filter = build_filter(config)?;

    let result = match config.format {
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init(),
        LogFormat::Text => Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
    };

    if result.is_err() {
        warn!("Tracing subscriber already initialized, skipping initialization");
        return Ok(());
    }

    info!(
        service = service_name,
        format = ?config.format,
        "Structured logging initialized"
    );
    Ok(())
}
