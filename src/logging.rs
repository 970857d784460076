//! Tracing subscriber setup shared by both binaries.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builds the filter from `RUST_LOG`, falling back to the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_lowercase()))
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_tracing(config: &LoggingConfig) {
    let (json, plain) = match config.format {
        LogFormat::Json => (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_target(true),
            ),
            None,
        ),
        LogFormat::Plain => (None, Some(tracing_subscriber::fmt::layer().with_target(true))),
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(json)
        .with(plain)
        .try_init();
}
