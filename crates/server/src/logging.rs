//! `tracing` subscriber setup.
//!
//! stdout carries MCP frames, so every layer writes to stderr.

use crate::config::LogFormat;
use crate::error::{Result, ServerError};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{EnvFilter, fmt};

/// Build the filter from a directive string, e.g. `info` or `khipu_openapi_nav=debug,info`.
///
/// # Errors
///
/// Returns an error if the directives do not parse.
pub fn env_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| ServerError::Logging(format!("invalid log filter '{directives}': {e}")))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already installed.
pub fn init(directives: &str, format: LogFormat) -> Result<()> {
    let filter = env_filter(directives)?;
    let registry = tracing_subscriber::registry().with(filter);

    let res = match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .try_init(),
    };
    res.map_err(|e| ServerError::Logging(e.to_string()))
}
