//! Logging setup for the `absendo` binary.
//!
//! The library crates only emit `tracing` events; the binary installs one
//! stderr subscriber through [`init_tracing`], keeping stdout for lessons.

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter target shared by all absendo crates.
const FILTER_TARGET: &str = "absendo";

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for absendo crates when RUST_LOG is not set
    pub default_level: Level,
    /// Show source location and target of each event
    pub verbose: bool,
    /// Explicit filter directive, takes precedence over RUST_LOG
    pub env_filter: Option<String>,
}

impl TracingConfig {
    /// Warnings only; debug events with their location when `verbose`.
    #[must_use]
    pub fn cli(verbose: bool) -> Self {
        Self {
            default_level: if verbose { Level::DEBUG } else { Level::WARN },
            verbose,
            env_filter: None,
        }
    }

    /// Set a custom env filter directive
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.env_filter {
            Some(ref filter) => Ok(EnvFilter::try_new(filter)?),
            None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("{}={}", FILTER_TARGET, self.default_level))
            })),
        }
    }
}

/// Installs the global subscriber. Call once at startup.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set or if the filter
/// directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let layer = fmt::layer()
        .compact()
        .without_time()
        .with_writer(std::io::stderr)
        .with_file(config.verbose)
        .with_line_number(config.verbose)
        .with_target(config.verbose);

    let subscriber = tracing_subscriber::registry()
        .with(config.build_filter()?)
        .with(layer);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}
