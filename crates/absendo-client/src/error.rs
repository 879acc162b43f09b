//! Client error types.

use absendo_providers::{CalendarFetchError, ProviderError};
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Provider setup error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The calendar could not be fetched and nothing was cached.
    #[error(transparent)]
    Fetch(#[from] CalendarFetchError),

    /// Output could not be rendered.
    #[error("output error: {0}")]
    Output(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Returns the process exit code for this error.
    ///
    /// `2` for configuration problems, `3` when the calendar is
    /// unavailable, `1` otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Fetch(_) | Self::Provider(_) => 3,
            Self::Output(_) | Self::Io(_) => 1,
        }
    }
}
