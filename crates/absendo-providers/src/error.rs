//! Error types for calendar retrieval.
//!
//! [`ProviderError`] describes why a single retrieval failed (transport or
//! payload). [`CalendarFetchError`] is what the gateway surfaces, and only
//! when no cached copy could stand in.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Server returned an error (5xx status codes).
    ServerError,
    /// Calendar not found (404).
    NotFound,
    /// Rate limit exceeded - too many requests.
    RateLimited,
    /// The body arrived but is not a usable calendar.
    InvalidPayload,
    /// Configuration error - missing or invalid config.
    ConfigurationError,
    /// Internal error - unexpected state, bug.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::ServerError => "server_error",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::InvalidPayload => "invalid_payload",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error that occurred while retrieving or validating a calendar.
///
/// Cloneable: one in-flight retrieval hands the same result to every
/// waiting caller.
#[derive(Debug, Clone, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The source that generated this error (e.g., "http").
    provider: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidPayload, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Sets the source name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the underlying cause of this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the source name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Calendar data could not be fetched and no cached copy exists.
#[derive(Debug, Clone, Error)]
#[error("failed to fetch calendar data from {source_id}: {cause}")]
pub struct CalendarFetchError {
    source_id: String,
    #[source]
    cause: ProviderError,
}

impl CalendarFetchError {
    /// Creates a fetch error for the given source identifier.
    pub fn new(source_id: impl Into<String>, cause: ProviderError) -> Self {
        Self {
            source_id: source_id.into(),
            cause,
        }
    }

    /// Returns the calendar source identifier that failed.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Returns the retrieval error behind this failure.
    pub fn cause(&self) -> &ProviderError {
        &self.cause
    }

    /// Returns the error code of the underlying failure.
    pub fn code(&self) -> ProviderErrorCode {
        self.cause.code()
    }
}
