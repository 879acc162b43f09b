//! Calendar retrieval backends.
//!
//! A [`CalendarSource`] turns a request URL into the raw calendar body.
//! Validation, parsing, caching and deduplication happen in the gateway,
//! so a source only speaks the transport.

use std::future::Future;
use std::pin::Pin;

use reqwest::{Client, Response, StatusCode};
use tracing::{debug, trace, warn};

use crate::config::FetchConfig;
use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Retrieves raw calendar bodies.
///
/// # Example Implementation
///
/// ```ignore
/// struct FileSource(PathBuf);
///
/// impl CalendarSource for FileSource {
///     fn name(&self) -> &str { "file" }
///
///     fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
///         Box::pin(async move {
///             tokio::fs::read_to_string(&self.0)
///                 .await
///                 .map_err(|e| ProviderError::network(e.to_string()))
///         })
///     }
/// }
/// ```
pub trait CalendarSource: Send + Sync {
    /// Returns the name of this source (e.g., "http").
    fn name(&self) -> &str;

    /// Fetches the body served at `url`.
    ///
    /// # Errors
    ///
    /// Returns a transport-level `ProviderError` when no body could be
    /// retrieved.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ProviderResult<String>>;
}

/// Fetches calendars over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpCalendarSource {
    client: Client,
}

impl HttpCalendarSource {
    /// Creates an HTTP source with the timeout and user agent of `config`.
    pub fn new(config: &FetchConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("Failed to create HTTP client: {}", e))
                    .with_provider("http")
                    .with_source(e)
            })?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> ProviderResult<String> {
        trace!(url = %url, "Sending calendar request");

        let response = self.client.get(url).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("Request timed out: {}", e)
            } else {
                format!("Request failed: {}", e)
            };
            ProviderError::network(message).with_source(e)
        })?;

        let body = handle_response(response).await?;
        debug!(url = %url, bytes = body.len(), "Calendar fetched");
        Ok(body)
    }
}

impl CalendarSource for HttpCalendarSource {
    fn name(&self) -> &str {
        "http"
    }

    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.get(url)
                .await
                .map_err(|e| e.with_provider(self.name()))
        })
    }
}

/// Maps the HTTP status to a body or an error.
async fn handle_response(response: Response) -> ProviderResult<String> {
    let status = response.status();
    trace!(status = %status, "Received response");

    match status {
        s if s.is_success() => response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("Failed to read response: {}", e))),
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            Err(ProviderError::not_found("Calendar not found"))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            Err(ProviderError::rate_limited("Too many requests to server"))
        }
        s if s.is_server_error() => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::server(format!(
                "Server error ({}): {}",
                s, body
            )))
        }
        s => {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %s, body = %body, "Unexpected response status");
            Err(ProviderError::network(format!(
                "Unexpected status {}: {}",
                s, body
            )))
        }
    }
}

/// A source that fails every request with the same error.
///
/// With it the gateway answers from its cache only, e.g. while offline.
#[derive(Debug, Clone)]
pub struct ErrorSource {
    code: ProviderErrorCode,
    message: String,
}

impl ErrorSource {
    /// Creates a source failing with `code` and `message`.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates a source reporting that the network is unavailable.
    pub fn offline() -> Self {
        Self::new(ProviderErrorCode::NetworkError, "network access disabled")
    }
}

impl CalendarSource for ErrorSource {
    fn name(&self) -> &str {
        "error"
    }

    fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
        let err = ProviderError::new(self.code, self.message.clone()).with_provider(self.name());
        Box::pin(async move { Err(err) })
    }
}
