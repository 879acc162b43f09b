//! Calendar fetch configuration.

use std::time::Duration;

use url::Url;

/// Rewrites selected calendar URLs through a fixed proxy endpoint.
///
/// A source identifier containing `host_pattern` is requested as
/// `<endpoint>?url=<percent-encoded identifier>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy endpoint.
    pub endpoint: Url,
    /// Substring of the source identifier that triggers the rewrite.
    pub host_pattern: String,
}

impl ProxyConfig {
    /// Default host pattern: the cantonal school network.
    pub const DEFAULT_HOST_PATTERN: &'static str = "schulnetz.lu.ch";

    /// Creates a proxy configuration with the default host pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL.
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self, url::ParseError> {
        Ok(Self {
            endpoint: Url::parse(endpoint.as_ref())?,
            host_pattern: Self::DEFAULT_HOST_PATTERN.to_string(),
        })
    }

    /// Sets the host pattern.
    pub fn with_host_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.host_pattern = pattern.into();
        self
    }

    /// Returns true if requests for this source go through the proxy.
    pub fn applies_to(&self, source_id: &str) -> bool {
        !self.host_pattern.is_empty() && source_id.contains(&self.host_pattern)
    }

    /// Returns the proxied request URL for a source identifier.
    pub fn rewrite(&self, source_id: &str) -> String {
        format!(
            "{}?url={}",
            self.endpoint.as_str(),
            urlencoding::encode(source_id)
        )
    }
}

/// Configuration for [`CalendarFetchGateway`](crate::CalendarFetchGateway)
/// and [`HttpCalendarSource`](crate::HttpCalendarSource).
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// How long a fetched calendar is served from cache.
    pub cache_ttl: Duration,

    /// Maximum simultaneous outbound fetches across all calendars.
    pub max_concurrent_fetches: usize,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Payloads shorter than this are rejected.
    pub min_payload_len: usize,

    /// Payloads containing any of these markers are rejected.
    pub error_markers: Vec<String>,

    /// Optional proxy for selected hosts.
    pub proxy: Option<ProxyConfig>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(Self::DEFAULT_CACHE_TTL_SECS),
            max_concurrent_fetches: Self::DEFAULT_MAX_CONCURRENT_FETCHES,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("absendo/{}", env!("CARGO_PKG_VERSION")),
            min_payload_len: Self::DEFAULT_MIN_PAYLOAD_LEN,
            error_markers: Self::DEFAULT_ERROR_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            proxy: None,
        }
    }
}

impl FetchConfig {
    /// Default cache TTL: 15 minutes.
    pub const DEFAULT_CACHE_TTL_SECS: u64 = 15 * 60;

    /// Default number of simultaneous fetches.
    pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default minimum payload length in bytes.
    pub const DEFAULT_MIN_PAYLOAD_LEN: usize = 50;

    /// Markers the school network returns instead of a calendar.
    pub const DEFAULT_ERROR_MARKERS: &'static [&'static str] = &["UID NOT FOUND", "ERROR"];

    /// Sets the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the concurrency limit. Values below one are raised to one.
    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max.max(1);
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the minimum payload length.
    pub fn with_min_payload_len(mut self, len: usize) -> Self {
        self.min_payload_len = len;
        self
    }

    /// Replaces the error markers.
    pub fn with_error_markers(mut self, markers: Vec<String>) -> Self {
        self.error_markers = markers;
        self
    }

    /// Sets the proxy.
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Returns the URL to request for a source identifier.
    ///
    /// Identifiers matching the proxy's host pattern are rewritten; all
    /// others pass through unchanged.
    pub fn request_url(&self, source_id: &str) -> String {
        match self.proxy {
            Some(ref proxy) if proxy.applies_to(source_id) => proxy.rewrite(source_id),
            _ => source_id.to_string(),
        }
    }
}
