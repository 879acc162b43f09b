//! Cached, deduplicated and concurrency-limited calendar fetching.
//!
//! [`CalendarFetchGateway::fetch_calendar_data`] answers in this order:
//!
//! 1. a fresh cache entry, without touching the network;
//! 2. the result of a retrieval already underway for the same calendar;
//! 3. a new retrieval, admitted by a FIFO permit shared by all calendars.
//!
//! A failed retrieval falls back to the cached copy, however old. Only a
//! calendar that was never fetched successfully produces an error.
//!
//! The cache and the in-flight map sit behind one lock, so a caller either
//! sees the cached result of a retrieval or joins it, never neither. The
//! lock is never held across network I/O.
//!
//! Each retrieval runs in its own task. Callers that give up waiting do not
//! stop it: it still releases its permit, settles the cache and leaves the
//! in-flight map.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::Shared;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, warn};

use crate::cache::DocumentCache;
use crate::config::FetchConfig;
use crate::document::RawCalendarDocument;
use crate::error::{CalendarFetchError, ProviderError, ProviderResult};
use crate::ics::{parse_ics_document, validate_payload};
use crate::source::{BoxFuture, CalendarSource, HttpCalendarSource};

type FetchResult = Result<Arc<RawCalendarDocument>, ProviderError>;

/// A retrieval every caller for the same calendar awaits.
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

struct GatewayState {
    cache: DocumentCache,
    in_flight: HashMap<String, SharedFetch>,
}

struct Inner {
    source: Arc<dyn CalendarSource>,
    config: FetchConfig,
    permits: Semaphore,
    state: Mutex<GatewayState>,
}

/// Fetches calendar documents on behalf of many concurrent callers.
///
/// Cloning is cheap; clones share cache, in-flight retrievals and permits.
#[derive(Clone)]
pub struct CalendarFetchGateway {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CalendarFetchGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarFetchGateway")
            .field("source", &self.inner.source.name())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl CalendarFetchGateway {
    /// Creates a gateway over the given source.
    pub fn new(source: Arc<dyn CalendarSource>, config: FetchConfig) -> Self {
        let permits = Semaphore::new(config.max_concurrent_fetches.max(1));
        let state = GatewayState {
            cache: DocumentCache::new(config.cache_ttl),
            in_flight: HashMap::new(),
        };

        Self {
            inner: Arc::new(Inner {
                source,
                config,
                permits,
                state: Mutex::new(state),
            }),
        }
    }

    /// Creates a gateway fetching over HTTP.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn http(config: FetchConfig) -> ProviderResult<Self> {
        let source = HttpCalendarSource::new(&config)?;
        Ok(Self::new(Arc::new(source), config))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.inner.config
    }

    /// Returns the parsed calendar for `source_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarFetchError`] when retrieval or validation fails and
    /// no cached copy exists.
    pub async fn fetch_calendar_data(
        &self,
        source_id: &str,
    ) -> Result<Arc<RawCalendarDocument>, CalendarFetchError> {
        let fetch = {
            let mut state = self.inner.state.lock().await;

            if let Some(entry) = state.cache.get_fresh(source_id) {
                debug!(source = %source_id, age_secs = entry.age().as_secs(), "Serving calendar from cache");
                return Ok(Arc::clone(&entry.document));
            }

            match state.in_flight.get(source_id) {
                Some(fetch) => {
                    debug!(source = %source_id, "Joining in-flight calendar fetch");
                    fetch.clone()
                }
                None => {
                    let fetch = spawn_retrieval(Arc::clone(&self.inner), source_id.to_string());
                    state
                        .in_flight
                        .insert(source_id.to_string(), fetch.clone());
                    fetch
                }
            }
        };

        fetch
            .await
            .map_err(|cause| CalendarFetchError::new(source_id, cause))
    }

    /// Returns when the cached copy of `source_id` was fetched, if any.
    pub async fn cached_at(&self, source_id: &str) -> Option<DateTime<Utc>> {
        let state = self.inner.state.lock().await;
        state.cache.get(source_id).map(|entry| entry.fetched_at_utc)
    }

    /// Drops the cached copy of `source_id`. Returns true if one existed.
    pub async fn invalidate(&self, source_id: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        state.cache.remove(source_id).is_some()
    }

    /// Drops all cached copies.
    pub async fn clear_cache(&self) {
        self.inner.state.lock().await.cache.clear();
    }

    /// Drops stale cached copies, returning how many were removed.
    ///
    /// Evicted calendars lose their fallback copy.
    pub async fn evict_expired(&self) -> usize {
        self.inner.state.lock().await.cache.evict_expired()
    }

    /// Returns the number of retrievals currently underway.
    pub async fn in_flight_count(&self) -> usize {
        self.inner.state.lock().await.in_flight.len()
    }
}

/// Starts a retrieval task and returns a handle all callers can await.
fn spawn_retrieval(inner: Arc<Inner>, source_id: String) -> SharedFetch {
    let task = tokio::spawn(retrieve(Arc::clone(&inner), source_id.clone()));

    async move {
        match task.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(source = %source_id, error = %join_err, "Calendar fetch task failed");
                inner.state.lock().await.in_flight.remove(&source_id);
                Err(ProviderError::internal(format!(
                    "calendar fetch task failed: {}",
                    join_err
                )))
            }
        }
    }
    .boxed()
    .shared()
}

/// Runs one retrieval and settles it: cache on success, stale copy on
/// failure. The in-flight entry is removed under the same lock.
async fn retrieve(inner: Arc<Inner>, source_id: String) -> FetchResult {
    let result = download(&inner, &source_id).await;

    let mut state = inner.state.lock().await;
    state.in_flight.remove(&source_id);

    match result {
        Ok(document) => {
            let document = Arc::new(document);
            state.cache.insert(source_id, Arc::clone(&document));
            Ok(document)
        }
        Err(err) => match state.cache.get(&source_id) {
            Some(entry) => {
                warn!(
                    source = %source_id,
                    error = %err,
                    age_secs = entry.age().as_secs(),
                    "Calendar fetch failed, serving stale cached copy"
                );
                Ok(Arc::clone(&entry.document))
            }
            None => {
                error!(source = %source_id, error = %err, "Calendar fetch failed");
                Err(err)
            }
        },
    }
}

/// Fetches, validates and parses one calendar while holding a permit for
/// the network part only.
async fn download(inner: &Inner, source_id: &str) -> ProviderResult<RawCalendarDocument> {
    let url = inner.config.request_url(source_id);

    let body = {
        let _permit = inner
            .permits
            .acquire()
            .await
            .map_err(|_| ProviderError::internal("fetch limiter closed"))?;
        debug!(source = %source_id, proxied = (url != source_id), "Fetching calendar");
        inner.source.fetch(&url).await?
    };

    validate_payload(&body, &inner.config)?;
    parse_ics_document(&body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::error::ProviderErrorCode;
    use crate::source::ErrorSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ICS: &str = "BEGIN:VCALENDAR\r\n\
                       VERSION:2.0\r\n\
                       PRODID:-//Test//DE\r\n\
                       BEGIN:VEVENT\r\n\
                       UID:lesson-1\r\n\
                       DTSTART:20240115T072000Z\r\n\
                       SUMMARY:M-MEI\r\n\
                       END:VEVENT\r\n\
                       END:VCALENDAR\r\n";

    /// Counts calls and simultaneous fetches; answers after `delay`.
    struct MockSource {
        response: std::sync::Mutex<ProviderResult<String>>,
        delay: Duration,
        calls: AtomicUsize,
        active: AtomicUsize,
        max_active: AtomicUsize,
        urls: std::sync::Mutex<Vec<String>>,
    }

    impl MockSource {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                response: std::sync::Mutex::new(Ok(ICS.to_string())),
                delay,
                calls: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
                urls: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn respond(&self, response: ProviderResult<String>) {
            *self.response.lock().unwrap() = response;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl CalendarSource for MockSource {
        fn name(&self) -> &str {
            "mock"
        }

        fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ProviderResult<String>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.urls.lock().unwrap().push(url.to_string());
                let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_active.fetch_max(active, Ordering::SeqCst);

                tokio::time::sleep(self.delay).await;

                self.active.fetch_sub(1, Ordering::SeqCst);
                self.response.lock().unwrap().clone()
            })
        }
    }

    fn gateway(source: &Arc<MockSource>, config: FetchConfig) -> CalendarFetchGateway {
        CalendarFetchGateway::new(Arc::clone(source) as Arc<dyn CalendarSource>, config)
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_fetch() {
        let source = MockSource::new(Duration::from_secs(1));
        let gw = gateway(&source, FetchConfig::default());

        let results = futures_util::future::join_all(
            (0..10).map(|_| gw.fetch_calendar_data("https://example.com/cal.ics")),
        )
        .await;

        assert_eq!(source.calls(), 1);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.event_count(), 1);
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
        }
        assert_eq!(gw.in_flight_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_serves_until_ttl() {
        let source = MockSource::new(Duration::ZERO);
        let gw = gateway(&source, FetchConfig::default());
        let url = "https://example.com/cal.ics";

        gw.fetch_calendar_data(url).await.unwrap();
        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        gw.fetch_calendar_data(url).await.unwrap();
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_secs(6 * 60)).await;
        gw.fetch_calendar_data(url).await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_limit_holds_across_calendars() {
        let source = MockSource::new(Duration::from_millis(500));
        let gw = gateway(
            &source,
            FetchConfig::default().with_max_concurrent_fetches(2),
        );

        let urls: Vec<String> = (0..8)
            .map(|i| format!("https://example.com/cal-{}.ics", i))
            .collect();
        let results =
            futures_util::future::join_all(urls.iter().map(|u| gw.fetch_calendar_data(u))).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(source.calls(), 8);
        assert_eq!(source.max_active.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_serves_stale_copy() {
        let source = MockSource::new(Duration::ZERO);
        let gw = gateway(
            &source,
            FetchConfig::default().with_cache_ttl(Duration::from_secs(15 * 60)),
        );
        let url = "https://example.com/cal.ics";

        let fresh = gw.fetch_calendar_data(url).await.unwrap();
        let fetched_at = gw.cached_at(url).await;
        assert!(fetched_at.is_some());

        source.respond(Err(ProviderError::network("connection reset")));
        tokio::time::advance(Duration::from_secs(20 * 60)).await;

        let stale = gw.fetch_calendar_data(url).await.unwrap();
        assert_eq!(source.calls(), 2);
        assert!(Arc::ptr_eq(&fresh, &stale));
        assert_eq!(gw.cached_at(url).await, fetched_at);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_payload_serves_stale_copy() {
        let source = MockSource::new(Duration::ZERO);
        let gw = gateway(&source, FetchConfig::default());
        let url = "https://example.com/cal.ics";

        let fresh = gw.fetch_calendar_data(url).await.unwrap();
        source.respond(Ok(format!("UID NOT FOUND{}", " ".repeat(60))));
        tokio::time::advance(Duration::from_secs(16 * 60)).await;

        let stale = gw.fetch_calendar_data(url).await.unwrap();
        assert!(Arc::ptr_eq(&fresh, &stale));
    }

    #[tokio::test]
    async fn failure_without_cache_is_an_error() {
        let gw = CalendarFetchGateway::new(Arc::new(ErrorSource::offline()), FetchConfig::default());

        let err = gw
            .fetch_calendar_data("https://example.com/cal.ics")
            .await
            .unwrap_err();
        assert_eq!(err.source_id(), "https://example.com/cal.ics");
        assert_eq!(err.code(), ProviderErrorCode::NetworkError);
        assert_eq!(gw.in_flight_count().await, 0);
    }

    #[tokio::test]
    async fn invalid_payload_without_cache_is_an_error() {
        let source = MockSource::new(Duration::ZERO);
        source.respond(Ok("ERROR".to_string()));
        let gw = gateway(&source, FetchConfig::default());

        let err = gw
            .fetch_calendar_data("https://example.com/cal.ics")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidPayload);
    }

    #[tokio::test]
    async fn proxied_hosts_are_rewritten_but_cached_by_original_id() {
        let source = MockSource::new(Duration::ZERO);
        let config = FetchConfig::default()
            .with_proxy(ProxyConfig::new("https://api.example.com/proxy").unwrap());
        let gw = gateway(&source, config);

        let proxied = "https://schulnetz.lu.ch/cal?id=1";
        let direct = "https://example.com/cal.ics";
        gw.fetch_calendar_data(proxied).await.unwrap();
        gw.fetch_calendar_data(direct).await.unwrap();

        let urls = source.urls.lock().unwrap().clone();
        assert_eq!(
            urls,
            vec![
                "https://api.example.com/proxy?url=https%3A%2F%2Fschulnetz.lu.ch%2Fcal%3Fid%3D1"
                    .to_string(),
                direct.to_string(),
            ]
        );
        assert!(gw.cached_at(proxied).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let source = MockSource::new(Duration::ZERO);
        let gw = gateway(&source, FetchConfig::default());
        let url = "https://example.com/cal.ics";

        gw.fetch_calendar_data(url).await.unwrap();
        assert!(gw.invalidate(url).await);
        assert!(!gw.invalidate(url).await);
        gw.fetch_calendar_data(url).await.unwrap();
        assert_eq!(source.calls(), 2);

        gw.clear_cache().await;
        assert!(gw.cached_at(url).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn evict_expired_drops_fallback() {
        let source = MockSource::new(Duration::ZERO);
        let gw = gateway(&source, FetchConfig::default());
        let url = "https://example.com/cal.ics";

        gw.fetch_calendar_data(url).await.unwrap();
        tokio::time::advance(Duration::from_secs(16 * 60)).await;
        assert_eq!(gw.evict_expired().await, 1);

        source.respond(Err(ProviderError::server("maintenance")));
        assert!(gw.fetch_calendar_data(url).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_fetch_releases_its_permit() {
        let source = MockSource::new(Duration::from_secs(1));
        let gw = gateway(&source, FetchConfig::default().with_max_concurrent_fetches(1));
        let first = "https://example.com/cal-a.ics";
        let second = "https://example.com/cal-b.ics";

        let abandoned =
            tokio::time::timeout(Duration::from_millis(100), gw.fetch_calendar_data(first)).await;
        assert!(abandoned.is_err());

        let other =
            tokio::time::timeout(Duration::from_secs(3600), gw.fetch_calendar_data(second)).await;
        assert!(other.is_ok_and(|result| result.is_ok()));

        assert_eq!(source.calls(), 2);
        assert_eq!(source.max_active.load(Ordering::SeqCst), 1);
        assert!(gw.cached_at(first).await.is_some());
        assert_eq!(gw.in_flight_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_fetch_is_joined_by_next_caller() {
        let source = MockSource::new(Duration::from_secs(1));
        let gw = gateway(&source, FetchConfig::default());
        let url = "https://example.com/cal.ics";

        let abandoned =
            tokio::time::timeout(Duration::from_millis(100), gw.fetch_calendar_data(url)).await;
        assert!(abandoned.is_err());
        assert_eq!(gw.in_flight_count().await, 1);

        gw.fetch_calendar_data(url).await.unwrap();
        assert_eq!(source.calls(), 1);
        assert_eq!(gw.in_flight_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_fetch_settles_without_callers() {
        let source = MockSource::new(Duration::from_secs(1));
        let gw = gateway(&source, FetchConfig::default());
        let url = "https://example.com/cal.ics";

        let abandoned =
            tokio::time::timeout(Duration::from_millis(100), gw.fetch_calendar_data(url)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(gw.in_flight_count().await, 0);
        assert!(gw.cached_at(url).await.is_some());

        gw.fetch_calendar_data(url).await.unwrap();
        assert_eq!(source.calls(), 1);
    }
}
