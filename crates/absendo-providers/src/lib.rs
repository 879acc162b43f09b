//! Calendar fetching and lesson extraction.
//!
//! This crate turns a calendar URL and a day of absence into lessons:
//!
//! - [`CalendarFetchGateway`] - cached, deduplicated, concurrency-limited fetching
//! - [`CalendarSource`] - the retrieval backend ([`HttpCalendarSource`] in production)
//! - [`parse_ics_document`] - ICS text to [`RawCalendarDocument`]
//! - [`process_events`] - document and date to counted lessons
//!
//! # Architecture
//!
//! ```text
//!   calendar URL
//!        │
//!        ▼
//! ┌──────────────────────┐   fresh entry    ┌───────────────┐
//! │ CalendarFetchGateway │ ───────────────▶ │ DocumentCache │
//! └──────────┬───────────┘                  └───────────────┘
//!            │ in-flight dedup, FIFO permit
//!            ▼
//! ┌──────────────────────┐
//! │ CalendarSource::fetch│  (gateway substitution for proxied hosts)
//! └──────────┬───────────┘
//!            ▼ validate + parse_ics_document()
//!   ┌────────────────────┐
//!   │ RawCalendarDocument│
//!   └─────────┬──────────┘
//!             ▼ process_events()
//!   ┌────────────────────┐
//!   │ Vec<ProcessedEvent>│
//!   └────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use absendo_providers::{CalendarFetchGateway, FetchConfig, process_events};
//!
//! let gateway = CalendarFetchGateway::http(FetchConfig::default())?;
//! let document = gateway.fetch_calendar_data(url).await?;
//! let lessons = process_events(&document, absence_date);
//! ```

pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod ics;
pub mod source;

pub use cache::{CacheEntry, DocumentCache};
pub use config::{FetchConfig, ProxyConfig};
pub use document::{CalendarEntry, RawCalendarDocument};
pub use error::{CalendarFetchError, ProviderError, ProviderErrorCode, ProviderResult};
pub use extract::{
    filter_events_by_date, filter_events_by_date_in, process_events, process_events_in,
};
pub use gateway::CalendarFetchGateway;
pub use ics::{parse_ics_document, validate_payload};
pub use source::{BoxFuture, CalendarSource, ErrorSource, HttpCalendarSource};
