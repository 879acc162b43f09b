//! ICS/iCalendar payload validation and parsing.
//!
//! School calendar endpoints answer expired or unknown links with a short
//! plain-text error and a success status, so payloads are checked before
//! they are parsed into a [`RawCalendarDocument`].

use absendo_core::EventStart;
use chrono::TimeZone;
use chrono_tz::Tz;
use icalendar::{Calendar, CalendarComponent, Component, DatePerhapsTime, Event, EventLike};
use tracing::{debug, trace, warn};

use crate::config::FetchConfig;
use crate::document::{CalendarEntry, RawCalendarDocument};
use crate::error::{ProviderError, ProviderResult};

/// Number of payload characters quoted in logs.
const PREVIEW_CHARS: usize = 200;

/// Rejects payloads that are too short or carry a known error marker.
pub fn validate_payload(payload: &str, config: &FetchConfig) -> ProviderResult<()> {
    if payload.len() < config.min_payload_len {
        warn!(
            length = payload.len(),
            min = config.min_payload_len,
            "Received calendar payload is too short"
        );
        return Err(ProviderError::invalid_payload(format!(
            "calendar payload is too short ({} bytes); the calendar URL may be expired or incorrect",
            payload.len()
        )));
    }

    if let Some(marker) = config
        .error_markers
        .iter()
        .find(|marker| payload.contains(marker.as_str()))
    {
        warn!(
            marker = %marker,
            preview = %preview(payload),
            "Received calendar payload with error marker"
        );
        return Err(ProviderError::invalid_payload(format!(
            "calendar payload contains error marker {:?}; the calendar URL may be expired or incorrect",
            marker
        )));
    }

    Ok(())
}

/// Parses ICS content into a document.
///
/// Entries keep their feed order. Events without a readable start are kept
/// with `start: None` and skipped later by extraction.
pub fn parse_ics_document(ics: &str) -> ProviderResult<RawCalendarDocument> {
    let calendar = ics.parse::<Calendar>().map_err(|e| {
        warn!(error = %e, preview = %preview(ics), "Failed to parse ICS content");
        ProviderError::invalid_payload(format!("failed to parse calendar data: {}", e))
    })?;

    let document: RawCalendarDocument = calendar
        .iter()
        .map(|component| match component {
            CalendarComponent::Event(event) => parse_event(event),
            CalendarComponent::Todo(_) => CalendarEntry::Other {
                name: "VTODO".to_string(),
            },
            _ => CalendarEntry::Other {
                name: "OTHER".to_string(),
            },
        })
        .collect();

    if document.event_count() == 0 {
        warn!("No events found in calendar data");
    }
    debug!(
        entries = document.len(),
        events = document.event_count(),
        "Calendar data parsed"
    );

    Ok(document)
}

/// Converts a VEVENT into a calendar entry.
fn parse_event(event: &Event) -> CalendarEntry {
    let uid = event.get_uid().map(str::to_string);
    let start = event.get_start().map(convert_start);
    let summary = event.get_summary().map(str::to_string);

    trace!(uid = ?uid, summary = ?summary, start = ?start, "Parsed event from ICS");

    CalendarEntry::Event {
        uid,
        start,
        summary,
    }
}

/// Converts an icalendar start value.
///
/// `TZID`-bound times become instants. An unknown zone name, or a time
/// skipped by a DST change, leaves the wall-clock time as is.
fn convert_start(dt: DatePerhapsTime) -> EventStart {
    use icalendar::CalendarDateTime;

    match dt {
        DatePerhapsTime::Date(date) => EventStart::Date(date),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => EventStart::DateTime(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            EventStart::Floating(naive)
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let Ok(tz) = tzid.parse::<Tz>() else {
                debug!(tzid = %tzid, "Unknown TZID, keeping wall-clock start");
                return EventStart::Floating(date_time);
            };
            match tz.from_local_datetime(&date_time).earliest() {
                Some(local) => EventStart::from_local(local),
                None => EventStart::Floating(date_time),
            }
        }
    }
}

fn preview(payload: &str) -> String {
    payload.chars().take(PREVIEW_CHARS).collect()
}
