//! Parsed calendar feed.
//!
//! A [`RawCalendarDocument`] is the feed as a list of entries in file
//! order. Only events matter for lesson extraction; every other component
//! is kept as [`CalendarEntry::Other`] so counts and logs stay honest.

use absendo_core::EventStart;
use serde::{Deserialize, Serialize};

/// One component of a calendar feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarEntry {
    /// A `VEVENT`.
    Event {
        /// Event UID, if present.
        uid: Option<String>,
        /// Start of the event, if present and readable.
        start: Option<EventStart>,
        /// Title of the event.
        summary: Option<String>,
    },
    /// Any other component (todo, venue, ...).
    Other {
        /// Component name as found in the feed.
        name: String,
    },
}

impl CalendarEntry {
    /// Creates an event entry.
    pub fn event(start: Option<EventStart>, summary: Option<impl Into<String>>) -> Self {
        Self::Event {
            uid: None,
            start,
            summary: summary.map(Into::into),
        }
    }

    /// Returns true if this entry is an event.
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event { .. })
    }
}

/// A parsed calendar feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCalendarDocument {
    entries: Vec<CalendarEntry>,
}

impl RawCalendarDocument {
    /// Creates a document from entries in feed order.
    pub fn new(entries: Vec<CalendarEntry>) -> Self {
        Self { entries }
    }

    /// Returns all entries in feed order.
    pub fn entries(&self) -> &[CalendarEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the document has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of event entries.
    pub fn event_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_event()).count()
    }
}

impl FromIterator<CalendarEntry> for RawCalendarDocument {
    fn from_iter<I: IntoIterator<Item = CalendarEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
