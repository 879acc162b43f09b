//! Date handling for lesson extraction.
//!
//! This module provides [`EventStart`] for the start of a calendar entry
//! (a UTC instant, a wall-clock time, or an all-day date) and the fixed
//! Swiss German date label used on absence forms.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// The start of a calendar entry.
///
/// ICS feeds express start times in three ways:
/// - **DateTime**: an absolute instant (`...Z` or `TZID`-bound), stored as UTC
/// - **Floating**: a wall-clock time without a known zone
/// - **Date**: an all-day entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventStart {
    /// An absolute instant, stored in UTC.
    DateTime(DateTime<Utc>),
    /// A wall-clock time in the calendar's own zone.
    Floating(NaiveDateTime),
    /// An all-day date.
    Date(NaiveDate),
}

impl EventStart {
    /// Creates an `EventStart::DateTime` from a datetime in any timezone.
    pub fn from_local<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// Returns the calendar date of this start as seen from `tz`.
    ///
    /// Only absolute instants are shifted; wall-clock times and dates
    /// already carry the calendar's own day.
    pub fn date_in<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.with_timezone(tz).date_naive(),
            Self::Floating(naive) => naive.date(),
            Self::Date(date) => *date,
        }
    }

    /// Checks if this start falls on the given date in the specified timezone.
    ///
    /// Time of day is ignored; only day, month and year are compared.
    pub fn is_on_date<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> bool {
        self.date_in(tz) == date
    }
}

/// de-CH short weekday names, Monday first.
const WEEKDAY_ABBREVIATIONS: [&str; 7] = ["Mo.", "Di.", "Mi.", "Do.", "Fr.", "Sa.", "So."];

const WEEKDAY_NAMES: [&str; 7] = [
    "Montag",
    "Dienstag",
    "Mittwoch",
    "Donnerstag",
    "Freitag",
    "Samstag",
    "Sonntag",
];

/// Returns the de-CH abbreviation of a weekday, including its trailing dot.
pub fn weekday_abbreviation(weekday: Weekday) -> &'static str {
    WEEKDAY_ABBREVIATIONS[weekday.num_days_from_monday() as usize]
}

/// Returns the full German weekday name of a date (e.g. `Montag`).
pub fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize]
}

/// Formats a date as the label used in the form's lesson rows.
///
/// The label is `<weekday> <DD>.<MM>.<YYYY>` with the de-CH weekday
/// abbreviation stripped of trailing punctuation, e.g. `Mo 15.01.2024`.
pub fn format_absence_date(date: NaiveDate) -> String {
    let weekday =
        weekday_abbreviation(date.weekday()).trim_end_matches(|c: char| c.is_ascii_punctuation());
    format!("{} {}", weekday, date.format("%d.%m.%Y"))
}

/// Parses an absence date given either as `YYYY-MM-DD` or `DD.MM.YYYY`.
pub fn parse_absence_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d.%m.%Y"))
        .ok()
}
