//! Lesson types.
//!
//! This module provides the records produced by lesson extraction:
//! - [`CalendarEvent`]: one lesson candidate found on the day of absence
//! - [`ProcessedEvent`]: a unique lesson with its number of periods
//! - [`MissedLesson`]: a display-ready row for the absence form
//!
//! Serialized field names follow the German names the form service uses.

use serde::{Deserialize, Serialize};

use crate::mapping::DataMapping;

/// Maximum number of lesson rows an absence form holds.
pub const MAX_LESSON_ROWS: usize = 7;

/// A lesson extracted from a calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Date label, e.g. `Mo 15.01.2024`.
    #[serde(rename = "datum")]
    pub date: String,
    /// Subject short code.
    #[serde(rename = "fach")]
    pub subject: String,
    /// Teacher short code. Never contains whitespace.
    #[serde(rename = "lehrer")]
    pub teacher: String,
    /// Comma-joined class identifiers, empty if none.
    #[serde(rename = "klasse")]
    pub class: String,
}

impl CalendarEvent {
    /// Creates a new lesson record.
    pub fn new(
        date: impl Into<String>,
        subject: impl Into<String>,
        teacher: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            subject: subject.into(),
            teacher: teacher.into(),
            class: class.into(),
        }
    }

    /// Returns the key identifying the same lesson across entries.
    ///
    /// The date label is not part of the key.
    pub fn key(&self) -> LessonKey<'_> {
        LessonKey {
            subject: &self.subject,
            teacher: &self.teacher,
            class: &self.class,
        }
    }
}

/// Uniqueness key of a lesson: subject, teacher and class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LessonKey<'a> {
    pub subject: &'a str,
    pub teacher: &'a str,
    pub class: &'a str,
}

/// A unique lesson together with how often it occurs on the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    #[serde(flatten)]
    pub event: CalendarEvent,
    /// Number of periods, at least 1.
    pub count: u32,
}

impl ProcessedEvent {
    /// Creates a processed event with a count of one.
    pub fn new(event: CalendarEvent) -> Self {
        Self { event, count: 1 }
    }

    /// Builder method to set the count.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Returns the uniqueness key of the underlying lesson.
    pub fn key(&self) -> LessonKey<'_> {
        self.event.key()
    }
}

/// How subjects and teachers are written into lesson rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonNaming {
    /// Full names from the mapping tables (unknown codes stay as they are).
    #[default]
    DisplayNames,
    /// Raw short codes as they appear in the calendar.
    ShortCodes,
}

impl LessonNaming {
    /// Returns the naming for the form's "use short names" flag.
    pub fn from_short_names(use_short_names: bool) -> Self {
        if use_short_names {
            Self::ShortCodes
        } else {
            Self::DisplayNames
        }
    }
}

/// A lesson row of the absence form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissedLesson {
    /// Number of periods missed, as text.
    pub anzahl_lektionen: String,
    /// Weekday and date label.
    pub wochentag_und_datum: String,
    /// Subject code or name.
    pub fach: String,
    /// Teacher code or name.
    pub lehrperson: String,
    /// Class identifier, if the calendar provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub klasse: Option<String>,
}

impl MissedLesson {
    /// Builds a form row from a processed lesson.
    pub fn from_processed(
        lesson: &ProcessedEvent,
        naming: LessonNaming,
        mapping: &DataMapping,
    ) -> Self {
        let event = &lesson.event;
        let (fach, lehrperson) = match naming {
            LessonNaming::ShortCodes => (event.subject.clone(), event.teacher.clone()),
            LessonNaming::DisplayNames => (
                mapping.subject_name(&event.subject).to_string(),
                mapping.teacher_name(&event.teacher).to_string(),
            ),
        };

        Self {
            anzahl_lektionen: lesson.count.to_string(),
            wochentag_und_datum: event.date.clone(),
            fach,
            lehrperson,
            klasse: (!event.class.is_empty()).then(|| event.class.clone()),
        }
    }
}

/// Builds form rows from processed lessons, keeping at most
/// [`MAX_LESSON_ROWS`].
pub fn missed_lessons(
    lessons: &[ProcessedEvent],
    naming: LessonNaming,
    mapping: &DataMapping,
) -> Vec<MissedLesson> {
    if lessons.len() > MAX_LESSON_ROWS {
        tracing::debug!(
            lessons = lessons.len(),
            max_rows = MAX_LESSON_ROWS,
            "Truncating lesson rows to form capacity"
        );
    }

    lessons
        .iter()
        .take(MAX_LESSON_ROWS)
        .map(|lesson| MissedLesson::from_processed(lesson, naming, mapping))
        .collect()
}

/// Returns the first non-empty class identifier, used to pre-fill the
/// form's class field.
pub fn class_hint(lessons: &[ProcessedEvent]) -> Option<&str> {
    lessons
        .iter()
        .map(|lesson| lesson.event.class.as_str())
        .find(|class| !class.is_empty())
}
