//! Lesson title parsing.
//!
//! School calendars encode lessons in the event title as hyphen-separated
//! segments: the subject code first, the teacher code last, and optionally
//! one or more class identifiers in between, e.g. `ABU-S-INF22a-MEI`.
//!
//! The rules here are heuristics that the absence forms depend on. They are
//! kept literal: a title whose first segment is itself part of a class
//! identifier (`S-INF22a-MEI`) yields the subject `S`.

use std::sync::LazyLock;

use regex::Regex;

/// Regex for class identifiers such as `S-INF22a`, `W-KV23b` or `E-DET24c-LO`.
///
/// A category flag, a hyphen, 2-4 uppercase letters, a two-digit cohort
/// year, a lowercase section letter, and an optional `-LO` suffix.
static CLASS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[SWER]-[A-Z]{2,4}\d{2}[a-z](?:-LO)?").expect("Invalid class regex")
});

/// Subject, teacher and class codes extracted from a lesson title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonTitle<'a> {
    /// First hyphen segment, trimmed.
    pub subject: &'a str,
    /// Teacher short code (never contains whitespace).
    pub teacher: &'a str,
    /// Comma-joined class identifiers, empty if none.
    pub class: String,
}

/// Extracts all class identifiers from a title, joined with commas.
///
/// Returns an empty string when the title contains none.
pub fn extract_class(title: &str) -> String {
    CLASS_REGEX
        .find_iter(title)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parses a lesson title into subject, teacher and class codes.
///
/// Returns `None` when the title has fewer than two hyphen segments or when
/// the last segment contains a space, which marks a free-text name rather
/// than a teacher short code.
pub fn parse_title(title: &str) -> Option<LessonTitle<'_>> {
    let parts: Vec<&str> = title.split('-').collect();
    if parts.len() < 2 {
        return None;
    }

    let subject = parts[0].trim();
    let candidate = parts[parts.len() - 1].trim();
    if candidate.contains(' ') {
        return None;
    }
    let teacher = candidate.split_whitespace().next().unwrap_or("");

    Some(LessonTitle {
        subject,
        teacher,
        class: extract_class(title),
    })
}
