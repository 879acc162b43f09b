//! Lesson extraction from a parsed calendar.
//!
//! Extraction selects the events of one day, reads subject, teacher and
//! class codes from their titles and collapses repeated periods.

use absendo_core::{
    CalendarEvent, ProcessedEvent, format_absence_date, parse_title, remove_duplicates_with_count,
};
use chrono::{Local, NaiveDate, TimeZone};
use tracing::{debug, trace};

use crate::document::{CalendarEntry, RawCalendarDocument};

/// Returns the lessons on `target_date` in the local timezone.
pub fn filter_events_by_date(
    document: &RawCalendarDocument,
    target_date: NaiveDate,
) -> Vec<CalendarEvent> {
    filter_events_by_date_in(document, target_date, &Local)
}

/// Returns the lessons on `target_date` as seen from `tz`.
///
/// Entries without a start, entries on other days and titles that do not
/// look like a lesson are skipped. Lessons keep feed order and all carry
/// the label of `target_date`.
pub fn filter_events_by_date_in<Tz: TimeZone>(
    document: &RawCalendarDocument,
    target_date: NaiveDate,
    tz: &Tz,
) -> Vec<CalendarEvent> {
    let label = format_absence_date(target_date);

    let lessons: Vec<CalendarEvent> = document
        .entries()
        .iter()
        .filter_map(|entry| {
            let CalendarEntry::Event { start, summary, .. } = entry else {
                return None;
            };
            let start = (*start)?;
            if !start.is_on_date(target_date, tz) {
                return None;
            }

            let title = summary.as_deref().unwrap_or_default();
            let Some(parsed) = parse_title(title) else {
                trace!(title = %title, "Skipping event without lesson title");
                return None;
            };

            Some(CalendarEvent::new(
                label.as_str(),
                parsed.subject,
                parsed.teacher,
                parsed.class,
            ))
        })
        .collect();

    debug!(
        date = %target_date,
        entries = document.len(),
        lessons = lessons.len(),
        "Filtered calendar events by date"
    );
    lessons
}

/// Extracts the counted lessons of `target_date` in the local timezone.
pub fn process_events(document: &RawCalendarDocument, target_date: NaiveDate) -> Vec<ProcessedEvent> {
    process_events_in(document, target_date, &Local)
}

/// Extracts the counted lessons of `target_date` as seen from `tz`.
pub fn process_events_in<Tz: TimeZone>(
    document: &RawCalendarDocument,
    target_date: NaiveDate,
    tz: &Tz,
) -> Vec<ProcessedEvent> {
    remove_duplicates_with_count(&filter_events_by_date_in(document, target_date, tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use absendo_core::EventStart;
    use chrono::{FixedOffset, Utc};

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn at(date: NaiveDate, hour: u32, minute: u32) -> EventStart {
        EventStart::Floating(date.and_hms_opt(hour, minute, 0).unwrap())
    }

    fn lesson(start: EventStart, title: &str) -> CalendarEntry {
        CalendarEntry::event(Some(start), Some(title))
    }

    #[test]
    fn single_lesson() {
        let doc = RawCalendarDocument::new(vec![lesson(at(monday(), 8, 0), "M-MEI")]);
        let events = filter_events_by_date_in(&doc, monday(), &Utc);

        assert_eq!(
            events,
            vec![CalendarEvent::new("Mo 15.01.2024", "M", "MEI", "")]
        );
    }

    #[test]
    fn class_prefix_becomes_subject() {
        let doc = RawCalendarDocument::new(vec![lesson(at(monday(), 8, 0), "S-INF22a-MEI")]);
        let events = filter_events_by_date_in(&doc, monday(), &Utc);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subject, "S");
        assert_eq!(events[0].teacher, "MEI");
        assert_eq!(events[0].class, "S-INF22a");
    }

    #[test]
    fn skips_other_days() {
        let tuesday = monday().succ_opt().unwrap();
        let doc = RawCalendarDocument::new(vec![
            lesson(at(monday(), 8, 0), "M-MEI"),
            lesson(at(tuesday, 8, 0), "D-HUB"),
            lesson(EventStart::Date(tuesday), "E-KEL"),
        ]);

        let events = filter_events_by_date_in(&doc, monday(), &Utc);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subject, "M");
    }

    #[test]
    fn skips_free_text_and_untitled_events() {
        let doc = RawCalendarDocument::new(vec![
            lesson(at(monday(), 8, 0), "Elternabend - Frau Muster"),
            lesson(at(monday(), 9, 0), "Schulfrei"),
            CalendarEntry::event(Some(at(monday(), 10, 0)), None::<String>),
            CalendarEntry::event(None, Some("D-HUB")),
            CalendarEntry::Other {
                name: "VTODO".to_string(),
            },
        ]);

        assert!(filter_events_by_date_in(&doc, monday(), &Utc).is_empty());
    }

    #[test]
    fn instants_use_given_timezone() {
        // 23:30 UTC on Sunday is already Monday in Zurich winter time.
        let sunday_late = Utc.with_ymd_and_hms(2024, 1, 14, 23, 30, 0).unwrap();
        let doc = RawCalendarDocument::new(vec![lesson(EventStart::DateTime(sunday_late), "M-MEI")]);
        let zurich = FixedOffset::east_opt(3600).unwrap();

        assert_eq!(filter_events_by_date_in(&doc, monday(), &zurich).len(), 1);
        assert!(filter_events_by_date_in(&doc, monday(), &Utc).is_empty());
    }

    #[test]
    fn all_day_entries_match_their_date() {
        let doc = RawCalendarDocument::new(vec![lesson(EventStart::Date(monday()), "SPO-BAU")]);
        let events = filter_events_by_date_in(&doc, monday(), &Utc);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].teacher, "BAU");
    }

    #[test]
    fn keeps_feed_order() {
        let doc = RawCalendarDocument::new(vec![
            lesson(at(monday(), 13, 0), "E-KEL"),
            lesson(at(monday(), 8, 0), "M-MEI"),
        ]);
        let subjects: Vec<_> = filter_events_by_date_in(&doc, monday(), &Utc)
            .into_iter()
            .map(|e| e.subject)
            .collect();
        assert_eq!(subjects, vec!["E", "M"]);
    }

    #[test]
    fn process_counts_double_periods() {
        let doc = RawCalendarDocument::new(vec![
            lesson(at(monday(), 7, 20), "M-MEI"),
            lesson(at(monday(), 8, 5), "M-MEI"),
            lesson(at(monday(), 9, 10), "D-S-INF22a-HUB"),
        ]);

        let processed = process_events_in(&doc, monday(), &Utc);
        assert_eq!(processed.len(), 2);
        assert_eq!(processed[0].event.subject, "M");
        assert_eq!(processed[0].count, 2);
        assert_eq!(processed[1].event.class, "S-INF22a");
        assert_eq!(processed[1].count, 1);
    }

    #[test]
    fn differently_spelled_titles_collapse() {
        let doc = RawCalendarDocument::new(vec![
            lesson(at(monday(), 7, 20), "M-MEI"),
            lesson(at(monday(), 8, 5), " M - MEI "),
        ]);

        let processed = process_events_in(&doc, monday(), &Utc);
        assert_eq!(processed.len(), 1);
        assert_eq!(processed[0].count, 2);
    }

    #[test]
    fn process_empty_day() {
        let doc = RawCalendarDocument::default();
        assert!(process_events_in(&doc, monday(), &Utc).is_empty());
    }
}
