//! Lesson aggregation.
//!
//! A double period shows up as two calendar entries with the same subject,
//! teacher and class. Aggregation collapses them into one
//! [`ProcessedEvent`] whose count is the number of periods.

use std::collections::HashMap;

use tracing::trace;

use crate::lesson::{CalendarEvent, LessonKey, ProcessedEvent};

/// Collapses identical lessons into unique entries with a count.
///
/// Lessons are grouped by subject, teacher and class. Each group keeps the
/// fields of its first lesson, and groups appear in first-seen order.
pub fn remove_duplicates_with_count(events: &[CalendarEvent]) -> Vec<ProcessedEvent> {
    let mut index: HashMap<LessonKey<'_>, usize> = HashMap::new();
    let mut processed: Vec<ProcessedEvent> = Vec::new();

    for event in events {
        match index.get(&event.key()) {
            Some(&i) => processed[i].count += 1,
            None => {
                index.insert(event.key(), processed.len());
                processed.push(ProcessedEvent::new(event.clone()));
            }
        }
    }

    trace!(
        input = events.len(),
        unique = processed.len(),
        "Aggregated lessons"
    );
    processed
}

/// Merges already aggregated lessons that share a key, summing counts.
///
/// Applying this to its own output returns the same lessons unchanged.
pub fn aggregate_processed(lessons: &[ProcessedEvent]) -> Vec<ProcessedEvent> {
    let mut index: HashMap<LessonKey<'_>, usize> = HashMap::new();
    let mut merged: Vec<ProcessedEvent> = Vec::new();

    for lesson in lessons {
        match index.get(&lesson.key()) {
            Some(&i) => merged[i].count += lesson.count,
            None => {
                index.insert(lesson.key(), merged.len());
                merged.push(lesson.clone());
            }
        }
    }

    merged
}
