//! Core types: lessons, date labels, title parsing, code mapping, aggregation

pub mod aggregate;
pub mod lesson;
pub mod mapping;
pub mod time;
pub mod title;
pub mod tracing;

pub use aggregate::{aggregate_processed, remove_duplicates_with_count};
pub use lesson::{
    CalendarEvent, LessonKey, LessonNaming, MAX_LESSON_ROWS, MissedLesson, ProcessedEvent,
    class_hint, missed_lessons,
};
pub use mapping::{DataMapping, MappingError, subject_name, teacher_name};
pub use time::{
    EventStart, format_absence_date, parse_absence_date, weekday_abbreviation, weekday_name,
};
pub use title::{LessonTitle, extract_class, parse_title};
pub use tracing::{TracingConfig, TracingError, init_tracing};
