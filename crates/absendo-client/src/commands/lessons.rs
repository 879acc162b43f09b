//! The `lessons` command: fetch a calendar and list the missed lessons.

use std::fmt::Write as _;

use absendo_core::{
    DataMapping, LessonNaming, MissedLesson, ProcessedEvent, class_hint, missed_lessons,
    weekday_name,
};
use absendo_providers::{CalendarFetchGateway, process_events};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::info;

use crate::cli::LessonsArgs;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// The lessons of one day of absence, ready for output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonReport {
    /// Day of absence.
    pub date: NaiveDate,
    /// Full German weekday name.
    pub weekday: &'static str,
    /// First class identifier found, for the form's class field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_hint: Option<String>,
    /// Form rows.
    pub lessons: Vec<MissedLesson>,
    /// Lessons beyond the form's capacity.
    pub omitted: usize,
}

impl LessonReport {
    /// Builds the report for `date` from processed lessons.
    pub fn build(
        date: NaiveDate,
        processed: &[ProcessedEvent],
        naming: LessonNaming,
        mapping: &DataMapping,
    ) -> Self {
        let lessons = missed_lessons(processed, naming, mapping);
        Self {
            date,
            weekday: weekday_name(date),
            class_hint: class_hint(processed).map(str::to_string),
            omitted: processed.len() - lessons.len(),
            lessons,
        }
    }

    /// Renders the report for the terminal.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let day = format!("{}, {}", self.weekday, self.date.format("%d.%m.%Y"));

        if self.lessons.is_empty() {
            let _ = writeln!(out, "Keine Lektionen am {}.", day);
            return out;
        }

        match self.class_hint {
            Some(ref class) => {
                let _ = writeln!(out, "{} (Klasse {})", day, class);
            }
            None => {
                let _ = writeln!(out, "{}", day);
            }
        }

        let width = self
            .lessons
            .iter()
            .map(|l| l.fach.chars().count())
            .max()
            .unwrap_or(0);
        for lesson in &self.lessons {
            let _ = writeln!(
                out,
                "  {:>2}x  {:<width$}  {}",
                lesson.anzahl_lektionen,
                lesson.fach,
                lesson.lehrperson,
                width = width
            );
        }

        if self.omitted > 0 {
            let _ = writeln!(
                out,
                "  (+{} weitere, nicht im Formular)",
                self.omitted
            );
        }
        out
    }
}

/// Runs the `lessons` command.
pub async fn run(args: &LessonsArgs, config: &ClientConfig) -> ClientResult<()> {
    let fetch_config = config.to_fetch_config().map_err(ClientError::Config)?;
    let custom_mapping = config.mapping.load().map_err(ClientError::Config)?;
    let mapping = custom_mapping
        .as_ref()
        .unwrap_or_else(|| DataMapping::builtin());

    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let gateway = CalendarFetchGateway::http(fetch_config)?;

    info!(date = %date, "Extracting lessons");
    let document = gateway.fetch_calendar_data(&args.url).await?;
    let processed = process_events(&document, date);

    let naming = LessonNaming::from_short_names(args.short_names || config.output.short_names);
    let report = LessonReport::build(date, &processed, naming, mapping);

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| ClientError::Output(format!("failed to serialize lessons: {}", e)))?;
        println!("{}", json);
    } else {
        print!("{}", report.render_text());
    }

    Ok(())
}
