//! Teacher and subject short-code tables.
//!
//! Calendar titles only carry short codes (`MEI`, `ABU`). The form shows
//! full names, looked up here. Lookups never fail: an unknown code is
//! returned unchanged.
//!
//! The built-in tables are embedded from `data/*.json`. A deployment can
//! load its own tables with [`DataMapping::load`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use thiserror::Error;
use tracing::{debug, warn};

const BUILTIN_TEACHERS: &str = include_str!("../data/teachers.json");
const BUILTIN_SUBJECTS: &str = include_str!("../data/subjects.json");

static BUILTIN: LazyLock<DataMapping> = LazyLock::new(|| {
    DataMapping::from_json(BUILTIN_TEACHERS, BUILTIN_SUBJECTS).unwrap_or_else(|e| {
        warn!(error = %e, "Built-in mapping tables are invalid, using empty tables");
        DataMapping::default()
    })
});

/// Errors that can occur while loading mapping tables.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A table file could not be read.
    #[error("failed to read mapping table {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A table is not a flat JSON object of strings.
    #[error("invalid mapping table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Lookup tables from short codes to display names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataMapping {
    teachers: HashMap<String, String>,
    subjects: HashMap<String, String>,
}

impl DataMapping {
    /// Returns the built-in tables.
    pub fn builtin() -> &'static DataMapping {
        &BUILTIN
    }

    /// Creates a mapping from two JSON objects (`{"CODE": "Name", ...}`).
    pub fn from_json(teachers: &str, subjects: &str) -> Result<Self, MappingError> {
        Ok(Self {
            teachers: serde_json::from_str(teachers)?,
            subjects: serde_json::from_str(subjects)?,
        })
    }

    /// Loads the teacher and subject tables from JSON files.
    pub fn load(teachers: &Path, subjects: &Path) -> Result<Self, MappingError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|source| MappingError::Read {
                path: path.display().to_string(),
                source,
            })
        };

        let mapping = Self::from_json(&read(teachers)?, &read(subjects)?)?;
        debug!(
            teachers = mapping.teachers.len(),
            subjects = mapping.subjects.len(),
            "Loaded mapping tables"
        );
        Ok(mapping)
    }

    /// Returns the full teacher name for a short code, or the code itself.
    pub fn teacher_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.teachers.get(code).map_or(code, String::as_str)
    }

    /// Returns the full subject name for a short code, or the code itself.
    pub fn subject_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.subjects.get(code).map_or(code, String::as_str)
    }

    /// Returns the number of teacher entries.
    pub fn teacher_count(&self) -> usize {
        self.teachers.len()
    }

    /// Returns the number of subject entries.
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }
}

/// Looks up a teacher code in the built-in table.
pub fn teacher_name(code: &str) -> &str {
    DataMapping::builtin().teacher_name(code)
}

/// Looks up a subject code in the built-in table.
pub fn subject_name(code: &str) -> &str {
    DataMapping::builtin().subject_name(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_load() {
        let mapping = DataMapping::builtin();
        assert!(mapping.teacher_count() > 0);
        assert!(mapping.subject_count() > 0);
    }

    #[test]
    fn builtin_lookup() {
        assert_eq!(subject_name("M"), "Mathematik");
        assert_eq!(subject_name("ABU"), "Allgemeinbildender Unterricht");
        assert_eq!(teacher_name("MEI"), "Meier Anna");
    }

    #[test]
    fn miss_returns_code() {
        assert_eq!(teacher_name("ZZZ"), "ZZZ");
        assert_eq!(subject_name(""), "");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(subject_name("m"), "m");
    }

    #[test]
    fn custom_tables() {
        let mapping =
            DataMapping::from_json(r#"{"XY": "Xaver Ypsilon"}"#, r#"{"Q": "Qualität"}"#).unwrap();
        assert_eq!(mapping.teacher_name("XY"), "Xaver Ypsilon");
        assert_eq!(mapping.subject_name("Q"), "Qualität");
        assert_eq!(mapping.subject_name("M"), "M");
    }

    #[test]
    fn invalid_json_is_rejected() {
        let result = DataMapping::from_json("[1, 2]", "{}");
        assert!(matches!(result, Err(MappingError::Parse(_))));
    }

    #[test]
    fn missing_file_is_reported() {
        let result = DataMapping::load(
            Path::new("/nonexistent/teachers.json"),
            Path::new("/nonexistent/subjects.json"),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/teachers.json"));
    }
}
