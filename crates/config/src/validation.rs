//! Per-section checks
//!
//! Every table in the config file is a [`ConfigSection`]. Sections report all
//! of their problems at once so `syncguard validate` can list them together.

pub use crate::error::ValidationError;
use std::fmt::Display;
use std::path::Path;

/// One `[table]` of the config file
pub trait ConfigSection: Default {
    /// Returns every problem found, or `Ok` when the section is usable
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Overlays the non-default values of `other`
    fn merge(&mut self, other: Self);

    /// TOML table name, used as the prefix of field names in errors
    fn section_name(&self) -> &'static str;
}

type Check = Result<(), ValidationError>;

/// Reusable field checks
pub struct Validator;

impl Validator {
    /// Inclusive bounds check
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Check
    where
        T: PartialOrd + Display + Copy,
    {
        if (min..=max).contains(&value) {
            return Ok(());
        }
        Err(ValidationError::with_value(
            field,
            format!("must be between {} and {}", min, max),
            value,
        ))
    }

    pub fn path_exists(path: &Path, field: &str) -> Check {
        match path.try_exists() {
            Ok(true) => Ok(()),
            Ok(false) => Err(ValidationError::with_value(
                field,
                "path does not exist",
                path.display(),
            )),
            Err(e) => Err(ValidationError::with_value(
                field,
                format!("cannot be checked: {}", e),
                path.display(),
            )),
        }
    }

    /// Watched files must be files, not `/` or `..`
    pub fn has_file_name(path: &Path, field: &str) -> Check {
        path.file_name().map(|_| ()).ok_or_else(|| {
            ValidationError::with_value(field, "must name a file", path.display())
        })
    }

    /// Source and destination pointing at the same file would copy onto itself
    pub fn distinct_paths(first: &Path, second: &Path, field: &str, other: &str) -> Check {
        if first != second {
            return Ok(());
        }
        Err(ValidationError::with_value(
            field,
            format!("must differ from {}", other),
            second.display(),
        ))
    }

    pub fn not_empty_list<T>(values: &[T], field: &str) -> Check {
        if values.is_empty() {
            Err(ValidationError::new(field, "must contain at least one entry"))
        } else {
            Ok(())
        }
    }

    /// A blank keyword or process name would match everything
    pub fn no_blank_entries(values: &[String], field: &str) -> Check {
        let blank = values.iter().position(|v| v.trim().is_empty());
        match blank {
            None => Ok(()),
            Some(index) => Err(ValidationError::with_value(
                field,
                "must not contain blank entries",
                format!("index {}", index),
            )),
        }
    }

    pub fn not_empty(value: &str, field: &str) -> Check {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, "must not be empty"))
        } else {
            Ok(())
        }
    }

    /// Keeps the failures, in order
    pub fn collect_errors(results: Vec<Check>) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<_> = results.into_iter().filter_map(Result::err).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_in_range_bounds_are_inclusive() {
        assert!(Validator::in_range(1u32, 1, 10, "engine.max_copy_attempts").is_ok());
        assert!(Validator::in_range(10u32, 1, 10, "engine.max_copy_attempts").is_ok());
        assert!(Validator::in_range(0u32, 1, 10, "engine.max_copy_attempts").is_err());
        assert!(Validator::in_range(11u32, 1, 10, "engine.max_copy_attempts").is_err());
    }

    #[test]
    fn test_in_range_reports_value() {
        let err = Validator::in_range(150u8, 0, 100, "engine.success_threshold_pct").unwrap_err();
        assert_eq!(err.field, "engine.success_threshold_pct");
        assert_eq!(err.value.as_deref(), Some("150"));
    }

    #[test]
    fn test_path_exists() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("catalogo.xlsx");
        std::fs::write(&present, b"x").unwrap();

        assert!(Validator::path_exists(&present, "paths.source").is_ok());
        assert!(Validator::path_exists(&dir.path().join("gone.xlsx"), "paths.source").is_err());
    }

    #[test]
    fn test_has_file_name() {
        assert!(Validator::has_file_name(Path::new("/share/catalogo.xlsx"), "paths.source").is_ok());
        assert!(Validator::has_file_name(Path::new("/"), "paths.source").is_err());
        assert!(Validator::has_file_name(Path::new("share/.."), "paths.source").is_err());
    }

    #[test]
    fn test_distinct_paths() {
        let a = Path::new("/data/catalogo.xlsx");
        let b = Path::new("/share/catalogo.xlsx");
        assert!(Validator::distinct_paths(a, b, "paths.destination", "paths.source").is_ok());

        let err = Validator::distinct_paths(a, a, "paths.destination", "paths.source").unwrap_err();
        assert_eq!(err.message, "must differ from paths.source");
    }

    #[test]
    fn test_list_checks() {
        let none: Vec<String> = Vec::new();
        assert!(Validator::not_empty_list(&none, "client.process_names").is_err());
        assert!(Validator::no_blank_entries(&none, "client.process_names").is_ok());

        let names = vec!["EXCEL.EXE".to_string(), "  ".to_string()];
        let err = Validator::no_blank_entries(&names, "client.process_names").unwrap_err();
        assert_eq!(err.value.as_deref(), Some("index 1"));
    }

    #[test]
    fn test_not_empty_trims() {
        assert!(Validator::not_empty("SYNCING_", "engine.alert_marker_prefix").is_ok());
        assert!(Validator::not_empty(" \t", "engine.alert_marker_prefix").is_err());
    }

    #[test]
    fn test_collect_errors_keeps_order() {
        assert!(Validator::collect_errors(vec![Ok(()), Ok(())]).is_ok());

        let errors = Validator::collect_errors(vec![
            Err(ValidationError::new("paths.source", "must be set")),
            Ok(()),
            Err(ValidationError::new("paths.destination", "must be set")),
        ])
        .unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["paths.source", "paths.destination"]);
    }
}
