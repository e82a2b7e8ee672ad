//! Config loading and saving errors

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },

    #[error("cannot write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },

    /// The file exists but is not valid TOML for [`crate::Config`]
    #[error("invalid config in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Refused to save; holds the joined field errors
    #[error("config rejected: {0}")]
    ValidationError(String),

    #[error("cannot create config directory {path}: {source}")]
    DirectoryCreationError { path: PathBuf, source: io::Error },

    /// No home directory, or a config path without a parent
    #[error("cannot locate config directory: {reason}")]
    PathResolutionError { reason: String },

    /// Copying the previous file to `config.toml.backup` failed
    #[error("cannot keep backup of previous config: {source}")]
    BackupError { source: io::Error },

    #[error(transparent)]
    IoError(#[from] io::Error),
}

/// One bad field, named by its dotted TOML path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// e.g. `engine.max_copy_attempts`
    pub field: String,
    pub message: String,
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Also records the rejected value so the operator sees what was read
    pub fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::new(field, message)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field '{}': {}", self.field, self.message)?;
        match &self.value {
            Some(value) => write!(f, " (got: {})", value),
            None => Ok(()),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Single-line form used in logs and in [`ConfigError::ValidationError`]
pub(crate) fn join_errors(errors: &[ValidationError]) -> String {
    let parts: Vec<String> = errors.iter().map(ToString::to_string).collect();
    parts.join("; ")
}
