//! Config file on disk
//!
//! Writes go to a temp file in the same directory and are renamed over the
//! old file, which is first copied to `config.toml.backup`.

use crate::error::join_errors;
use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Comment block written above freshly generated configs
const GENERATED_HEADER: &str = "\
# SyncGuard configuration
#
# Set [paths] source and destination before running `syncguard run`.
# Any value can be overridden with SYNCGUARD_<SECTION>_<FIELD>,
# for example SYNCGUARD_ENGINE_MAX_COPY_ATTEMPTS=5.

";

/// Reads and writes one TOML config file
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        self.path.with_extension("toml.backup")
    }

    /// Reads the file; a missing file yields defaults
    ///
    /// Empty or unparsable files are errors. Out-of-range values are only
    /// logged so the engine can still report them at start-up.
    pub fn load(&self) -> ConfigResult<Config> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", self.path.display());
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::ReadError {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if contents.trim().is_empty() {
            return Err(ConfigError::ReadError {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, "config file is empty"),
            });
        }

        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::ParseError {
            path: self.path.clone(),
            source,
        })?;

        if config.version != CONFIG_VERSION {
            log::warn!(
                "{} declares version {}, expected {}",
                self.path.display(),
                config.version,
                CONFIG_VERSION
            );
        }
        if let Err(errors) = config.validate() {
            log::warn!("Config validation warnings: {}", join_errors(&errors));
        }

        Ok(config)
    }

    /// Validates and atomically replaces the file
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.write(config, "")
    }

    /// Writes the default config with an explanatory header
    pub fn generate_default(&self) -> ConfigResult<()> {
        self.write(&Config::default(), GENERATED_HEADER)?;
        log::info!("Generated default config at {}", self.path.display());
        Ok(())
    }

    fn write(&self, config: &Config, header: &str) -> ConfigResult<()> {
        config
            .validate()
            .map_err(|errors| ConfigError::ValidationError(join_errors(&errors)))?;

        let dir = self.directory()?;
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|source| ConfigError::DirectoryCreationError {
                path: dir.clone(),
                source,
            })?;
            log::info!("Created config directory {}", dir.display());
        }

        if self.path.exists() {
            let backup = self.backup_path();
            fs::copy(&self.path, &backup).map_err(|source| ConfigError::BackupError { source })?;
            log::debug!("Previous config kept at {}", backup.display());
        }

        let body = toml::to_string_pretty(config)?;
        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(header.as_bytes())?;
        temp.write_all(body.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| ConfigError::WriteError {
            path: self.path.clone(),
            source: e.error,
        })?;

        log::info!("Config saved to {}", self.path.display());
        Ok(())
    }

    fn directory(&self) -> ConfigResult<PathBuf> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
            Some(_) => Ok(PathBuf::from(".")),
            None => Err(ConfigError::PathResolutionError {
                reason: format!("{} has no parent directory", self.path.display()),
            }),
        }
    }
}
