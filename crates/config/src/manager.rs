//! Entry point for locating, loading and saving the config
//!
//! The file lives in the platform config directory unless an explicit path
//! is given (`syncguard --config`). Environment variables are applied on
//! top of the file, never written back.

use crate::error::join_errors;
use crate::persistence::ConfigStore;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "SYNCGUARD";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Loads and saves the SyncGuard config file
pub struct ConfigManager {
    store: ConfigStore,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Uses `config.toml` in the platform config directory
    /// (`~/.config/syncguard` on Linux, `%APPDATA%\syncguard` on Windows)
    pub fn new() -> ConfigResult<Self> {
        let dirs = ProjectDirs::from("", "", "syncguard").ok_or_else(|| {
            ConfigError::PathResolutionError {
                reason: "no home directory for the current user".to_string(),
            }
        })?;
        Self::with_directory(dirs.config_dir().to_path_buf())
    }

    /// Uses `config.toml` inside `config_dir`
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        Ok(Self {
            store: ConfigStore::new(config_dir.join(CONFIG_FILE_NAME)),
            config_dir,
        })
    }

    /// Uses an explicit file, whatever its name
    pub fn with_config_file(config_path: PathBuf) -> ConfigResult<Self> {
        let config_dir = match config_path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
            Some(parent) => parent.to_path_buf(),
            None => {
                return Err(ConfigError::PathResolutionError {
                    reason: format!("{} is not a file path", config_path.display()),
                })
            }
        };
        Ok(Self {
            store: ConfigStore::new(config_path),
            config_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.store.path().to_path_buf()
    }

    /// Reads the file; defaults if it does not exist
    pub fn load(&self) -> ConfigResult<Config> {
        self.store.load()
    }

    /// Like `load`, but falls back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_else(|e| {
            log::warn!("{}; continuing with defaults", e);
            Config::default()
        })
    }

    /// Validates, backs up the old file and writes atomically
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.store.save(config)
    }

    /// Load, modify, save
    ///
    /// ```rust,no_run
    /// # use syncguard_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.engine.max_copy_attempts = 5;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes a commented default file unless one exists
    ///
    /// Returns whether a file was written.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.store.path().exists() {
            log::debug!("Keeping existing config at {}", self.store.path().display());
            return Ok(false);
        }
        self.store.generate_default()?;
        Ok(true)
    }

    /// Overwrites the file with defaults (the old one goes to the backup)
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validation messages for the file as it is on disk
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        Ok(match self.load()?.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(ToString::to_string).collect(),
        })
    }

    /// Loads the file and applies `SYNCGUARD_<SECTION>_<FIELD>` variables
    ///
    /// Variables that do not parse are logged and ignored.
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |name| std::env::var(name).ok());

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {}",
                join_errors(&errors)
            );
        }
        Ok(config)
    }
}

/// Applies overrides looked up through `lookup`
pub fn apply_env_overrides<L>(config: &mut Config, lookup: L)
where
    L: Fn(&str) -> Option<String>,
{
    let var = |section: &str, field: &str| {
        let name = format!("{}_{}_{}", ENV_PREFIX, section, field);
        lookup(&name).map(|value| (name, value))
    };

    override_parsed(var("APP", "LOG_LEVEL"), &mut config.app.log_level);

    if let Some((_, value)) = var("PATHS", "SOURCE") {
        config.paths.source = PathBuf::from(value);
    }
    if let Some((_, value)) = var("PATHS", "DESTINATION") {
        config.paths.destination = PathBuf::from(value);
    }

    let engine = &mut config.engine;
    override_parsed(var("ENGINE", "MAX_COPY_ATTEMPTS"), &mut engine.max_copy_attempts);
    override_parsed(
        var("ENGINE", "COPY_RETRY_BACKOFF_SECS"),
        &mut engine.copy_retry_backoff_secs,
    );
    override_parsed(
        var("ENGINE", "SIZE_TOLERANCE_BYTES"),
        &mut engine.size_tolerance_bytes,
    );
    override_parsed(var("ENGINE", "ALERT_SETTLE_SECS"), &mut engine.alert_settle_secs);
    override_parsed(
        var("ENGINE", "SUCCESS_THRESHOLD_PCT"),
        &mut engine.success_threshold_pct,
    );
    override_parsed(var("ENGINE", "DEBOUNCE_SECS"), &mut engine.debounce_secs);

    override_parsed(
        var("POLICY", "LARGE_CHANGE_BYTES"),
        &mut config.policy.large_change_bytes,
    );
    if let Some((_, value)) = var("POLICY", "CRITICAL_KEYWORDS") {
        config.policy.critical_keywords = value
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
    }

    override_parsed(var("CLIENT", "ENABLED"), &mut config.client.enabled);
    override_parsed(
        var("CLIENT", "NUDGE_TIMEOUT_SECS"),
        &mut config.client.nudge_timeout_secs,
    );

    override_parsed(
        var("MAINTENANCE", "BLOCKED_MARKER_MAX_AGE_HOURS"),
        &mut config.maintenance.blocked_marker_max_age_hours,
    );
}

fn override_parsed<T>(entry: Option<(String, String)>, target: &mut T)
where
    T: FromStr,
{
    if let Some((name, value)) = entry {
        match value.trim().parse::<T>() {
            Ok(parsed) => {
                log::info!("Config override from {}", name);
                *target = parsed;
            }
            Err(_) => log::warn!("Ignoring {}: cannot parse '{}'", name, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogLevel;
    use tempfile::TempDir;

    fn manager() -> (TempDir, ConfigManager) {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_directory(dir.path().to_path_buf()).unwrap();
        (dir, manager)
    }

    #[test]
    fn test_platform_manager_resolves() {
        assert!(ConfigManager::new().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back() {
        let (_dir, manager) = manager();
        assert_eq!(manager.load_or_default(), Config::default());
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let (_dir, manager) = manager();
        std::fs::write(manager.config_path(), "max_copy_attempts = [").unwrap();
        assert!(manager.load().is_err());
        assert_eq!(manager.load_or_default(), Config::default());
    }

    #[test]
    fn test_update_persists() {
        let (_dir, manager) = manager();
        manager
            .update(|config| config.paths.destination = PathBuf::from("/share/catalogo.xlsx"))
            .unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded.paths.destination, PathBuf::from("/share/catalogo.xlsx"));
    }

    #[test]
    fn test_initialize_only_once() {
        let (_dir, manager) = manager();
        assert!(manager.initialize().unwrap());
        assert!(!manager.initialize().unwrap());
        assert_eq!(manager.load().unwrap(), Config::default());
    }

    #[test]
    fn test_reset_keeps_backup() {
        let (_dir, manager) = manager();
        let mut config = Config::default();
        config.engine.debounce_secs = 9;
        manager.save(&config).unwrap();

        manager.reset().unwrap();

        assert_eq!(manager.load().unwrap(), Config::default());
        let backup = manager.config_path().with_extension("toml.backup");
        assert!(std::fs::read_to_string(backup).unwrap().contains("debounce_secs = 9"));
    }

    #[test]
    fn test_validate_reports_on_disk_problems() {
        let (_dir, manager) = manager();
        std::fs::write(manager.config_path(), "[engine]\nsuccess_threshold_pct = 150\n").unwrap();

        let problems = manager.validate().unwrap();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("engine.success_threshold_pct"));
    }

    #[test]
    fn test_invalid_config_is_not_saved() {
        let (_dir, manager) = manager();
        let mut config = Config::default();
        config.engine.success_threshold_pct = 150;
        assert!(manager.save(&config).is_err());
    }

    #[test]
    fn test_apply_overrides_from_lookup() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| match name {
            "SYNCGUARD_APP_LOG_LEVEL" => Some("debug".to_string()),
            "SYNCGUARD_PATHS_SOURCE" => Some("/data/catalog.xlsx".to_string()),
            "SYNCGUARD_ENGINE_MAX_COPY_ATTEMPTS" => Some(" 5 ".to_string()),
            "SYNCGUARD_POLICY_CRITICAL_KEYWORDS" => Some("promo, , stock".to_string()),
            "SYNCGUARD_CLIENT_ENABLED" => Some("false".to_string()),
            _ => None,
        });

        assert_eq!(config.app.log_level, LogLevel::Debug);
        assert_eq!(config.paths.source, PathBuf::from("/data/catalog.xlsx"));
        assert_eq!(config.engine.max_copy_attempts, 5);
        assert_eq!(config.policy.critical_keywords, vec!["promo", "stock"]);
        assert!(!config.client.enabled);
    }

    #[test]
    fn test_unparseable_override_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |name| {
            (name == "SYNCGUARD_ENGINE_SIZE_TOLERANCE_BYTES").then(|| "lots".to_string())
        });
        assert_eq!(config.engine.size_tolerance_bytes, 100);
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site-a.toml");
        let manager = ConfigManager::with_config_file(path.clone()).unwrap();

        manager.initialize().unwrap();
        assert_eq!(manager.config_path(), path);
        assert_eq!(manager.config_dir(), dir.path());
    }

    #[test]
    fn test_bare_file_name_uses_current_dir() {
        let manager = ConfigManager::with_config_file(PathBuf::from("syncguard.toml")).unwrap();
        assert_eq!(manager.config_dir(), Path::new("."));
    }
}
