//! Configuration for the SyncGuard engine
//!
//! One TOML file holds every tunable the engine reads: the tracked paths,
//! executor and alert timings, decision policy inputs, the cloud-sync client
//! and marker cleanup. Values resolve as defaults, then the file, then
//! `SYNCGUARD_<SECTION>_<FIELD>` environment variables.
//!
//! Loading never rejects out-of-range values; it logs them. Saving does
//! reject them, and replaces the file atomically.
//!
//! ```rust,no_run
//! use syncguard_config::ConfigManager;
//!
//! # fn main() -> Result<(), syncguard_config::ConfigError> {
//! let manager = ConfigManager::new()?;
//! let config = manager.load_with_env_overrides()?;
//! println!("{} -> {}", config.paths.source.display(), config.paths.destination.display());
//! # Ok(())
//! # }
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

mod app_config;
mod client_config;
mod engine_config;
mod maintenance_config;
mod paths_config;
mod policy_config;

pub use app_config::{AppConfig, LogLevel};
pub use client_config::ClientConfig;
pub use engine_config::EngineConfig;
pub use error::{ConfigError, ConfigResult, ValidationError};
pub use maintenance_config::MaintenanceConfig;
pub use manager::{apply_env_overrides, ConfigManager, ENV_PREFIX};
pub use paths_config::PathsConfig;
pub use policy_config::{BusinessDay, PolicyConfig};
pub use validation::{ConfigSection, Validator};

use serde::{Deserialize, Serialize};

/// Bumped when a field changes meaning; a mismatch is logged on load
pub const CONFIG_VERSION: u32 = 1;

/// The whole config file, one field per TOML table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub app: AppConfig,
    /// `[paths]` tracked file and its published copy
    pub paths: PathsConfig,
    /// `[engine]` copy attempts, alert settling and verification scoring
    pub engine: EngineConfig,
    /// `[policy]` business hours, critical keywords and change thresholds
    pub policy: PolicyConfig,
    /// `[client]` the desktop sync client that gets nudged
    pub client: ClientConfig,
    /// `[maintenance]` sweeping of leftover markers
    pub maintenance: MaintenanceConfig,
}

impl Config {
    /// Every problem in every section, in table order
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        collect_section(&self.app, &mut errors);
        collect_section(&self.paths, &mut errors);
        collect_section(&self.engine, &mut errors);
        collect_section(&self.policy, &mut errors);
        collect_section(&self.client, &mut errors);
        collect_section(&self.maintenance, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Overlays `other` section by section
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.paths.merge(other.paths);
        self.engine.merge(other.engine);
        self.policy.merge(other.policy);
        self.client.merge(other.client);
        self.maintenance.merge(other.maintenance);
    }
}

fn collect_section<S: ConfigSection>(section: &S, errors: &mut Vec<ValidationError>) {
    if let Err(mut e) = section.validate() {
        log::debug!(
            "{} invalid values in section [{}]",
            e.len(),
            section.section_name()
        );
        errors.append(&mut e);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            paths: PathsConfig::default(),
            engine: EngineConfig::default(),
            policy: PolicyConfig::default(),
            client: ClientConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}
