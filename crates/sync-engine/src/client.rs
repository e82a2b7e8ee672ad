// crates/sync-engine/src/client.rs
//! External cloud-sync client
//!
//! The engine never owns the client process. It can only ask whether the
//! client is alive and busy, and as a last resort restart it.

use log::{debug, info, warn};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use syncguard_config::ClientConfig;
use syncguard_resilience::{CancelToken, Clock};
use sysinfo::{ProcessesToUpdate, System, MINIMUM_CPU_UPDATE_INTERVAL};
use thiserror::Error;

/// What can be observed about the client process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    /// No matching process
    NotRunning,
    /// Running but not using CPU
    Idle,
    /// Running and working
    Active,
}

impl ClientStatus {
    pub fn is_running(&self) -> bool {
        !matches!(self, Self::NotRunning)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Errors from querying or controlling the client
#[derive(Debug, Error)]
pub enum ClientError {
    /// No client is configured on this machine
    #[error("No external sync client configured")]
    Disabled,

    /// None of the configured executables exist
    #[error("Sync client executable not found (tried {tried} locations)")]
    NotInstalled { tried: usize },

    /// The executable exists but could not be started
    #[error("Failed to launch {path}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Process table could not be read
    #[error("Process query failed: {0}")]
    Query(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Liveness and restart interface to the cloud-sync client
pub trait ExternalSyncClient: Send + Sync {
    /// Display name used in logs
    fn name(&self) -> &str;

    /// Current process status
    fn status(&self) -> ClientResult<ClientStatus>;

    /// Terminates and relaunches the client
    fn restart(&self) -> ClientResult<()>;
}

/// Stand-in for setups without a cloud-sync client
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClient;

impl ExternalSyncClient for NullClient {
    fn name(&self) -> &str {
        "none"
    }

    fn status(&self) -> ClientResult<ClientStatus> {
        Ok(ClientStatus::NotRunning)
    }

    fn restart(&self) -> ClientResult<()> {
        Err(ClientError::Disabled)
    }
}

/// Client observed through the OS process table
pub struct SysinfoClient {
    process_names: Vec<String>,
    executable_paths: Vec<PathBuf>,
    restart_grace: Duration,
    clock: Arc<dyn Clock>,
    system: Mutex<System>,
}

impl SysinfoClient {
    pub fn new(config: &ClientConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            process_names: config
                .process_names
                .iter()
                .map(|name| normalize_process_name(OsStr::new(name)))
                .collect(),
            executable_paths: config.executable_paths.clone(),
            restart_grace: config.restart_grace(),
            clock,
            system: Mutex::new(System::new()),
        }
    }

    fn matches(&self, name: &OsStr) -> bool {
        let name = normalize_process_name(name);
        self.process_names.iter().any(|wanted| *wanted == name)
    }

    fn lock_system(&self) -> ClientResult<std::sync::MutexGuard<'_, System>> {
        self.system
            .lock()
            .map_err(|_| ClientError::Query("process table lock poisoned".to_string()))
    }

    fn launch(&self) -> ClientResult<()> {
        let Some(path) = self.executable_paths.iter().find(|p| p.exists()) else {
            return Err(ClientError::NotInstalled {
                tried: self.executable_paths.len(),
            });
        };

        Command::new(path)
            .arg("/background")
            .spawn()
            .map_err(|source| ClientError::Launch {
                path: path.clone(),
                source,
            })?;

        info!("Launched sync client: {}", path.display());
        Ok(())
    }
}

impl ExternalSyncClient for SysinfoClient {
    fn name(&self) -> &str {
        self.process_names.first().map(String::as_str).unwrap_or("client")
    }

    fn status(&self) -> ClientResult<ClientStatus> {
        let mut system = self.lock_system()?;

        // CPU usage is a delta between two refreshes.
        system.refresh_processes(ProcessesToUpdate::All, true);
        thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_processes(ProcessesToUpdate::All, true);

        let mut running = false;
        let mut cpu = 0.0f32;
        for process in system.processes().values() {
            if self.matches(process.name()) {
                running = true;
                cpu += process.cpu_usage();
            }
        }

        let status = match (running, cpu > 0.0) {
            (false, _) => ClientStatus::NotRunning,
            (true, false) => ClientStatus::Idle,
            (true, true) => ClientStatus::Active,
        };
        debug!("Sync client {} status {:?} (cpu {:.1}%)", self.name(), status, cpu);
        Ok(status)
    }

    fn restart(&self) -> ClientResult<()> {
        {
            let mut system = self.lock_system()?;
            system.refresh_processes(ProcessesToUpdate::All, true);
            let mut killed = 0;
            for process in system.processes().values() {
                if self.matches(process.name()) && process.kill() {
                    killed += 1;
                }
            }
            warn!("Terminated {} sync client process(es) for restart", killed);
        }

        self.clock.sleep(self.restart_grace, &CancelToken::new());
        self.launch()
    }
}

/// Builds the client described by the config
pub fn client_from_config(config: &ClientConfig, clock: Arc<dyn Clock>) -> Arc<dyn ExternalSyncClient> {
    if config.enabled {
        Arc::new(SysinfoClient::new(config, clock))
    } else {
        Arc::new(NullClient)
    }
}

fn normalize_process_name(name: &OsStr) -> String {
    let name = name.to_string_lossy().to_lowercase();
    match name.strip_suffix(".exe") {
        Some(stripped) => stripped.to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncguard_resilience::VirtualClock;

    #[test]
    fn test_normalize_process_name() {
        assert_eq!(normalize_process_name(OsStr::new("OneDrive.exe")), "onedrive");
        assert_eq!(normalize_process_name(OsStr::new("OneDrive")), "onedrive");
        assert_eq!(normalize_process_name(OsStr::new("ONEDRIVE.EXE")), "onedrive");
    }

    #[test]
    fn test_matches_ignores_case_and_extension() {
        let client = SysinfoClient::new(
            &ClientConfig::default(),
            Arc::new(VirtualClock::starting_now()),
        );
        assert!(client.matches(OsStr::new("OneDrive.exe")));
        assert!(client.matches(OsStr::new("onedrive")));
        assert!(!client.matches(OsStr::new("OneDriveStandaloneUpdater.exe")));
    }

    #[test]
    fn test_launch_without_executable() {
        let config = ClientConfig {
            executable_paths: vec![PathBuf::from("/nonexistent/OneDrive.exe")],
            ..ClientConfig::default()
        };
        let client = SysinfoClient::new(&config, Arc::new(VirtualClock::starting_now()));
        assert!(matches!(
            client.launch(),
            Err(ClientError::NotInstalled { tried: 1 })
        ));
    }

    #[test]
    fn test_null_client() {
        let client = NullClient;
        assert_eq!(client.status().unwrap(), ClientStatus::NotRunning);
        assert!(matches!(client.restart(), Err(ClientError::Disabled)));
    }

    #[test]
    fn test_status_helpers() {
        assert!(!ClientStatus::NotRunning.is_running());
        assert!(ClientStatus::Idle.is_running());
        assert!(!ClientStatus::Idle.is_active());
        assert!(ClientStatus::Active.is_active());
    }

    #[test]
    fn test_disabled_config_gives_null_client() {
        let config = ClientConfig {
            enabled: false,
            ..ClientConfig::default()
        };
        let client = client_from_config(&config, Arc::new(VirtualClock::starting_now()));
        assert_eq!(client.name(), "none");
    }
}
