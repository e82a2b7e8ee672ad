// FILE: crates/cli/src/main.rs

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use syncguard_config::{ConfigManager, LogLevel};

mod commands;

fn build_cli() -> Command {
    Command::new("syncguard")
        .version("0.1.0")
        .author("SyncGuard Contributors")
        .about("Conflict-aware publishing of a local file into a cloud-synced folder")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .help("Path to the config file (defaults to the platform config directory)")
                .global(true),
        )
        .subcommand(Command::new("init").about("Write a default config file if none exists"))
        .subcommand(Command::new("validate").about("Check the config and the tracked paths"))
        .subcommand(Command::new("run").about("Watch the source file and sync every change until Ctrl-C"))
        .subcommand(
            Command::new("sync-once")
                .about("Run one sync cycle for the current source file")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the cycle report as JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("decide").about("Show what the policy would do right now, without copying"))
        .subcommand(Command::new("locks").about("List editor lock files next to the source and destination"))
        .subcommand(Command::new("cleanup").about("Remove old blocked markers and leftover nudge files"))
}

fn config_manager(path: Option<&String>) -> Result<ConfigManager> {
    match path {
        Some(path) => ConfigManager::with_config_file(PathBuf::from(path))
            .with_context(|| format!("Failed to open config file {}", path)),
        None => ConfigManager::new().context("Failed to locate the config directory"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    let manager = config_manager(matches.get_one::<String>("config"))?;

    // Config is read before the logger exists so its level can seed the filter.
    let config = manager.load_with_env_overrides();
    let default_level = config
        .as_ref()
        .map_or(LogLevel::Info, |c| c.app.log_level);
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_level.as_str()),
    )
    .init();

    match matches.subcommand() {
        Some(("init", _)) => commands::init(&manager),
        Some(("validate", _)) => commands::validate(&manager),
        Some(("run", _)) => {
            let config = config.context("Failed to load config")?;
            commands::run(config).await
        }
        Some(("sync-once", sub_matches)) => {
            let config = config.context("Failed to load config")?;
            commands::sync_once(config, sub_matches.get_flag("json")).await
        }
        Some(("decide", _)) => commands::decide(&config.context("Failed to load config")?),
        Some(("locks", _)) => commands::locks(&config.context("Failed to load config")?),
        Some(("cleanup", _)) => commands::cleanup(&config.context("Failed to load config")?),
        _ => {
            build_cli().print_help()?;
            Ok(())
        }
    }
}
