//! Integration tests for the configuration system

use std::path::PathBuf;
use syncguard_config::{
    BusinessDay, Config, ConfigManager, ConfigSection, EngineConfig, LogLevel, PolicyConfig,
    CONFIG_VERSION,
};
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_full_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let created = manager.initialize()?;
    assert!(created);

    let config = manager.load()?;
    assert_eq!(config.version, CONFIG_VERSION);

    let mut modified = config.clone();
    modified.paths.source = PathBuf::from("/data/catalogo.xlsx");
    modified.paths.destination = PathBuf::from("/share/catalogo.xlsx");
    modified.engine.max_copy_attempts = 5;
    manager.save(&modified)?;

    let reloaded = manager.load()?;
    assert_eq!(reloaded.paths.source, PathBuf::from("/data/catalogo.xlsx"));
    assert_eq!(reloaded.engine.max_copy_attempts, 5);

    manager.reset()?;
    let after_reset = manager.load()?;
    assert_eq!(after_reset, Config::default());

    Ok(())
}

#[test]
fn test_config_validation_integration() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    manager.save(&Config::default())?;
    assert!(manager.validate()?.is_empty());

    let mut invalid = Config::default();
    invalid.policy.business_hours_start = 20;
    invalid.policy.business_hours_end = 9;
    assert!(manager.save(&invalid).is_err());

    Ok(())
}

#[test]
fn test_hand_written_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    std::fs::write(
        manager.config_path(),
        r#"
[app]
log_level = "debug"

[paths]
source = "/data/precios.xlsx"
destination = "/share/precios.xlsx"

[policy]
business_hours_start = 9
business_hours_end = 17
business_days = ["monday", "wednesday"]

[client]
enabled = false
"#,
    )?;

    let config = manager.load()?;
    assert_eq!(config.app.log_level, LogLevel::Debug);
    assert_eq!(
        config.policy.business_days,
        vec![BusinessDay::Monday, BusinessDay::Wednesday]
    );
    assert!(!config.client.enabled);
    assert_eq!(config.engine, EngineConfig::default());
    assert!(config.validate().is_ok());

    Ok(())
}

#[test]
fn test_section_names_are_distinct() {
    let config = Config::default();
    let names = [
        config.app.section_name(),
        config.paths.section_name(),
        config.engine.section_name(),
        config.policy.section_name(),
        config.client.section_name(),
        config.maintenance.section_name(),
    ];
    let mut sorted = names.to_vec();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), names.len());
}

#[test]
fn test_policy_merge_replaces_keywords() {
    let mut base = PolicyConfig::default();
    base.merge(PolicyConfig {
        critical_keywords: vec!["promo".to_string()],
        ..Default::default()
    });
    assert_eq!(base.critical_keywords, vec!["promo"]);
}
