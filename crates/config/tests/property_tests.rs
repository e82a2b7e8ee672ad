//! Property-based tests for configuration system

use proptest::prelude::*;
use syncguard_config::{Config, ConfigManager, PolicyConfig};
use tempfile::TempDir;

#[test]
fn property_serialization_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let toml_string = toml::to_string(&config)?;
    let deserialized: Config = toml::from_str(&toml_string)?;
    assert_eq!(config, deserialized);
    Ok(())
}

#[test]
fn property_load_save_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;

    manager.save(&Config::default())?;
    let loaded = manager.load()?;
    manager.save(&loaded)?;
    let loaded2 = manager.load()?;
    assert_eq!(loaded, loaded2);
    Ok(())
}

proptest! {
    #[test]
    fn property_attempt_range_matches_validation(attempts in 0u32..20) {
        let mut config = Config::default();
        config.engine.max_copy_attempts = attempts;
        prop_assert_eq!(config.validate().is_ok(), (1..=10).contains(&attempts));
    }

    #[test]
    fn property_business_window_respects_bounds(start in 0u32..24, len in 1u32..12, hour in 0u32..24) {
        let end = (start + len).min(24);
        prop_assume!(start < end);
        let policy = PolicyConfig {
            business_hours_start: start,
            business_hours_end: end,
            ..Default::default()
        };
        let inside = policy.is_business_time(chrono::Weekday::Tue, hour);
        prop_assert_eq!(inside, hour >= start && hour < end);
        prop_assert!(!policy.is_business_time(chrono::Weekday::Sun, hour));
    }

    #[test]
    fn property_critical_match_ignores_case(prefix in "[a-z]{0,6}", upper in any::<bool>()) {
        let policy = PolicyConfig::default();
        let keyword = if upper { "CATALOGO" } else { "catalogo" };
        let name = format!("{}{}.xlsx", prefix, keyword);
        prop_assert!(policy.is_critical_name(&name));
    }
}
