// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use depthstats::backends::SourceKind;
use depthstats::{Config, DisplayMode};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.mode, DisplayMode::Verbose);
    assert_eq!(config.source, SourceKind::Auto);
    assert_eq!(config.statistics.degradation_threshold_percent, 35);
    assert_eq!(config.tilt, Some(-5), "Sensor should tilt slightly down by default");
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        mode: DisplayMode::MeanScaled,
        device: Some("/dev/video1".to_string()),
        tilt: None,
        ..Config::default()
    };
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = Config::load(&dir.path().join("absent.json")).unwrap();
    assert_eq!(loaded, Config::default());
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    std::fs::write(&path, "{ not json").unwrap();
    assert!(Config::load(&path).is_err());

    // Sentinel outside the code domain
    std::fs::write(
        &path,
        r#"{ "statistics": { "domain_size": 1024, "sentinel_code": 2047 } }"#,
    )
    .unwrap();
    assert!(Config::load(&path).is_err());
}

#[test]
fn test_calibration_table_matches_domain() {
    let config = Config::default();
    let table = config.calibration_table();
    assert_eq!(table.len(), config.statistics.domain_size);
    assert!(table.distance(0) > 0.0);
}
