mod common;

use anyhow::Result;
use common::*;
use std::time::Duration;

#[test]
fn test_defaults() {
    let config = ScannerConfig::default();

    assert_eq!(config.frame_skip, 3);
    assert_eq!(config.capture.width, 1280);
    assert_eq!(config.capture.height, 720);
    assert_eq!(config.capture.fps, 30);
    assert!(config.capture.autofocus);
    // 30 fps / 3 = 10 processed frames per second, for 2 seconds
    assert_eq!(config.cooldown_frames(), 20);
}

#[test]
fn test_cooldown_with_zero_frame_skip() {
    let mut config = ScannerConfig::default();
    config.frame_skip = 0;

    assert_eq!(config.cooldown_frames(), 60);
}

#[test]
fn test_cooldown_never_zero() {
    let mut config = ScannerConfig::default();
    config.cooldown_secs = 0.0;

    assert_eq!(config.cooldown_frames(), 1);
}

#[test]
fn test_frame_interval() {
    let mut config = ScannerConfig::default();
    config.capture.fps = 50;
    assert_eq!(config.capture.frame_interval(), Duration::from_millis(20));

    config.capture.fps = 0;
    assert_eq!(config.capture.frame_interval(), Duration::ZERO);
}

#[test]
fn test_load_partial_file() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("scanner.json");
    std::fs::write(
        &path,
        r#"{
            "frame_skip": 5,
            "capture": { "fps": 15 },
            "detection": { "contour": { "enabled": false } }
        }"#,
    )?;

    let config = ScannerConfig::load(&path)?;

    assert_eq!(config.frame_skip, 5);
    assert_eq!(config.capture.fps, 15);
    assert_eq!(config.capture.width, 1280);
    assert!(!config.detection.contour.enabled);
    assert!(config.detection.morphology.enabled);
    assert_eq!(config.detection.classifier.min_transitions, 15);
    assert_eq!(CodeDetector::from_config(&config.detection).method_names().len(), 2);
    Ok(())
}

#[test]
fn test_load_invalid_file() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ frame_skip: ")?;

    assert!(ScannerConfig::load(&path).is_err());
    assert!(ScannerConfig::load(dir.path().join("missing.json")).is_err());
    Ok(())
}
