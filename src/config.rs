//! Scanner configuration, loadable from JSON.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub capture: CaptureSettings,
    /// Run detection on every Nth captured frame
    pub frame_skip: u32,
    /// Length of the shared dedup cooldown window
    pub cooldown_secs: f32,
    /// Preview frames buffered per observer before the oldest are dropped
    pub preview_buffer: usize,
    pub detection: DetectionConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            capture: CaptureSettings::default(),
            frame_skip: 3,
            cooldown_secs: 2.0,
            preview_buffer: 4,
            detection: DetectionConfig::default(),
        }
    }
}

impl ScannerConfig {
    /// Load a config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Cooldown window expressed in processed (not captured) frames.
    pub fn cooldown_frames(&self) -> u32 {
        let processed_per_sec = self.capture.fps.max(1) as f32 / self.frame_skip.max(1) as f32;
        ((processed_per_sec * self.cooldown_secs).ceil() as u32).max(1)
    }
}

/// Requested capture format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub autofocus: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            autofocus: true,
        }
    }
}

impl CaptureSettings {
    pub fn frame_interval(&self) -> Duration {
        if self.fps == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(1.0 / self.fps as f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub direct_qr: DirectQrConfig,
    pub morphology: MorphologyConfig,
    pub contour: ContourConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectQrConfig {
    pub enabled: bool,
    /// Try a histogram-equalized copy when plain grayscale fails
    pub equalize: bool,
}

impl Default for DirectQrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            equalize: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    pub enabled: bool,
    pub blur_sigma: f32,
    pub block_radius: u32,
    /// Length of the structuring line used for the directional openings
    pub line_length: u32,
    pub min_area: f64,
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            blur_sigma: 1.1,
            block_radius: 5,
            line_length: 25,
            min_area: 1000.0,
            min_aspect: 0.5,
            max_aspect: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    pub enabled: bool,
    pub canny_low: f32,
    pub canny_high: f32,
    pub min_area: f64,
    pub max_area: f64,
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            canny_low: 50.0,
            canny_high: 150.0,
            min_area: 500.0,
            max_area: 50_000.0,
            min_aspect: 0.3,
            max_aspect: 3.0,
        }
    }
}

/// Parameters of the transition-count barcode test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub normalized_width: u32,
    pub normalized_height: u32,
    pub threshold: u8,
    /// Exclusive lower bound on row-mean transitions
    pub min_transitions: u32,
    /// Exclusive upper bound on row-mean transitions
    pub max_transitions: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            normalized_width: 100,
            normalized_height: 100,
            threshold: 127,
            min_transitions: 15,
            max_transitions: 80,
        }
    }
}
