pub mod preprocessing;
pub mod contours;
pub mod classifier;
pub mod qr;
pub mod methods;

use anyhow::{Context, Result};
use image::GrayImage;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use crate::config::DetectionConfig;
use crate::models::{DetectedCode, Frame};
use methods::{ContourPattern, DirectQr, MorphologyPattern};

pub use classifier::{BarcodeClassifier, looks_like_barcode};

/// Anything the capture loop can run on a processed frame.
///
/// Implementations must not fail: problems are handled (and logged) inside,
/// and show up as an empty result.
pub trait Detect: Send + 'static {
    fn detect(&self, frame: &Frame) -> Vec<DetectedCode>;
}

/// One detection strategy
pub trait DetectionMethod: Send + Sync {
    /// Find candidate codes in one frame. Order of the result is not significant.
    fn detect(&self, input: &DetectionInput<'_>, context: &DetectionContext) -> Result<Vec<DetectedCode>>;

    /// Human-readable name for this method (used in logs and debug output)
    fn name(&self) -> &str;
}

/// A frame together with its grayscale conversion, shared by all methods
pub struct DetectionInput<'a> {
    pub frame: &'a Frame,
    pub gray: GrayImage,
}

impl<'a> DetectionInput<'a> {
    pub fn from_frame(frame: &'a Frame) -> Self {
        Self {
            frame,
            gray: preprocessing::to_grayscale(&frame.image),
        }
    }
}

/// Debug configuration for detection runs
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

/// Context available to all detection methods
#[derive(Clone, Debug, Default)]
pub struct DetectionContext {
    pub debug: Option<DebugConfig>,
}

impl DetectionContext {
    /// Save an intermediate image if debug mode is enabled.
    ///
    /// Files land in `<output_dir>/frame_<index>/<method>_<stage>.png`. A
    /// failed write is logged and does not affect detection.
    pub fn save_debug(&self, frame_index: u64, method: &str, stage: &str, img: &GrayImage) {
        if let Err(e) = self.write_debug(frame_index, method, stage, img) {
            log::warn!("frame {}: {} debug image not saved: {:#}", frame_index, method, e);
        }
    }

    fn write_debug(&self, frame_index: u64, method: &str, stage: &str, img: &GrayImage) -> Result<()> {
        let Some(debug_config) = &self.debug else {
            return Ok(());
        };
        if !debug_config.enabled {
            return Ok(());
        }

        let frame_dir = debug_config.output_dir.join(format!("frame_{:04}", frame_index));
        std::fs::create_dir_all(&frame_dir)
            .with_context(|| format!("Failed to create debug directory {}", frame_dir.display()))?;

        let filename = format!(
            "{}_{}.png",
            method.to_lowercase().replace(' ', "_"),
            stage.to_lowercase().replace(' ', "_")
        );
        let output_path = frame_dir.join(&filename);
        img.save(&output_path)
            .with_context(|| format!("Failed to save debug image {}", output_path.display()))?;
        log::debug!("saved debug image {}", output_path.display());

        Ok(())
    }
}

/// Runs every configured detection method on a frame and pools the results.
///
/// A method that errors or panics contributes nothing for that frame; the
/// others still run.
pub struct CodeDetector {
    methods: Vec<Box<dyn DetectionMethod>>,
    context: DetectionContext,
}

impl CodeDetector {
    /// Detector with all three methods at their default settings
    pub fn new() -> Self {
        Self::from_config(&DetectionConfig::default())
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        let classifier = BarcodeClassifier::new(config.classifier.clone());
        let mut detector = Self::empty();

        if config.direct_qr.enabled {
            detector = detector.add_method(Box::new(DirectQr::new(config.direct_qr.clone())));
        }
        if config.morphology.enabled {
            detector = detector.add_method(Box::new(MorphologyPattern::new(
                config.morphology.clone(),
                classifier.clone(),
            )));
        }
        if config.contour.enabled {
            detector = detector.add_method(Box::new(ContourPattern::new(
                config.contour.clone(),
                classifier,
            )));
        }
        detector
    }

    /// Detector with no methods; add them with [`CodeDetector::add_method`]
    pub fn empty() -> Self {
        Self {
            methods: Vec::new(),
            context: DetectionContext::default(),
        }
    }

    pub fn add_method(mut self, method: Box<dyn DetectionMethod>) -> Self {
        self.methods.push(method);
        self
    }

    /// Enable debug image output.
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });

        Ok(self)
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.iter().map(|m| m.name()).collect()
    }

    /// Run all methods on one frame
    pub fn detect(&self, frame: &Frame) -> Vec<DetectedCode> {
        if frame.is_empty() {
            return Vec::new();
        }

        let input = DetectionInput::from_frame(frame);
        let mut codes = Vec::new();

        for method in &self.methods {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| method.detect(&input, &self.context)));
            match outcome {
                Ok(Ok(found)) => {
                    if !found.is_empty() {
                        log::debug!(
                            "frame {}: {} found {} candidate(s)",
                            frame.index,
                            method.name(),
                            found.len()
                        );
                    }
                    codes.extend(found);
                }
                Ok(Err(e)) => {
                    log::warn!("frame {}: {} detection failed: {:#}", frame.index, method.name(), e);
                }
                Err(_) => {
                    log::warn!("frame {}: {} detection panicked", frame.index, method.name());
                }
            }
        }

        codes
    }
}

impl Default for CodeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detect for CodeDetector {
    fn detect(&self, frame: &Frame) -> Vec<DetectedCode> {
        CodeDetector::detect(self, frame)
    }
}
