//! Transition-count test for 1-D barcode-like regions.
//!
//! The region is resized to a fixed size, binarized, reduced to one mean per
//! row, and the number of times consecutive row means cross the threshold is
//! counted. Striped content lands between the two bounds; flat regions fall
//! below and pixel noise above.

use image::GrayImage;
use image::imageops::{self, FilterType};

use crate::config::ClassifierConfig;

#[derive(Debug, Clone, Default)]
pub struct BarcodeClassifier {
    config: ClassifierConfig,
}

impl BarcodeClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Row-mean threshold crossings after normalization. `None` for an empty region.
    pub fn transitions(&self, region: &GrayImage) -> Option<u32> {
        let (width, height) = region.dimensions();
        if width == 0 || height == 0 {
            return None;
        }
        let cfg = &self.config;
        if cfg.normalized_width == 0 || cfg.normalized_height == 0 {
            return None;
        }

        let normalized = imageops::resize(
            region,
            cfg.normalized_width,
            cfg.normalized_height,
            FilterType::Nearest,
        );

        let threshold = cfg.threshold as u32;
        let row_above: Vec<bool> = normalized
            .rows()
            .map(|row| {
                let (sum, count) = row.fold((0u32, 0u32), |(sum, count), p| {
                    let bit = if p[0] as u32 > threshold { 255 } else { 0 };
                    (sum + bit, count + 1)
                });
                sum / count.max(1) > threshold
            })
            .collect();

        Some(row_above.windows(2).filter(|w| w[0] != w[1]).count() as u32)
    }

    pub fn looks_like_barcode(&self, region: &GrayImage) -> bool {
        match self.transitions(region) {
            Some(t) => t > self.config.min_transitions && t < self.config.max_transitions,
            None => false,
        }
    }
}

/// Classify with the default parameters
pub fn looks_like_barcode(region: &GrayImage) -> bool {
    BarcodeClassifier::default().looks_like_barcode(region)
}
