//! The three detection strategies run on each processed frame.
//!
//! Only [`DirectQr`] (and the QR branch of [`ContourPattern`]) decodes content.
//! The pattern methods flag regions whose row structure looks like a 1-D
//! barcode and label them with their position and size, so the same physical
//! barcode can get a different identifier whenever it moves.

use anyhow::Result;
use image::DynamicImage;
use std::borrow::Cow;

use super::classifier::BarcodeClassifier;
use super::preprocessing::{self, LineDirection};
use super::{DetectionContext, DetectionInput, DetectionMethod, contours, qr};
use crate::config::{ContourConfig, DirectQrConfig, MorphologyConfig};
use crate::models::{DetectedCode, SourceMethod};

/// Whole-frame QR decode with escalating preprocessing.
///
/// Tries the frame as captured, then a luma conversion, then a
/// histogram-equalized copy, stopping at the first attempt that decodes.
#[derive(Debug, Clone, Default)]
pub struct DirectQr {
    config: DirectQrConfig,
}

impl DirectQr {
    pub fn new(config: DirectQrConfig) -> Self {
        Self { config }
    }
}

impl DetectionMethod for DirectQr {
    fn detect(&self, input: &DetectionInput<'_>, context: &DetectionContext) -> Result<Vec<DetectedCode>> {
        let frame = input.frame;

        let raw = match frame.image.as_ref() {
            DynamicImage::ImageLuma8(gray) => Cow::Borrowed(gray),
            other => Cow::Owned(preprocessing::channel_mean(other)),
        };
        let found = qr::decode_all(&raw);
        if !found.is_empty() {
            return Ok(to_codes(found));
        }

        let found = qr::decode_all(&input.gray);
        if !found.is_empty() {
            log::debug!("frame {}: QR decoded after grayscale conversion", frame.index);
            return Ok(to_codes(found));
        }

        if self.config.equalize {
            let enhanced = preprocessing::equalize(&input.gray);
            context.save_debug(frame.index, self.name(), "equalized", &enhanced);
            let found = qr::decode_all(&enhanced);
            if !found.is_empty() {
                log::debug!("frame {}: QR decoded after equalization", frame.index);
                return Ok(to_codes(found));
            }
        }

        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "Direct QR"
    }
}

fn to_codes(found: Vec<String>) -> Vec<DetectedCode> {
    found
        .into_iter()
        .map(|data| DetectedCode::qr(data, SourceMethod::DirectQr))
        .collect()
}

/// Barcode region search through directional morphology.
pub struct MorphologyPattern {
    config: MorphologyConfig,
    classifier: BarcodeClassifier,
}

impl MorphologyPattern {
    pub fn new(config: MorphologyConfig, classifier: BarcodeClassifier) -> Self {
        Self { config, classifier }
    }
}

impl DetectionMethod for MorphologyPattern {
    fn detect(&self, input: &DetectionInput<'_>, context: &DetectionContext) -> Result<Vec<DetectedCode>> {
        let cfg = &self.config;
        let index = input.frame.index;

        let blurred = preprocessing::apply_blur(&input.gray, cfg.blur_sigma);
        let thresh = preprocessing::binarize_adaptive(&blurred, cfg.block_radius);
        let horizontal = preprocessing::open_directional(&thresh, cfg.line_length, LineDirection::Horizontal);
        let vertical = preprocessing::open_directional(&thresh, cfg.line_length, LineDirection::Vertical);
        let combined = preprocessing::add_weighted(&horizontal, 0.5, &vertical, 0.5);

        context.save_debug(index, self.name(), "threshold", &thresh);
        context.save_debug(index, self.name(), "combined", &combined);

        let mut codes = Vec::new();
        for contour in contours::find_external_contours(&combined) {
            if contour.area <= cfg.min_area {
                continue;
            }
            let aspect = contour.aspect_ratio();
            if aspect <= cfg.min_aspect || aspect >= cfg.max_aspect {
                continue;
            }
            let Some(region) = contour.extract_roi(&input.gray) else {
                continue;
            };
            if self.classifier.looks_like_barcode(&region.pixels) {
                let id = region.bbox.identifier("BARCODE");
                log::debug!("frame {}: barcode-like region {}", index, id);
                codes.push(DetectedCode::barcode(id, SourceMethod::MorphologyPattern));
            }
        }

        Ok(codes)
    }

    fn name(&self) -> &str {
        "Morphology Pattern"
    }
}

/// Edge-contour region search with a scoped QR decode per region.
pub struct ContourPattern {
    config: ContourConfig,
    classifier: BarcodeClassifier,
}

impl ContourPattern {
    pub fn new(config: ContourConfig, classifier: BarcodeClassifier) -> Self {
        Self { config, classifier }
    }
}

impl DetectionMethod for ContourPattern {
    fn detect(&self, input: &DetectionInput<'_>, context: &DetectionContext) -> Result<Vec<DetectedCode>> {
        let cfg = &self.config;
        let index = input.frame.index;

        let edges = preprocessing::detect_edges(&input.gray, cfg.canny_low, cfg.canny_high);
        context.save_debug(index, self.name(), "edges", &edges);

        let mut codes = Vec::new();
        for contour in contours::find_external_contours(&edges) {
            if contour.area < cfg.min_area || contour.area > cfg.max_area {
                continue;
            }
            let aspect = contour.aspect_ratio();
            if aspect <= cfg.min_aspect || aspect >= cfg.max_aspect {
                continue;
            }
            let Some(region) = contour.extract_roi(&input.gray) else {
                continue;
            };

            if let Some(data) = qr::decode_first(&region.pixels) {
                log::debug!("frame {}: QR decoded in region {:?}", index, region.bbox);
                codes.push(DetectedCode::qr(data, SourceMethod::ContourPattern));
            } else if self.classifier.looks_like_barcode(&region.pixels) {
                let id = region.bbox.identifier("CONTOUR");
                log::debug!("frame {}: barcode-like contour {}", index, id);
                codes.push(DetectedCode::barcode(id, SourceMethod::ContourPattern));
            }
        }

        Ok(codes)
    }

    fn name(&self) -> &str {
        "Contour Pattern"
    }
}
