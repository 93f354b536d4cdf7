use image::{DynamicImage, GrayImage};
use std::fmt;
use std::sync::Arc;

/// One captured image plus its position in the capture sequence.
///
/// Cloning is cheap: the pixel buffer is shared and never mutated after capture.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub image: Arc<DynamicImage>,
}

impl Frame {
    pub fn new(index: u64, image: DynamicImage) -> Self {
        Self {
            index,
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn channels(&self) -> u8 {
        self.image.color().channel_count()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Bounding box in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }

    /// Positional identifier used for regions that are flagged but not decoded.
    pub fn identifier(&self, prefix: &str) -> String {
        format!("{}_{}_{}_{}_{}", prefix, self.x, self.y, self.width, self.height)
    }
}

/// A rectangle of a frame together with the grayscale pixels it bounds.
#[derive(Debug, Clone)]
pub struct Region {
    pub bbox: BoundingBox,
    pub pixels: GrayImage,
}

impl Region {
    /// Crop `bbox` out of `gray`. Returns `None` for zero-area or out-of-bounds boxes.
    pub fn crop(gray: &GrayImage, bbox: BoundingBox) -> Option<Self> {
        if bbox.width == 0 || bbox.height == 0 {
            return None;
        }
        let (img_w, img_h) = gray.dimensions();
        if bbox.x >= img_w || bbox.y >= img_h {
            return None;
        }
        let width = bbox.width.min(img_w - bbox.x);
        let height = bbox.height.min(img_h - bbox.y);
        let pixels = image::imageops::crop_imm(gray, bbox.x, bbox.y, width, height).to_image();
        Some(Self {
            bbox: BoundingBox { width, height, ..bbox },
            pixels,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }
}

/// External contour summarised by its bounding box and enclosed area
#[derive(Debug, Clone)]
pub struct Contour {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub area: f64,
}

impl Contour {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.bounding_box().aspect_ratio()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            x: self.min_x,
            y: self.min_y,
            width: self.width(),
            height: self.height(),
        }
    }

    /// Extract the bounded region from a grayscale frame
    pub fn extract_roi(&self, gray: &GrayImage) -> Option<Region> {
        Region::crop(gray, self.bounding_box())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeKind {
    Qr,
    Barcode,
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeKind::Qr => write!(f, "QR"),
            CodeKind::Barcode => write!(f, "BARCODE"),
        }
    }
}

/// Which detection strategy produced a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceMethod {
    DirectQr,
    MorphologyPattern,
    ContourPattern,
}

impl fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceMethod::DirectQr => "direct-qr",
            SourceMethod::MorphologyPattern => "morphology",
            SourceMethod::ContourPattern => "contour",
        };
        f.write_str(name)
    }
}

/// A recognised or heuristically flagged code.
///
/// Two values with equal `data` are the same code, whichever method found them.
/// For `CodeKind::Barcode` the `data` is a positional identifier of the flagged
/// region (`BARCODE_x_y_w_h` / `CONTOUR_x_y_w_h`), not decoded symbol content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCode {
    pub data: String,
    pub kind: CodeKind,
    pub source: SourceMethod,
}

impl DetectedCode {
    pub fn qr(data: impl Into<String>, source: SourceMethod) -> Self {
        Self {
            data: data.into(),
            kind: CodeKind::Qr,
            source,
        }
    }

    pub fn barcode(data: impl Into<String>, source: SourceMethod) -> Self {
        Self {
            data: data.into(),
            kind: CodeKind::Barcode,
            source,
        }
    }
}
