use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{adaptive_threshold, equalize_histogram};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{Mask, grayscale_open};

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Unweighted channel mean, the decoder's view of a raw color frame
pub fn channel_mean(img: &DynamicImage) -> GrayImage {
    let rgb = img.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let p = rgb.get_pixel(x, y);
        let sum = p[0] as u16 + p[1] as u16 + p[2] as u16;
        Luma([(sum / 3) as u8])
    })
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Stretch contrast by histogram equalization
pub fn equalize(img: &GrayImage) -> GrayImage {
    equalize_histogram(img)
}

/// Binarize against the local mean of a (2r+1)x(2r+1) block
pub fn binarize_adaptive(img: &GrayImage, block_radius: u32) -> GrayImage {
    adaptive_threshold(img, block_radius)
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDirection {
    Horizontal,
    Vertical,
}

/// Longest line a morphology mask can hold
const MAX_LINE_LENGTH: u32 = 511;

/// Morphological opening with a 1-pixel-thick line of `length` pixels.
///
/// Keeps only foreground runs at least as long as the line in the given
/// direction.
pub fn open_directional(img: &GrayImage, length: u32, direction: LineDirection) -> GrayImage {
    if length <= 1 {
        return img.clone();
    }
    grayscale_open(img, &line_mask(length, direction))
}

/// Line-shaped structuring element centred on its middle pixel
fn line_mask(length: u32, direction: LineDirection) -> Mask {
    let length = length.min(MAX_LINE_LENGTH);
    let center = ((length - 1) / 2) as u8;
    match direction {
        LineDirection::Horizontal => {
            Mask::from_image(&GrayImage::from_pixel(length, 1, Luma([255u8])), center, 0)
        }
        LineDirection::Vertical => {
            Mask::from_image(&GrayImage::from_pixel(1, length, Luma([255u8])), 0, center)
        }
    }
}

/// Per-pixel `a * alpha + b * beta`, saturated to u8
pub fn add_weighted(a: &GrayImage, alpha: f32, b: &GrayImage, beta: f32) -> GrayImage {
    let (width, height) = a.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let va = a.get_pixel(x, y)[0] as f32;
        let vb = b
            .get_pixel_checked(x, y)
            .map(|p| p[0] as f32)
            .unwrap_or(0.0);
        Luma([(va * alpha + vb * beta).round().clamp(0.0, 255.0) as u8])
    })
}
