//! QR decoding using rqrr

use image::GrayImage;
use rqrr::PreparedImage;

/// Decode every QR symbol rqrr finds in a grayscale image.
///
/// Grids that are located but fail to decode, or decode to empty text, are
/// dropped.
pub fn decode_all(gray: &GrayImage) -> Vec<String> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut prepared =
        PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            gray.get_pixel(x as u32, y as u32)[0]
        });

    let mut results = Vec::new();
    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_, content)) if !content.is_empty() => results.push(content),
            Ok(_) => {}
            Err(e) => log::trace!("QR grid found but not decoded: {:?}", e),
        }
    }
    results
}

/// First non-empty QR payload in the image, if any
pub fn decode_first(gray: &GrayImage) -> Option<String> {
    decode_all(gray).into_iter().next()
}
