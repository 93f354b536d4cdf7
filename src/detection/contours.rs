use image::{GrayImage, imageops};
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;
use crate::models::Contour;

/// Find the outermost contours of the non-zero pixels in a binary image.
///
/// Holes and contours nested inside another contour are skipped. Regions
/// touching the image edge are reported like any other.
pub fn find_external_contours(binary: &GrayImage) -> Vec<Contour> {
    let (width, height) = binary.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    // Surround the image with background so edge-touching regions get an outer border
    let mut padded = GrayImage::new(width + 2, height + 2);
    imageops::replace(&mut padded, binary, 1, 1);

    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .filter_map(|c| {
            let points: Vec<Point<i32>> = c.points.iter().map(|p| Point::new(p.x - 1, p.y - 1)).collect();
            summarize(&points)
        })
        .collect()
}

fn summarize(points: &[Point<i32>]) -> Option<Contour> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(Contour {
        min_x: min_x.max(0) as u32,
        min_y: min_y.max(0) as u32,
        max_x: max_x.max(0) as u32,
        max_y: max_y.max(0) as u32,
        area: polygon_area(points),
    })
}

/// Area enclosed by the contour polygon (shoelace formula)
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    twice_area.abs() as f64 / 2.0
}
