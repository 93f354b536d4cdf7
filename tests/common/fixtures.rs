use codescan::source::{CaptureDevice, CaptureSettings, FrameSource};
use codescan::{DetectedCode, DeviceError, EndOfStream, Frame, ScannerConfig};
use codescan::detection::Detect;
use image::{DynamicImage, GrayImage, Luma};
use qrcode::{Color as QrColor, QrCode};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Renders `text` as a black-on-white QR code with `module_px` pixels per
/// module and a 4-module quiet zone.
pub fn qr_image(text: &str, module_px: u32) -> GrayImage {
    let code = QrCode::new(text.as_bytes()).expect("Failed to encode QR code");
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let quiet = 4;
    let size = (modules + 2 * quiet) * module_px;

    GrayImage::from_fn(size, size, |x, y| {
        let mx = (x / module_px) as i64 - quiet as i64;
        let my = (y / module_px) as i64 - quiet as i64;
        if mx < 0 || my < 0 || mx >= modules as i64 || my >= modules as i64 {
            return Luma([255u8]);
        }
        match colors[(my as u32 * modules + mx as u32) as usize] {
            QrColor::Dark => Luma([0u8]),
            QrColor::Light => Luma([255u8]),
        }
    })
}

/// QR code as a 3-channel frame, like a camera would deliver it
pub fn qr_frame(text: &str) -> Frame {
    let gray = qr_image(text, 8);
    Frame::new(1, DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(gray).to_rgb8()))
}

/// Uniform frame of the given gray level
pub fn blank_frame(width: u32, height: u32, level: u8) -> Frame {
    Frame::new(1, DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([level]))))
}

/// Horizontal black/white bands producing exactly `transitions` row changes
pub fn banded_region(width: u32, height: u32, transitions: u32) -> GrayImage {
    let bands = transitions + 1;
    GrayImage::from_fn(width, height, |_, y| {
        let band = y * bands / height;
        if band % 2 == 0 { Luma([255u8]) } else { Luma([0u8]) }
    })
}

/// Bands of fixed pixel height
pub fn striped_region(width: u32, height: u32, band_px: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |_, y| {
        if (y / band_px) % 2 == 0 { Luma([255u8]) } else { Luma([0u8]) }
    })
}

pub fn code(data: &str) -> DetectedCode {
    DetectedCode::qr(data, codescan::SourceMethod::DirectQr)
}

/// Config that paces the loop at 1 ms per frame
pub fn fast_config() -> ScannerConfig {
    let mut config = ScannerConfig::default();
    config.capture.fps = 1000;
    config.preview_buffer = 64;
    config
}

/// What a [`TrackedSource`] observed
#[derive(Clone, Default)]
pub struct SourceStats {
    pub opened: Arc<AtomicBool>,
    pub released: Arc<AtomicBool>,
    pub reads: Arc<AtomicUsize>,
}

impl SourceStats {
    pub fn opened(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// Synthetic camera 0 that records open/read/release calls.
/// `frame_limit` of `None` produces frames forever.
pub struct TrackedSource {
    frame_limit: Option<usize>,
    stats: SourceStats,
}

impl TrackedSource {
    pub fn new(frame_limit: Option<usize>) -> (Self, SourceStats) {
        let stats = SourceStats::default();
        (
            Self {
                frame_limit,
                stats: stats.clone(),
            },
            stats,
        )
    }
}

impl FrameSource for TrackedSource {
    type Device = TrackedDevice;

    fn open(&mut self, device_index: u32, _settings: &CaptureSettings) -> Result<TrackedDevice, DeviceError> {
        if device_index != 0 {
            return Err(DeviceError::NotFound(device_index));
        }
        self.stats.opened.store(true, Ordering::SeqCst);
        Ok(TrackedDevice {
            frame_limit: self.frame_limit,
            stats: self.stats.clone(),
        })
    }
}

pub struct TrackedDevice {
    frame_limit: Option<usize>,
    stats: SourceStats,
}

impl CaptureDevice for TrackedDevice {
    fn read_frame(&mut self) -> Result<DynamicImage, EndOfStream> {
        let served = self.stats.reads();
        if let Some(limit) = self.frame_limit {
            if served >= limit {
                return Err(EndOfStream("synthetic source exhausted".to_string()));
            }
        }
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        Ok(DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 24, Luma([200u8]))))
    }

    fn resolution(&self) -> (u32, u32) {
        (32, 24)
    }

    fn release(self) {
        self.stats.released.store(true, Ordering::SeqCst);
    }
}

/// Detector that records which frames it ran on and reports fixed codes
#[derive(Clone, Default)]
pub struct CountingDetector {
    pub frames: Arc<Mutex<Vec<u64>>>,
    pub emits: Vec<DetectedCode>,
}

impl CountingDetector {
    pub fn emitting(emits: Vec<DetectedCode>) -> Self {
        Self {
            frames: Arc::default(),
            emits,
        }
    }

    pub fn calls(&self) -> Vec<u64> {
        self.frames.lock().unwrap().clone()
    }
}

impl Detect for CountingDetector {
    fn detect(&self, frame: &Frame) -> Vec<DetectedCode> {
        self.frames.lock().unwrap().push(frame.index);
        self.emits.clone()
    }
}

/// Fill `[x0, x1) x [y0, y1)` with `level`
pub fn fill_rect(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, level: u8) {
    for y in y0..y1.min(img.height()) {
        for x in x0..x1.min(img.width()) {
            img.put_pixel(x, y, Luma([level]));
        }
    }
}

/// Horizontal bars across most of a white 320x240 frame, like a barcode held
/// close to the camera. Bars are 6 px with 6 px gaps over rows 30..210.
pub fn close_barcode_frame() -> Frame {
    let mut img = GrayImage::from_pixel(320, 240, Luma([255u8]));
    for band in 0..30 {
        if band % 2 == 0 {
            let y = 30 + band * 6;
            fill_rect(&mut img, 40, y, 280, y + 6, 0);
        }
    }
    Frame::new(1, DynamicImage::ImageLuma8(img))
}

/// A light 200x150 label at (100, 75) on a black 400x300 frame, carrying
/// 5 px horizontal bars over rows 85..215.
pub fn barcode_label_frame() -> Frame {
    let mut img = GrayImage::new(400, 300);
    fill_rect(&mut img, 100, 75, 300, 225, 230);
    for band in 0..26 {
        if band % 2 == 0 {
            let y = 85 + band * 5;
            fill_rect(&mut img, 110, y, 290, y + 5, 0);
        }
    }
    Frame::new(1, DynamicImage::ImageLuma8(img))
}

/// A small QR code (with its quiet zone) among unrelated shapes on a dark frame
pub fn cluttered_qr_frame(text: &str) -> Frame {
    let mut img = GrayImage::from_pixel(480, 360, Luma([0u8]));
    fill_rect(&mut img, 20, 30, 220, 38, 255);
    fill_rect(&mut img, 40, 120, 52, 132, 200);
    fill_rect(&mut img, 90, 250, 102, 262, 180);
    fill_rect(&mut img, 420, 40, 430, 50, 255);

    let qr = qr_image(text, 4);
    image::imageops::replace(&mut img, &qr, 300, 200);
    Frame::new(1, DynamicImage::ImageLuma8(img))
}
