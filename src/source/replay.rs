use anyhow::Context;
use image::{DynamicImage, ImageReader};
use std::path::Path;
use std::sync::Arc;

use super::{CaptureDevice, CaptureSettings, FrameSource};
use crate::error::{DeviceError, EndOfStream};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

/// Plays a fixed sequence of images as camera 0.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: Arc<Vec<DynamicImage>>,
    looping: bool,
}

impl ReplaySource {
    pub fn new(frames: Vec<DynamicImage>) -> Self {
        Self {
            frames: Arc::new(frames),
            looping: false,
        }
    }

    /// Load every image file in `dir`, in file name order
    pub fn from_dir(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read replay directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let img = ImageReader::open(path)?
                .decode()
                .map_err(|e| anyhow::anyhow!("Failed to decode image {}: {}", path.display(), e))?;
            frames.push(img);
        }
        log::info!("loaded {} replay frame(s) from {}", frames.len(), dir.display());

        Ok(Self::new(frames))
    }

    /// Start over from the first frame instead of ending the stream
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for ReplaySource {
    type Device = ReplayDevice;

    fn open(&mut self, device_index: u32, _settings: &CaptureSettings) -> Result<ReplayDevice, DeviceError> {
        if device_index != 0 {
            return Err(DeviceError::NotFound(device_index));
        }
        Ok(ReplayDevice {
            frames: Arc::clone(&self.frames),
            position: 0,
            looping: self.looping,
        })
    }
}

pub struct ReplayDevice {
    frames: Arc<Vec<DynamicImage>>,
    position: usize,
    looping: bool,
}

impl CaptureDevice for ReplayDevice {
    fn read_frame(&mut self) -> Result<DynamicImage, EndOfStream> {
        if self.position >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Err(EndOfStream("replay finished".to_string()));
            }
            self.position = 0;
        }
        let frame = self.frames[self.position].clone();
        self.position += 1;
        Ok(frame)
    }

    fn resolution(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(|f| (f.width(), f.height()))
            .unwrap_or((0, 0))
    }

    fn release(self) {
        log::debug!("replay device released after {} frame(s)", self.position);
    }
}
