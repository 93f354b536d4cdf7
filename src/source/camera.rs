//! Webcam capture through nokhwa

use image::{DynamicImage, RgbImage};
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};

use super::{CaptureDevice, CaptureSettings, FrameSource};
use crate::error::{DeviceError, EndOfStream};

/// Opens system cameras by index
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraSource;

impl FrameSource for CameraSource {
    type Device = CameraDevice;

    fn open(&mut self, device_index: u32, settings: &CaptureSettings) -> Result<CameraDevice, DeviceError> {
        let resolution = Resolution::new(settings.width, settings.height);
        let formats_to_try = [
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
                resolution,
                FrameFormat::MJPEG,
                settings.fps,
            ))),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
                resolution,
                FrameFormat::YUYV,
                settings.fps,
            ))),
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
        ];

        let mut last_error = String::new();
        let mut camera = None;
        for requested in formats_to_try {
            match Camera::new(CameraIndex::Index(device_index), requested) {
                Ok(cam) => {
                    camera = Some(cam);
                    break;
                }
                Err(e) => {
                    log::debug!("camera {}: format request failed: {}", device_index, e);
                    last_error = e.to_string();
                }
            }
        }
        let mut camera = camera.ok_or(DeviceError::OpenFailed {
            index: device_index,
            reason: last_error,
        })?;

        camera.open_stream().map_err(|e| DeviceError::StreamFailed {
            index: device_index,
            reason: e.to_string(),
        })?;

        // nokhwa has no portable autofocus switch; drivers default to continuous AF
        if settings.autofocus {
            log::debug!("camera {}: autofocus left to the driver", device_index);
        }

        let actual = camera.resolution();
        log::info!(
            "camera {} opened: {} at {}x{}",
            device_index,
            camera.info().human_name(),
            actual.width(),
            actual.height()
        );

        Ok(CameraDevice { camera, index: device_index })
    }
}

pub struct CameraDevice {
    camera: Camera,
    index: u32,
}

impl CaptureDevice for CameraDevice {
    fn read_frame(&mut self) -> Result<DynamicImage, EndOfStream> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| EndOfStream(format!("camera {}: {}", self.index, e)))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| EndOfStream(format!("camera {}: frame decode failed: {}", self.index, e)))?;

        let (width, height) = (decoded.width(), decoded.height());
        let rgb = RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| EndOfStream(format!("camera {}: short frame buffer", self.index)))?;
        Ok(DynamicImage::ImageRgb8(rgb))
    }

    fn resolution(&self) -> (u32, u32) {
        let res = self.camera.resolution();
        (res.width(), res.height())
    }

    fn release(mut self) {
        if let Err(e) = self.camera.stop_stream() {
            log::warn!("camera {}: failed to stop stream: {}", self.index, e);
        }
        log::info!("camera {} released", self.index);
    }
}
