//! Frame acquisition.
//!
//! A [`FrameSource`] opens a device by index and hands back a
//! [`CaptureDevice`] that owns the hardware until it is released. The capture
//! worker opens the device on its own thread, so devices need not be `Send`.

pub mod replay;
#[cfg(feature = "camera")]
pub mod camera;

use image::DynamicImage;

use crate::error::{DeviceError, EndOfStream};

pub use crate::config::CaptureSettings;
pub use replay::ReplaySource;
#[cfg(feature = "camera")]
pub use camera::CameraSource;

pub trait FrameSource: Send + 'static {
    type Device: CaptureDevice;

    /// Open the device and configure resolution, frame rate and autofocus
    /// where the device supports them.
    fn open(&mut self, device_index: u32, settings: &CaptureSettings) -> Result<Self::Device, DeviceError>;
}

pub trait CaptureDevice {
    /// Block until the next frame is available.
    fn read_frame(&mut self) -> Result<DynamicImage, EndOfStream>;

    /// Resolution actually delivered by the device
    fn resolution(&self) -> (u32, u32);

    /// Give up the hardware
    fn release(self);
}
