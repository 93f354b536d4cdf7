//! Events flowing from the capture worker to its observers.
//!
//! Preview frames go through a broadcast channel: every observer gets its own
//! bounded buffer and a slow observer loses the oldest frames. Codes and
//! status reports go through unbounded channels, so the worker never waits on
//! a consumer and never drops an admitted code.

use std::fmt;
use time::OffsetDateTime;
use tokio::sync::{broadcast, mpsc};

use crate::error::DeviceError;
use crate::models::{DetectedCode, Frame};

/// An admitted code, as delivered to the consumer
#[derive(Debug, Clone)]
pub struct CodeEvent {
    pub code: DetectedCode,
    pub frame_index: u64,
    pub detected_at: OffsetDateTime,
}

/// Lifecycle reports of a scanner run
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Started {
        device_index: u32,
        width: u32,
        height: u32,
    },
    DeviceError(DeviceError),
    /// The device stopped delivering frames
    StreamEnded(String),
    /// `stop()` was requested and the device has been released
    Stopped,
}

impl Status {
    pub fn is_error(&self) -> bool {
        matches!(self, Status::DeviceError(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Started { device_index, width, height } => write!(
                f,
                "Camera {} started ({}x{}) - scanning for codes...",
                device_index, width, height
            ),
            Status::DeviceError(e) => write!(f, "Camera error: {}", e),
            Status::StreamEnded(reason) => write!(f, "Camera stream ended: {}", reason),
            Status::Stopped => write!(f, "Scanner stopped"),
        }
    }
}

/// Receiving ends handed to the consumer when a scanner is built
pub struct ScanEvents {
    pub frames: broadcast::Receiver<Frame>,
    pub codes: mpsc::UnboundedReceiver<CodeEvent>,
    pub status: mpsc::UnboundedReceiver<Status>,
}

/// Sending ends owned by the capture worker
#[derive(Clone)]
pub(crate) struct EventEmitter {
    frames: broadcast::Sender<Frame>,
    codes: mpsc::UnboundedSender<CodeEvent>,
    status: mpsc::UnboundedSender<Status>,
}

impl EventEmitter {
    pub(crate) fn channel(preview_buffer: usize) -> (Self, ScanEvents) {
        let (frames_tx, frames_rx) = broadcast::channel(preview_buffer.max(1));
        let (codes_tx, codes_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        (
            Self {
                frames: frames_tx,
                codes: codes_tx,
                status: status_tx,
            },
            ScanEvents {
                frames: frames_rx,
                codes: codes_rx,
                status: status_rx,
            },
        )
    }

    pub(crate) fn frame_sender(&self) -> broadcast::Sender<Frame> {
        self.frames.clone()
    }

    // Send errors only mean nobody is listening; the worker carries on.
    pub(crate) fn frame(&self, frame: Frame) {
        let _ = self.frames.send(frame);
    }

    pub(crate) fn code(&self, code: DetectedCode, frame_index: u64) {
        let _ = self.codes.send(CodeEvent {
            code,
            frame_index,
            detected_at: OffsetDateTime::now_utc(),
        });
    }

    pub(crate) fn status(&self, status: Status) {
        let _ = self.status.send(status);
    }
}
