use thiserror::Error;

/// The capture device could not be opened. Fatal for a scanner run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("camera {0} not found")]
    NotFound(u32),
    #[error("failed to open camera {index}: {reason}")]
    OpenFailed { index: u32, reason: String },
    #[error("failed to start stream on camera {index}: {reason}")]
    StreamFailed { index: u32, reason: String },
    #[error("camera support not compiled in (enable the `camera` feature)")]
    Unsupported,
}

/// The device stopped producing frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("end of stream: {0}")]
pub struct EndOfStream(pub String);

/// Misuse of the scanner lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScannerError {
    #[error("scanner is already running")]
    AlreadyStarted,
    #[error("scanner has stopped; create a new one to scan again")]
    Terminated,
    #[error("failed to spawn capture worker: {0}")]
    SpawnFailed(String),
    #[error("capture worker panicked")]
    WorkerPanicked,
}
