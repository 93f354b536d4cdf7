pub mod config;
pub mod dedup;
pub mod detection;
pub mod error;
pub mod events;
pub mod models;
pub mod pipeline;
pub mod source;

pub use config::ScannerConfig;
pub use dedup::DedupGate;
pub use detection::{CodeDetector, Detect, DetectionMethod, looks_like_barcode};
pub use error::{DeviceError, EndOfStream, ScannerError};
pub use events::{CodeEvent, ScanEvents, Status};
pub use models::{BoundingBox, CodeKind, DetectedCode, Frame, Region, SourceMethod};
pub use pipeline::{PipelineState, Scanner, ScannerBuilder};
pub use source::{CaptureDevice, FrameSource, ReplaySource};
