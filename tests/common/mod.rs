mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from codescan for tests
pub use codescan::{
    CodeDetector, CodeKind, DedupGate, DetectedCode, DeviceError, Frame, PipelineState, Scanner,
    ScannerConfig, ScannerError, SourceMethod, Status,
};
