//! The capture loop.
//!
//! A [`Scanner`] owns one worker thread. The worker opens the device, reads
//! frames, runs detection on every Nth frame, filters the results through a
//! [`DedupGate`] and publishes events. Only `start` and `stop` cross the
//! thread boundary; the device and the dedup state never leave the worker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::ScannerConfig;
use crate::dedup::DedupGate;
use crate::detection::{CodeDetector, Detect};
use crate::error::{EndOfStream, ScannerError};
use crate::events::{EventEmitter, ScanEvents, Status};
use crate::models::Frame;
use crate::source::{CaptureDevice, FrameSource};

/// Lifecycle of a scanner. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Stopped,
}

struct Shared {
    state: Mutex<PipelineState>,
    stop_requested: AtomicBool,
}

impl Shared {
    fn state(&self) -> PipelineState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: PipelineState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

/// Everything the worker takes ownership of when the scanner starts
struct Worker<S: FrameSource> {
    source: S,
    detector: Box<dyn Detect>,
    config: ScannerConfig,
    events: EventEmitter,
}

impl<S: FrameSource> Worker<S> {
    fn run(mut self, device_index: u32, shared: &Shared) {
        let settings = self.config.capture.clone();

        let mut device = match self.source.open(device_index, &settings) {
            Ok(device) => device,
            Err(e) => {
                log::error!("failed to open camera {}: {}", device_index, e);
                shared.set_state(PipelineState::Stopped);
                self.events.status(Status::DeviceError(e));
                return;
            }
        };

        let (width, height) = device.resolution();
        shared.set_state(PipelineState::Running);
        log::info!("camera {} started at {}x{}", device_index, width, height);
        self.events.status(Status::Started {
            device_index,
            width,
            height,
        });

        let mut gate = DedupGate::new(self.config.cooldown_frames());
        let frame_skip = self.config.frame_skip.max(1) as u64;
        let frame_interval = settings.frame_interval();
        let mut frame_count: u64 = 0;

        let end_status = loop {
            if shared.stop_requested.load(Ordering::SeqCst) {
                break Status::Stopped;
            }
            let iteration_start = Instant::now();

            let image = match device.read_frame() {
                Ok(image) => image,
                Err(EndOfStream(reason)) => {
                    log::info!("camera {} stream ended: {}", device_index, reason);
                    break Status::StreamEnded(reason);
                }
            };
            frame_count += 1;
            let frame = Frame::new(frame_count, image);

            // Frames inside the cooldown window are not run through detection
            if frame_count % frame_skip == 0 && !gate.consume_cooldown() {
                let candidates = panic::catch_unwind(AssertUnwindSafe(|| self.detector.detect(&frame)))
                    .unwrap_or_else(|_| {
                        log::warn!("frame {}: detector panicked", frame.index);
                        Vec::new()
                    });
                for code in gate.accept(candidates) {
                    log::info!("{} detected by {}: {}", code.kind, code.source, code.data);
                    self.events.code(code, frame.index);
                }
            }

            self.events.frame(frame);

            let elapsed = iteration_start.elapsed();
            if elapsed < frame_interval {
                thread::sleep(frame_interval - elapsed);
            }
        };

        device.release();
        shared.set_state(PipelineState::Stopped);
        log::info!("camera {} released after {} frame(s)", device_index, frame_count);
        self.events.status(end_status);
    }
}

/// Builder for [`Scanner`]
pub struct ScannerBuilder<S: FrameSource> {
    source: S,
    detector: Option<Box<dyn Detect>>,
    config: ScannerConfig,
}

impl<S: FrameSource> ScannerBuilder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            detector: None,
            config: ScannerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the detector built from `config.detection`
    pub fn with_detector(mut self, detector: impl Detect) -> Self {
        self.detector = Some(Box::new(detector));
        self
    }

    pub fn build(self) -> (Scanner<S>, ScanEvents) {
        let (events, receivers) = EventEmitter::channel(self.config.preview_buffer);
        let detector = self
            .detector
            .unwrap_or_else(|| Box::new(CodeDetector::from_config(&self.config.detection)));
        let frames = events.frame_sender();

        let scanner = Scanner {
            pending: Mutex::new(Some(Worker {
                source: self.source,
                detector,
                config: self.config.clone(),
                events,
            })),
            shared: Arc::new(Shared {
                state: Mutex::new(PipelineState::Idle),
                stop_requested: AtomicBool::new(false),
            }),
            handle: Mutex::new(None),
            frames,
            config: self.config,
        };
        (scanner, receivers)
    }
}

/// Live code scanner driving one capture device from a background thread.
///
/// `start` and `stop` may be called from any thread. A scanner runs at most
/// once; after it has stopped, build a new one.
pub struct Scanner<S: FrameSource> {
    pending: Mutex<Option<Worker<S>>>,
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
    frames: broadcast::Sender<Frame>,
    config: ScannerConfig,
}

impl<S: FrameSource> Scanner<S> {
    pub fn builder(source: S) -> ScannerBuilder<S> {
        ScannerBuilder::new(source)
    }

    pub fn state(&self) -> PipelineState {
        self.shared.state()
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Another observer of preview frames
    pub fn subscribe_frames(&self) -> broadcast::Receiver<Frame> {
        self.frames.subscribe()
    }

    /// Begin capturing from `device_index`.
    ///
    /// Returns once the worker is spawned. Device errors are reported on the
    /// status channel and leave the scanner `Stopped`.
    pub fn start(&self, device_index: u32) -> Result<(), ScannerError> {
        match self.state() {
            PipelineState::Idle => {}
            PipelineState::Running => return Err(ScannerError::AlreadyStarted),
            PipelineState::Stopped => return Err(ScannerError::Terminated),
        }

        // Locked before spawning so a concurrent stop() always finds the handle.
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        // A stop() that finished while we waited for the lock has made this run terminal
        if self.state() == PipelineState::Stopped {
            return Err(ScannerError::Terminated);
        }
        let worker = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(ScannerError::AlreadyStarted)?;

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("codescan-capture-{}", device_index))
            .spawn(move || worker.run(device_index, &shared))
            .map_err(|e| {
                self.shared.set_state(PipelineState::Stopped);
                ScannerError::SpawnFailed(e.to_string())
            })?;

        *handle = Some(spawned);
        Ok(())
    }

    /// Stop capturing and wait for the worker to release the device.
    ///
    /// When this returns no further events will be emitted. Calling it on a
    /// scanner that never started moves it straight to `Stopped`.
    pub fn stop(&self) -> Result<(), ScannerError> {
        self.shared.stop_requested.store(true, Ordering::SeqCst);

        // Held across the join so concurrent callers also wait for the exit.
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        let joined = match handle.take() {
            Some(h) => h.join().map_err(|_| ScannerError::WorkerPanicked),
            None => Ok(()),
        };

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.shared.set_state(PipelineState::Stopped);
        joined
    }
}

impl<S: FrameSource> Drop for Scanner<S> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("scanner shutdown: {}", e);
        }
    }
}
