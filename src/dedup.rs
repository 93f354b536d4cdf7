//! Suppression of repeated detections.
//!
//! The gate keeps one cooldown counter shared by all codes. Admitting any new
//! code restarts the window, and while the window is open nothing is admitted,
//! including codes that were never seen. When the counter runs out the set of
//! seen codes is forgotten, so the same code can be reported again.

use std::collections::HashSet;

use crate::models::DetectedCode;

#[derive(Debug, Clone)]
pub struct DedupGate {
    seen: HashSet<String>,
    cooldown_remaining: u32,
    window: u32,
}

impl DedupGate {
    /// `window` is the cooldown length in processed frames (at least 1).
    pub fn new(window: u32) -> Self {
        Self {
            seen: HashSet::new(),
            cooldown_remaining: 0,
            window: window.max(1),
        }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown_remaining
    }

    pub fn is_cooling_down(&self) -> bool {
        self.cooldown_remaining > 0
    }

    pub fn has_seen(&self, data: &str) -> bool {
        self.seen.contains(data)
    }

    /// Count one processed frame against a running cooldown.
    ///
    /// Returns `true` while the cooldown was still running, in which case the
    /// frame's candidates must not be evaluated at all.
    pub fn consume_cooldown(&mut self) -> bool {
        if self.cooldown_remaining == 0 {
            return false;
        }
        self.cooldown_remaining -= 1;
        if self.cooldown_remaining == 0 {
            self.seen.clear();
        }
        true
    }

    /// Filter one processed frame's candidates down to the codes to emit.
    pub fn admit(&mut self, candidates: Vec<DetectedCode>) -> Vec<DetectedCode> {
        if self.consume_cooldown() {
            return Vec::new();
        }
        self.accept(candidates)
    }

    /// Admit unseen candidates once [`DedupGate::consume_cooldown`] has let
    /// the frame through.
    pub(crate) fn accept(&mut self, candidates: Vec<DetectedCode>) -> Vec<DetectedCode> {
        let mut admitted = Vec::new();
        for candidate in candidates {
            if candidate.data.is_empty() || self.seen.contains(&candidate.data) {
                continue;
            }
            self.seen.insert(candidate.data.clone());
            self.cooldown_remaining = self.window;
            admitted.push(candidate);
        }
        admitted
    }
}
