//! Persistence Tracker
//!
//! Debounces raw detector output into a sticky "motion active" state:
//! the counter resets to its maximum on every motion event and decays by
//! one per processed frame otherwise. Motion is considered active while
//! the counter is above zero.

/// Decaying persistence counter
#[derive(Debug, Clone)]
pub struct PersistenceTracker {
    /// Reset value applied on each motion event
    persistence_frames: u32,
    /// Frames of stickiness remaining
    remaining: u32,
}

impl PersistenceTracker {
    /// Create a tracker that holds "active" for the given number of frames
    pub fn new(persistence_frames: u32) -> Self {
        Self {
            persistence_frames,
            remaining: 0,
        }
    }

    /// Record the outcome of one processed frame
    pub fn observe(&mut self, motion_detected: bool) {
        if motion_detected {
            self.remaining = self.persistence_frames;
        } else {
            self.remaining = self.remaining.saturating_sub(1);
        }
    }

    /// Whether motion is currently considered active
    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    /// Remaining countdown, for overlay display
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}
