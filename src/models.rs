//! Shared data types for the frame pipeline and clip store

use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single captured frame: fixed-size RGB pixel buffer plus capture time.
///
/// Immutable once captured; the pipeline clones it before annotating,
/// publishing or appending to a sink.
#[derive(Debug, Clone)]
pub struct Frame {
    /// RGB pixel data
    pub image: RgbImage,
    /// Capture timestamp
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap a freshly captured image, stamping it with the current time
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: Utc::now(),
        }
    }

    /// Frame dimensions (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Fixed sub-rectangle of each frame analyzed for motion, set at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RegionOfInterest {
    /// Whether the region lies entirely within a frame of the given size
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.saturating_add(self.width) <= frame_width
            && self.y.saturating_add(self.height) <= frame_height
    }
}

/// Axis-aligned bounding box, in region-of-interest coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The single largest qualifying motion region in a processed frame.
///
/// At most one is emitted per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionEvent {
    /// Bounding box of the winning component, ROI-relative
    pub bounds: Bounds,
    /// Component area in pixels
    pub area: u32,
}

/// A recorded clip on disk, as presented to the serving layer
#[derive(Debug, Clone, Serialize)]
pub struct StoredClip {
    /// Clip file name, e.g. `motion_20250830_141503.mp4`
    pub name: String,
    /// Full path to the video file
    pub video_path: PathBuf,
    /// Full path to the same-stem thumbnail (may not exist on disk)
    pub thumbnail_path: PathBuf,
    /// Whether the thumbnail file was present when listed
    pub has_thumbnail: bool,
    /// Video file modification time
    pub modified: DateTime<Utc>,
}

impl StoredClip {
    /// Modification date formatted for display
    pub fn display_date(&self) -> String {
        self.modified.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
