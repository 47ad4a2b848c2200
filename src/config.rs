//! Application configuration
//!
//! Env-var driven with defaults matching the deployed camera setup.
//! Load `.env` (dotenvy) before constructing.

use crate::models::RegionOfInterest;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Parse an env var, falling back to a default on absence or parse failure
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Capture input passed to ffmpeg (V4L2 device path or rtsp:// URL)
    pub capture_input: String,
    /// Captured frame width in pixels
    pub frame_width: u32,
    /// Captured frame height in pixels
    pub frame_height: u32,
    /// Detection sub-rectangle
    pub roi: RegionOfInterest,
    /// Process every Nth captured frame
    pub frame_sample_interval: u64,
    /// Hard-replace the reference model every N processed frames
    pub reference_swap_frames: u32,
    /// Gaussian blur sigma applied before differencing (0 disables)
    pub blur_sigma: f32,
    /// Binary threshold applied to the frame delta
    pub diff_threshold: u8,
    /// Dilation passes applied to the thresholded mask
    pub dilate_iterations: u32,
    /// Minimum component area (pixels) to qualify as motion
    pub min_motion_area: u32,
    /// Persistence counter reset value (frames of sticky "motion active")
    pub persistence_frames: u32,
    /// Fixed recording session length in seconds
    pub record_secs: u64,
    /// Nominal sink frame rate
    pub sink_fps: u32,
    /// Minimum seconds between alert dispatches
    pub notify_cooldown_secs: u64,
    /// Thumbnail width in pixels
    pub thumbnail_width: u32,
    /// Thumbnail height in pixels
    pub thumbnail_height: u32,
    /// Retained clip cap enforced by the prune pass
    pub retention_cap: usize,
    /// Per-iteration delay of the producer loop in milliseconds
    pub loop_delay_ms: u64,
    /// Consecutive capture failures before the pipeline stops
    pub max_capture_failures: u32,
    /// Directory for recorded clips
    pub video_dir: PathBuf,
    /// Directory for clip thumbnails
    pub thumbnail_dir: PathBuf,
    /// Pushover application token (alerts disabled when absent)
    pub pushover_token: Option<String>,
    /// Pushover user key (alerts disabled when absent)
    pub pushover_user: Option<String>,
    /// Live-view URL included as the alert link
    pub stream_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            capture_input: std::env::var("CAPTURE_INPUT")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            frame_width: env_parse("FRAME_WIDTH", 720),
            frame_height: env_parse("FRAME_HEIGHT", 480),
            roi: RegionOfInterest {
                x: env_parse("ROI_X", 495),
                y: env_parse("ROI_Y", 255),
                width: env_parse("ROI_WIDTH", 210),
                height: env_parse("ROI_HEIGHT", 75),
            },
            frame_sample_interval: env_parse("FRAME_SAMPLE_INTERVAL", 2),
            reference_swap_frames: env_parse("REFERENCE_SWAP_FRAMES", 10),
            blur_sigma: env_parse("BLUR_SIGMA", 3.5),
            diff_threshold: env_parse("DIFF_THRESHOLD", 25),
            dilate_iterations: env_parse("DILATE_ITERATIONS", 2),
            min_motion_area: env_parse("MIN_MOTION_AREA", 1000),
            persistence_frames: env_parse("PERSISTENCE_FRAMES", 50),
            record_secs: env_parse("RECORD_SECS", 30),
            sink_fps: env_parse("SINK_FPS", 20),
            notify_cooldown_secs: env_parse("NOTIFY_COOLDOWN_SECS", 30),
            thumbnail_width: env_parse("THUMBNAIL_WIDTH", 320),
            thumbnail_height: env_parse("THUMBNAIL_HEIGHT", 240),
            retention_cap: env_parse("RETENTION_CAP", 10),
            loop_delay_ms: env_parse("LOOP_DELAY_MS", 10),
            max_capture_failures: env_parse("MAX_CAPTURE_FAILURES", 30),
            video_dir: std::env::var("VIDEO_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static/videos")),
            thumbnail_dir: std::env::var("THUMBNAIL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static/thumbnails")),
            pushover_token: std::env::var("PUSHOVER_TOKEN").ok(),
            pushover_user: std::env::var("PUSHOVER_USER").ok(),
            stream_url: std::env::var("STREAM_URL").ok(),
        }
    }
}

impl AppConfig {
    /// Recording session length
    pub fn record_duration(&self) -> Duration {
        Duration::from_secs(self.record_secs)
    }

    /// Alert cooldown window
    pub fn notify_cooldown(&self) -> Duration {
        Duration::from_secs(self.notify_cooldown_secs)
    }

    /// Producer loop delay
    pub fn loop_delay(&self) -> Duration {
        Duration::from_millis(self.loop_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        let config = AppConfig::default();
        assert_eq!(config.frame_sample_interval, 2);
        assert_eq!(config.reference_swap_frames, 10);
        assert_eq!(config.min_motion_area, 1000);
        assert_eq!(config.persistence_frames, 50);
        assert_eq!(config.retention_cap, 10);
        assert_eq!(config.record_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_roi_fits_default_frame() {
        let config = AppConfig::default();
        assert!(config
            .roi
            .fits_within(config.frame_width, config.frame_height));
    }
}
