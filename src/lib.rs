//! MotionCam - Single-Camera Motion Detection and Recording
//!
//! ## Architecture (9 Components)
//!
//! 1. FrameSource - Fixed-size RGB frame capture (ffmpeg)
//! 2. MotionDetector - Reference differencing over the region of interest
//! 3. PersistenceTracker - Debounced "motion active" state
//! 4. RecordingController - Fixed-duration clip recording state machine
//! 5. NotificationGate - Rate-limited alert dispatch (Pushover)
//! 6. FrameBroadcastBuffer - Single-slot latest-frame mailbox
//! 7. ClipStore - Clip and thumbnail storage with validated names
//! 8. RetentionManager - On-demand pruning to the retention cap
//! 9. MotionPipeline - The single producer loop tying it all together
//!
//! ## Design Principles
//!
//! - One producer task owns all detection state; nothing else mutates it
//! - External effects (sink, thumbnailer, dispatcher) sit behind traits
//! - Failures degrade per concern: a lost thumbnail or alert never costs
//!   a clip

pub mod broadcast_buffer;
pub mod clip_store;
pub mod config;
pub mod error;
pub mod frame_source;
pub mod models;
pub mod motion_detector;
pub mod notification_gate;
pub mod overlay;
pub mod persistence_tracker;
pub mod pipeline;
pub mod recording_controller;
pub mod retention_manager;

pub use error::{Error, Result};
