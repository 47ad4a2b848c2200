//! RecordingController - Clip Recording State Machine
//!
//! ## Responsibilities
//!
//! - Idle -> Recording on a motion event; open a video sink named from a
//!   second-resolution timestamp (collision-suffixed)
//! - While Recording, append every processed frame regardless of motion
//! - Recording -> Idle solely on elapsed wall-clock time since session
//!   start; continued motion never extends a session
//! - On close: flush the sink, create the clip thumbnail, register the clip
//!
//! A sink-open failure aborts the transition and leaves the controller
//! Idle. A thumbnail failure never invalidates the finished video.

mod sink;
mod thumbnail;

pub use sink::{FfmpegSinkFactory, FfmpegVideoSink, SinkFactory, VideoSink};
pub use thumbnail::{FfmpegThumbnailer, Thumbnailer};

use crate::clip_store::ClipStore;
use crate::error::{Error, Result};
use crate::models::Frame;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Recording parameters
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// Fixed session length
    pub duration: Duration,
    /// Nominal sink frame rate
    pub fps: u32,
    /// Sink frame width
    pub width: u32,
    /// Sink frame height
    pub height: u32,
}

/// An open recording session; exactly one exists while Recording
struct RecordingSession {
    sink: Box<dyn VideoSink>,
    started_at: Instant,
    clip_name: String,
    frames_written: u64,
}

enum State {
    Idle,
    Recording(RecordingSession),
}

/// RecordingController instance
pub struct RecordingController {
    store: Arc<ClipStore>,
    sink_factory: Arc<dyn SinkFactory>,
    thumbnailer: Arc<dyn Thumbnailer>,
    config: RecordingConfig,
    state: State,
}

impl RecordingController {
    /// Create a controller in the Idle state
    pub fn new(
        store: Arc<ClipStore>,
        sink_factory: Arc<dyn SinkFactory>,
        thumbnailer: Arc<dyn Thumbnailer>,
        config: RecordingConfig,
    ) -> Self {
        Self {
            store,
            sink_factory,
            thumbnailer,
            config,
            state: State::Idle,
        }
    }

    /// Whether a session is currently open
    pub fn is_recording(&self) -> bool {
        matches!(self.state, State::Recording(_))
    }

    /// Drive the state machine with one processed frame.
    ///
    /// `now` is the frame's processing instant; sessions close when
    /// `now - started_at` exceeds the configured duration.
    pub async fn handle_frame(
        &mut self,
        now: Instant,
        motion_detected: bool,
        frame: &Frame,
    ) -> Result<()> {
        if matches!(self.state, State::Idle) && motion_detected {
            self.open_session(now).await?;
        }

        if let State::Recording(session) = &mut self.state {
            if let Err(e) = session.sink.append(&frame.image).await {
                // A failed write leaves no usable sink; discard the session
                // rather than recording into a broken one.
                let name = session.clip_name.clone();
                self.abort_session().await;
                return Err(Error::Sink(format!(
                    "append to {} failed, session aborted: {}",
                    name, e
                )));
            }
            session.frames_written += 1;

            if now.duration_since(session.started_at) > self.config.duration {
                self.finish_session().await?;
            }
        }

        Ok(())
    }

    /// Close any open session; called on pipeline shutdown so an abrupt
    /// stop never leaves an unflushed sink
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.is_recording() {
            tracing::info!("Closing open recording session on shutdown");
            self.finish_session().await?;
        }
        Ok(())
    }

    async fn open_session(&mut self, now: Instant) -> Result<()> {
        let clip_name = self.store.allocate_clip_name(Local::now());
        let path = self.store.video_path(&clip_name)?;

        let sink = self
            .sink_factory
            .open(&path, self.config.width, self.config.height, self.config.fps)
            .await?;

        tracing::info!(
            clip = %clip_name,
            duration_secs = self.config.duration.as_secs(),
            "Recording session started"
        );

        self.state = State::Recording(RecordingSession {
            sink,
            started_at: now,
            clip_name,
            frames_written: 0,
        });
        Ok(())
    }

    /// Close the session normally: flush sink, create thumbnail, register
    async fn finish_session(&mut self) -> Result<()> {
        let State::Recording(session) = std::mem::replace(&mut self.state, State::Idle) else {
            return Ok(());
        };

        let clip_name = session.clip_name;
        let frames_written = session.frames_written;
        session.sink.close().await?;

        let video_path = self.store.video_path(&clip_name)?;
        let thumbnail_path = self.store.thumbnail_path(&clip_name)?;
        if let Err(e) = self
            .thumbnailer
            .create(&video_path, &thumbnail_path)
            .await
        {
            // The clip stands on its own; collaborators render a
            // placeholder for the missing thumbnail.
            tracing::warn!(
                clip = %clip_name,
                error = %e,
                "Thumbnail creation failed, keeping clip"
            );
        }

        tracing::info!(
            clip = %clip_name,
            frames_written,
            "Recording session finished"
        );
        Ok(())
    }

    /// Drop the session without finalizing; used after a failed append
    async fn abort_session(&mut self) {
        if let State::Recording(session) = std::mem::replace(&mut self.state, State::Idle) {
            if let Err(e) = session.sink.close().await {
                tracing::warn!(
                    clip = %session.clip_name,
                    error = %e,
                    "Sink close during abort failed"
                );
            }
        }
    }
}
