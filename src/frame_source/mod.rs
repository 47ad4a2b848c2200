//! FrameSource - Camera Capture
//!
//! ## Responsibilities
//!
//! - Abstract the camera behind a pull interface yielding fixed-format frames
//! - Production capture via an ffmpeg child process emitting rawvideo rgb24
//! - Respawn the capture process after a broken pipe so a transient camera
//!   outage surfaces as recoverable capture errors, not a wedged child

use crate::error::{Error, Result};
use crate::models::Frame;
use async_trait::async_trait;
use image::RgbImage;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};

/// Pull interface for camera capture.
///
/// Exactly one source feeds the pipeline; there is deliberately no capture
/// timeout, so a stalled source stalls the pipeline.
#[async_trait]
pub trait FrameSource: Send {
    /// Yield the next captured frame
    async fn next_frame(&mut self) -> Result<Frame>;
}

/// ffmpeg-backed capture from a V4L2 device or RTSP URL.
///
/// The child is spawned lazily on first pull and respawned after any read
/// failure. kill_on_drop ensures the process dies with the source.
pub struct FfmpegFrameSource {
    input: String,
    width: u32,
    height: u32,
    child: Option<(Child, ChildStdout)>,
}

impl FfmpegFrameSource {
    /// Create a source for the given input at a fixed capture geometry
    pub fn new(input: String, width: u32, height: u32) -> Self {
        Self {
            input,
            width,
            height,
            child: None,
        }
    }

    fn spawn(&self) -> Result<(Child, ChildStdout)> {
        let size = format!("{}x{}", self.width, self.height);
        let mut cmd = Command::new("ffmpeg");
        if self.input.starts_with("rtsp://") {
            cmd.args(["-rtsp_transport", "tcp"]);
        } else {
            cmd.args(["-f", "v4l2"]);
        }
        cmd.args([
            "-i",
            &self.input,
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &size,
            "-loglevel",
            "error",
            "-",
        ]);

        let mut child = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Capture(format!("ffmpeg spawn failed: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Capture("ffmpeg stdout unavailable".to_string()))?;

        tracing::info!(
            input = %self.input,
            width = self.width,
            height = self.height,
            "Capture process started"
        );

        Ok((child, stdout))
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn next_frame(&mut self) -> Result<Frame> {
        if self.child.is_none() {
            self.child = Some(self.spawn()?);
        }
        let (_, stdout) = self
            .child
            .as_mut()
            .ok_or_else(|| Error::Internal("capture child missing".to_string()))?;

        let frame_len = (self.width * self.height * 3) as usize;
        let mut buf = vec![0u8; frame_len];
        if let Err(e) = stdout.read_exact(&mut buf).await {
            // Drop the broken child; the next pull respawns it
            self.child = None;
            return Err(Error::Capture(format!("frame read failed: {}", e)));
        }

        let image = RgbImage::from_raw(self.width, self.height, buf)
            .ok_or_else(|| Error::Capture("frame buffer size mismatch".to_string()))?;

        Ok(Frame::new(image))
    }
}
