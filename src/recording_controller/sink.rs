//! Video sink seam and the ffmpeg-backed production sink

use crate::error::{Error, Result};
use async_trait::async_trait;
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};

/// Seconds to wait for the encoder to flush on close
const CLOSE_TIMEOUT_SECS: u64 = 10;

/// Ordered frame appends at a fixed codec/container/frame-rate
/// configuration, flushed and closed at session end.
#[async_trait]
pub trait VideoSink: Send {
    /// Append one frame; frames must match the sink's configured geometry
    async fn append(&mut self, image: &RgbImage) -> Result<()>;

    /// Flush and close the sink, finalizing the container
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens video sinks; injected so tests can substitute a mock
#[async_trait]
pub trait SinkFactory: Send + Sync {
    /// Open a sink writing to `path` at the given geometry and frame rate
    async fn open(&self, path: &Path, width: u32, height: u32, fps: u32)
        -> Result<Box<dyn VideoSink>>;
}

/// Production sink: an ffmpeg child encoding rawvideo rgb24 from stdin
/// into an H.264 MP4.
pub struct FfmpegVideoSink {
    child: Child,
    stdin: ChildStdin,
    path: PathBuf,
    width: u32,
    height: u32,
}

#[async_trait]
impl VideoSink for FfmpegVideoSink {
    async fn append(&mut self, image: &RgbImage) -> Result<()> {
        let (w, h) = image.dimensions();
        if (w, h) != (self.width, self.height) {
            return Err(Error::Sink(format!(
                "frame {}x{} does not match sink {}x{}",
                w, h, self.width, self.height
            )));
        }
        self.stdin
            .write_all(image.as_raw())
            .await
            .map_err(|e| Error::Sink(format!("frame write failed: {}", e)))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let FfmpegVideoSink {
            mut child,
            mut stdin,
            path,
            ..
        } = *self;

        // Closing stdin signals end of stream; ffmpeg then finalizes the
        // container.
        stdin.shutdown().await.ok();
        drop(stdin);

        match tokio::time::timeout(Duration::from_secs(CLOSE_TIMEOUT_SECS), child.wait()).await {
            Ok(Ok(status)) if status.success() => {
                tracing::debug!(path = %path.display(), "Video sink closed");
                Ok(())
            }
            Ok(Ok(status)) => Err(Error::Sink(format!(
                "encoder exited with {} for {}",
                status,
                path.display()
            ))),
            Ok(Err(e)) => Err(Error::Sink(format!("encoder wait failed: {}", e))),
            // kill_on_drop reaps the child when the timeout cancels the wait
            Err(_) => Err(Error::Sink(format!(
                "encoder close timeout for {}",
                path.display()
            ))),
        }
    }
}

/// Factory for [`FfmpegVideoSink`]
pub struct FfmpegSinkFactory;

#[async_trait]
impl SinkFactory for FfmpegSinkFactory {
    async fn open(
        &self,
        path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Box<dyn VideoSink>> {
        let size = format!("{}x{}", width, height);
        let rate = fps.to_string();
        let mut child = Command::new("ffmpeg")
            .args([
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                &size,
                "-r",
                &rate,
                "-i",
                "-",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-preset",
                "veryfast",
                "-loglevel",
                "error",
                "-y",
            ])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Sink(format!("encoder spawn failed: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Sink("encoder stdin unavailable".to_string()))?;

        tracing::info!(
            path = %path.display(),
            width,
            height,
            fps,
            "Video sink opened"
        );

        Ok(Box::new(FfmpegVideoSink {
            child,
            stdin,
            path: path.to_path_buf(),
            width,
            height,
        }))
    }
}
