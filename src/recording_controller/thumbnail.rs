//! Thumbnail creation from a finished clip's first frame

use crate::error::{Error, Result};
use async_trait::async_trait;
use image::imageops::FilterType;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Seconds to wait for the first-frame decode
const DECODE_TIMEOUT_SECS: u64 = 10;

/// Decodes the first written frame of a video and writes a resized still;
/// injected so tests can substitute a mock.
#[async_trait]
pub trait Thumbnailer: Send + Sync {
    /// Create `thumbnail_path` from the first frame of `video_path`
    async fn create(&self, video_path: &Path, thumbnail_path: &Path) -> Result<()>;
}

/// Production thumbnailer: ffmpeg extracts the first frame as MJPEG, the
/// image crate resizes and re-encodes it.
pub struct FfmpegThumbnailer {
    pub width: u32,
    pub height: u32,
}

impl FfmpegThumbnailer {
    /// Create a thumbnailer producing images of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[async_trait]
impl Thumbnailer for FfmpegThumbnailer {
    async fn create(&self, video_path: &Path, thumbnail_path: &Path) -> Result<()> {
        let child = Command::new("ffmpeg")
            .arg("-i")
            .arg(video_path)
            .args([
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "mjpeg",
                "-loglevel",
                "error",
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Thumbnail(format!("decoder spawn failed: {}", e)))?;

        let output = match tokio::time::timeout(
            Duration::from_secs(DECODE_TIMEOUT_SECS),
            child.wait_with_output(),
        )
        .await
        {
            Ok(Ok(output)) if output.status.success() && !output.stdout.is_empty() => output,
            Ok(Ok(output)) => {
                return Err(Error::Thumbnail(format!(
                    "first-frame decode failed for {} ({})",
                    video_path.display(),
                    output.status
                )));
            }
            Ok(Err(e)) => {
                return Err(Error::Thumbnail(format!("decoder failed: {}", e)));
            }
            Err(_) => {
                return Err(Error::Thumbnail(format!(
                    "decoder timeout for {}",
                    video_path.display()
                )));
            }
        };

        let frame = image::load_from_memory(&output.stdout)
            .map_err(|e| Error::Thumbnail(format!("first-frame parse failed: {}", e)))?;
        let still = frame
            .resize_exact(self.width, self.height, FilterType::Triangle)
            .to_rgb8();

        let mut encoded = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, 85);
        encoder
            .encode_image(&still)
            .map_err(|e| Error::Thumbnail(format!("thumbnail encode failed: {}", e)))?;

        tokio::fs::write(thumbnail_path, &encoded)
            .await
            .map_err(|e| Error::Thumbnail(format!("thumbnail write failed: {}", e)))?;

        tracing::debug!(
            video = %video_path.display(),
            thumbnail = %thumbnail_path.display(),
            "Thumbnail created"
        );
        Ok(())
    }
}
