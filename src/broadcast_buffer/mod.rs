//! FrameBroadcastBuffer - Single-Slot Latest-Frame Mailbox
//!
//! ## Responsibilities
//!
//! - Hold the most recent fully-annotated frame for live viewers
//! - Producer overwrites the slot; readers copy it out; nobody queues
//! - Keep critical sections copy-only: JPEG encoding for the live view
//!   happens outside the lock
//!
//! Slow readers see only the latest frame, never a backlog, and the
//! producer never blocks on readers.

use crate::error::Result;
use crate::models::Frame;
use tokio::sync::RwLock;

/// Single-slot frame mailbox
pub struct FrameBroadcastBuffer {
    slot: RwLock<Option<Frame>>,
}

impl FrameBroadcastBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Publish the latest annotated frame, replacing any previous one
    pub async fn publish(&self, frame: Frame) {
        let mut slot = self.slot.write().await;
        *slot = Some(frame);
    }

    /// Copy out the current frame, if any
    pub async fn latest(&self) -> Option<Frame> {
        let slot = self.slot.read().await;
        slot.clone()
    }

    /// Latest frame encoded as JPEG, for multipart live-view delivery.
    ///
    /// Returns `None` until the first frame has been published.
    pub async fn latest_jpeg(&self) -> Result<Option<Vec<u8>>> {
        // Clone inside the lock, encode outside it
        let Some(frame) = self.latest().await else {
            return Ok(None);
        };

        let mut encoded = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut encoded, 80);
        encoder.encode_image(&frame.image)?;
        Ok(Some(encoded))
    }
}

impl Default for FrameBroadcastBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[tokio::test]
    async fn test_empty_until_first_publish() {
        let buffer = FrameBroadcastBuffer::new();
        assert!(buffer.latest().await.is_none());
        assert!(buffer.latest_jpeg().await.expect("encode").is_none());
    }

    #[tokio::test]
    async fn test_reader_sees_only_most_recent_frame() {
        let buffer = FrameBroadcastBuffer::new();
        buffer
            .publish(Frame::new(RgbImage::from_pixel(8, 8, Rgb([10, 0, 0]))))
            .await;
        buffer
            .publish(Frame::new(RgbImage::from_pixel(8, 8, Rgb([200, 0, 0]))))
            .await;

        let frame = buffer.latest().await.expect("frame");
        assert_eq!(frame.image.get_pixel(0, 0).0[0], 200);
    }

    #[tokio::test]
    async fn test_latest_jpeg_encodes_published_frame() {
        let buffer = FrameBroadcastBuffer::new();
        buffer
            .publish(Frame::new(RgbImage::from_pixel(16, 16, Rgb([128, 64, 32]))))
            .await;

        let jpeg = buffer
            .latest_jpeg()
            .await
            .expect("encode")
            .expect("present");
        // JPEG SOI marker
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
