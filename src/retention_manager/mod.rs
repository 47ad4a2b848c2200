//! RetentionManager - Clip Store Pruning
//!
//! ## Responsibilities
//!
//! - On demand, prune the clip store to the retention cap, keeping the
//!   most recently modified clips
//! - Tolerate per-file deletion failures and already-missing thumbnails
//!
//! Runs on demand (the serving layer invokes it before listing clips),
//! not on a timer, so storage may transiently exceed the cap between a
//! recording completion and the next invocation. Enforcement is eventual,
//! not immediate.

use crate::clip_store::ClipStore;
use crate::error::Result;
use crate::models::StoredClip;
use std::sync::Arc;

/// RetentionManager instance
pub struct RetentionManager {
    store: Arc<ClipStore>,
    cap: usize,
}

impl RetentionManager {
    /// Create a manager enforcing the given cap
    pub fn new(store: Arc<ClipStore>, cap: usize) -> Self {
        Self { store, cap }
    }

    /// Prune the store to the cap and return the retained clips, newest
    /// first.
    ///
    /// Deletion failures are logged per file; the pass continues for the
    /// remaining files.
    pub async fn prune(&self) -> Result<Vec<StoredClip>> {
        let clips = self.store.list().await?;
        if clips.len() <= self.cap {
            return Ok(clips);
        }

        let mut kept = clips;
        let expired = kept.split_off(self.cap);
        let mut deleted = 0usize;
        for clip in &expired {
            match self.store.delete(&clip.name).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::warn!(
                        clip = %clip.name,
                        error = %e,
                        "Prune failed for clip, continuing"
                    );
                }
            }
        }

        tracing::info!(
            retained = kept.len(),
            deleted,
            cap = self.cap,
            "Retention prune complete"
        );
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    async fn seed_clips(store: &ClipStore, count: usize) {
        for i in 0..count {
            let name = format!("motion_20250830_1415{:02}.mp4", i);
            let path = store.video_dir().join(&name);
            tokio::fs::write(&path, b"video").await.expect("write");
            let thumb = store.thumbnail_path(&name).expect("thumb path");
            tokio::fs::write(&thumb, b"thumb").await.expect("write thumb");
            // Higher index = more recent
            let mtime =
                SystemTime::now() - Duration::from_secs(((count - i) as u64) * 10);
            let file = std::fs::File::options()
                .write(true)
                .open(&path)
                .expect("open");
            file.set_modified(mtime).expect("set mtime");
        }
    }

    #[tokio::test]
    async fn test_fifteen_clips_pruned_to_ten_newest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(
            ClipStore::new(dir.path().join("videos"), dir.path().join("thumbnails"))
                .await
                .expect("store"),
        );
        seed_clips(&store, 15).await;

        let manager = RetentionManager::new(store.clone(), 10);
        let kept = manager.prune().await.expect("prune");

        assert_eq!(kept.len(), 10);
        let remaining = store.list().await.expect("list");
        assert_eq!(remaining.len(), 10);
        // The 10 largest modification timestamps survive: indices 5..15
        for clip in &remaining {
            let idx: usize = clip.name["motion_20250830_1415".len()..clip.name.len() - 4]
                .parse()
                .expect("index");
            assert!(idx >= 5, "clip {} should have been pruned", clip.name);
        }
        // Thumbnails of pruned clips are gone too
        for i in 0..5 {
            let name = format!("motion_20250830_1415{:02}.mp4", i);
            let thumb = store.thumbnail_path(&name).expect("thumb path");
            assert!(!thumb.exists());
        }
    }

    #[tokio::test]
    async fn test_under_cap_deletes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(
            ClipStore::new(dir.path().join("videos"), dir.path().join("thumbnails"))
                .await
                .expect("store"),
        );
        seed_clips(&store, 4).await;

        let manager = RetentionManager::new(store.clone(), 10);
        let kept = manager.prune().await.expect("prune");
        assert_eq!(kept.len(), 4);
        assert_eq!(store.list().await.expect("list").len(), 4);
    }

    #[tokio::test]
    async fn test_prune_tolerates_missing_thumbnails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(
            ClipStore::new(dir.path().join("videos"), dir.path().join("thumbnails"))
                .await
                .expect("store"),
        );
        seed_clips(&store, 12).await;
        // Remove a doomed clip's thumbnail up front
        let thumb = store
            .thumbnail_path("motion_20250830_141500.mp4")
            .expect("thumb path");
        tokio::fs::remove_file(&thumb).await.expect("remove");

        let manager = RetentionManager::new(store.clone(), 10);
        let kept = manager.prune().await.expect("prune");
        assert_eq!(kept.len(), 10);
    }
}
