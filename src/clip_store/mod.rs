//! ClipStore - Persisted Clip Layout
//!
//! ## Responsibilities
//!
//! - Own the video and thumbnail directories (created at startup)
//! - Allocate collision-free clip names from second-resolution timestamps
//! - Resolve user-supplied clip names to paths that can never escape the
//!   configured directories
//! - List, read, and delete stored clips
//!
//! The store takes no lock around the on-disk layout: correctness relies on
//! the recording controller being the only writer. A `delete_all` racing an
//! in-flight session can remove the open file under the sink; the session's
//! close then fails and is logged, and the session is discarded.

use crate::error::{Error, Result};
use crate::models::StoredClip;
use chrono::{DateTime, Local, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Extension of recorded clips
const VIDEO_EXT: &str = "mp4";
/// Extension of clip thumbnails
const THUMBNAIL_EXT: &str = "jpg";

/// ClipStore instance
pub struct ClipStore {
    video_dir: PathBuf,
    thumbnail_dir: PathBuf,
}

impl ClipStore {
    /// Create the store, ensuring both directories exist
    pub async fn new(video_dir: PathBuf, thumbnail_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&video_dir).await?;
        fs::create_dir_all(&thumbnail_dir).await?;
        Ok(Self {
            video_dir,
            thumbnail_dir,
        })
    }

    /// Video directory path
    pub fn video_dir(&self) -> &Path {
        &self.video_dir
    }

    /// Allocate a clip name for a session starting at `at`.
    ///
    /// Names are `motion_<YYYYMMDD_HHMMSS>.mp4`; two sessions in the same
    /// second get a `-N` uniqueness suffix instead of colliding.
    pub fn allocate_clip_name(&self, at: DateTime<Local>) -> String {
        let stem = format!("motion_{}", at.format("%Y%m%d_%H%M%S"));
        let plain = format!("{}.{}", stem, VIDEO_EXT);
        if !self.video_dir.join(&plain).exists() {
            return plain;
        }
        let mut n = 1u32;
        loop {
            let candidate = format!("{}-{}.{}", stem, n, VIDEO_EXT);
            if !self.video_dir.join(&candidate).exists() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Validate a user-supplied clip name.
    ///
    /// Rejects anything that could resolve outside the store: path
    /// separators, parent references, hidden names, or a foreign extension.
    fn validate_name(name: &str) -> Result<()> {
        let well_formed = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !name.contains("..")
            && Path::new(name).extension().and_then(|e| e.to_str()) == Some(VIDEO_EXT);
        if well_formed {
            Ok(())
        } else {
            Err(Error::InvalidClipName(name.to_string()))
        }
    }

    /// Resolve a clip name to its video path
    pub fn video_path(&self, name: &str) -> Result<PathBuf> {
        Self::validate_name(name)?;
        Ok(self.video_dir.join(name))
    }

    /// Resolve a clip name to its same-stem thumbnail path
    pub fn thumbnail_path(&self, name: &str) -> Result<PathBuf> {
        Self::validate_name(name)?;
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| Error::InvalidClipName(name.to_string()))?;
        Ok(self
            .thumbnail_dir
            .join(format!("{}.{}", stem, THUMBNAIL_EXT)))
    }

    /// List stored clips, newest modification time first
    pub async fn list(&self) -> Result<Vec<StoredClip>> {
        let mut clips = Vec::new();
        let mut entries = fs::read_dir(&self.video_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VIDEO_EXT) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
                continue;
            };
            let metadata = entry.metadata().await?;
            let modified: DateTime<Utc> = metadata
                .modified()
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());
            let thumbnail_path = match self.thumbnail_path(&name) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let has_thumbnail = fs::try_exists(&thumbnail_path).await.unwrap_or(false);
            clips.push(StoredClip {
                name,
                video_path: path,
                thumbnail_path,
                has_thumbnail,
                modified,
            });
        }
        clips.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(clips)
    }

    /// Read a clip's raw bytes for download
    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.video_path(name)?;
        let data = fs::read(&path).await?;
        Ok(data)
    }

    /// Delete one clip and its thumbnail, tolerating a missing thumbnail
    pub async fn delete(&self, name: &str) -> Result<()> {
        let video = self.video_path(name)?;
        fs::remove_file(&video)
            .await
            .map_err(|e| Error::Retention(format!("delete {} failed: {}", name, e)))?;

        let thumbnail = self.thumbnail_path(name)?;
        match fs::remove_file(&thumbnail).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    clip = %name,
                    error = %e,
                    "Thumbnail deletion failed"
                );
            }
        }

        tracing::info!(clip = %name, "Clip deleted");
        Ok(())
    }

    /// Delete every stored clip; returns how many were removed
    pub async fn delete_all(&self) -> Result<usize> {
        let clips = self.list().await?;
        let mut deleted = 0usize;
        for clip in clips {
            match self.delete(&clip.name).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::warn!(
                        clip = %clip.name,
                        error = %e,
                        "Bulk delete failed for clip, continuing"
                    );
                }
            }
        }
        Ok(deleted)
    }
}
