//! Error handling for the motioncam pipeline

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Camera unavailable or malformed frame. Recoverable: the frame is
    /// skipped; the pipeline escalates only after a run of consecutive
    /// failures.
    #[error("Capture error: {0}")]
    Capture(String),

    /// Video sink open/write failure. Aborts the recording attempt and
    /// reverts the controller to Idle.
    #[error("Sink error: {0}")]
    Sink(String),

    /// Thumbnail creation failure. Recoverable: the clip persists without
    /// a thumbnail.
    #[error("Thumbnail error: {0}")]
    Thumbnail(String),

    /// Alert dispatch failure. Logged, non-fatal, never retried.
    #[error("Notification error: {0}")]
    Notification(String),

    /// Clip deletion failure during a prune pass. Logged per file.
    #[error("Retention error: {0}")]
    Retention(String),

    /// User-supplied clip name that does not resolve inside the clip store
    #[error("Invalid clip name: {0}")]
    InvalidClipName(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
