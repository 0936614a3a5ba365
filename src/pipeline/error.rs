//! Error types for the video production pipeline.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while producing or serving a video.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or malformed identifier or file name. User error, no retry.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The source resolver could not produce a file or URL.
    #[error("source resolution failed: {0}")]
    Resolution(String),

    /// The transcoding engine exited nonzero or produced no output.
    #[error("transcode failed: {0}")]
    Transcode(String),

    /// Another producer already owns this identifier. Not a failure; the
    /// caller is told to retry once production completes.
    #[error("production already in flight for {0}")]
    InFlight(String),

    /// The requested artifact does not exist.
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    pub fn transcode(message: impl Into<String>) -> Self {
        Self::Transcode(message.into())
    }
}
