//! Source resolution backends.
//!
//! A [`SourceResolver`] turns a public video URL into either a local media
//! file or a direct stream URL, negotiating the closest matching format
//! for the configured quality. Both operations may legitimately fail when
//! the upstream has no matching format.

mod ytdlp;

pub use ytdlp::YtDlpResolver;

use std::path::Path;

use async_trait::async_trait;

use crate::pipeline::error::Result;
use crate::pipeline::quality::QualitySpec;

#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Download the best matching format for `url` to `dest`.
    async fn fetch_to_file(&self, url: &str, quality: QualitySpec, dest: &Path) -> Result<()>;

    /// Resolve a direct media URL for `url` without writing any file.
    async fn resolve_direct_url(&self, url: &str, quality: QualitySpec) -> Result<String>;
}
