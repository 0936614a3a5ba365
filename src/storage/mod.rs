//! Artifact storage layout.
//!
//! Maps video identifiers to paths in the two artifact directories: the
//! download directory holds raw upstream files, the cache directory holds
//! the final client-ready files. Producers write through temporary files
//! in the destination directory and rename into place, so a path that
//! exists always names a complete artifact.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::NamedTempFile;

use crate::pipeline::error::{PipelineError, Result};

/// Container extension of raw downloads.
pub const RAW_EXT: &str = "mp4";
/// Container extension of cached, client-ready files.
pub const CACHE_EXT: &str = "webm";

/// Validated upstream video identifier, safe to embed in file names.
///
/// The token is opaque to us; validation only guarantees it cannot escape
/// the artifact directories or collide with temporary files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(PipelineError::invalid_request("empty video id"));
        }
        // Leading dots cover `.`/`..` and keep ids away from temp file names.
        if raw.starts_with('.') {
            return Err(PipelineError::invalid_request(format!(
                "video id must not start with '.': {raw:?}"
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(PipelineError::invalid_request(format!(
                "video id contains unsupported characters: {raw:?}"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A completed artifact on disk.
#[derive(Debug, Clone)]
pub struct MediaArtifact {
    pub path: PathBuf,
    pub len: u64,
    pub modified: SystemTime,
}

impl MediaArtifact {
    /// Read artifact metadata from the filesystem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)
            .map_err(|_| PipelineError::NotFound(path.to_path_buf()))?;
        Ok(Self {
            path: path.to_path_buf(),
            len: metadata.len(),
            modified: metadata.modified()?,
        })
    }
}

/// Path layout over the download and cache directories.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    download_dir: PathBuf,
    cache_dir: PathBuf,
}

impl StorageLayout {
    /// Create the layout, ensuring both directories exist.
    pub fn new(download_dir: &Path, cache_dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(download_dir)?;
        std::fs::create_dir_all(cache_dir)?;
        Ok(Self {
            download_dir: download_dir.to_path_buf(),
            cache_dir: cache_dir.to_path_buf(),
        })
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Final path of the raw download for `id`.
    pub fn raw_path(&self, id: &VideoId) -> PathBuf {
        self.download_dir.join(format!("{id}.{RAW_EXT}"))
    }

    /// Final path of the cached transcode for `id`.
    pub fn cache_path(&self, id: &VideoId) -> PathBuf {
        self.cache_dir.join(format!("{id}.{CACHE_EXT}"))
    }

    /// Temporary file in the download directory, to be persisted to
    /// [`raw_path`](Self::raw_path) once complete.
    pub fn raw_tmp_file(&self, id: &VideoId) -> std::io::Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix(&format!(".{id}-"))
            .suffix(&format!(".{RAW_EXT}"))
            .tempfile_in(&self.download_dir)
    }

    /// Temporary file in the cache directory, to be persisted to
    /// [`cache_path`](Self::cache_path) once complete.
    pub fn cache_tmp_file(&self, id: &VideoId) -> std::io::Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix(&format!(".{id}-"))
            .suffix(&format!(".{CACHE_EXT}"))
            .tempfile_in(&self.cache_dir)
    }

    /// Resolve a client-supplied file name to an existing artifact.
    ///
    /// The name is reduced to its base component, so traversal segments
    /// never leave the artifact directories. The cache directory wins over
    /// the download directory.
    pub fn resolve_serve_path(&self, filename: &str) -> Option<PathBuf> {
        let base = Path::new(filename).file_name()?;
        for dir in [&self.cache_dir, &self.download_dir] {
            let candidate = dir.join(base);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}
