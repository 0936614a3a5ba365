//! Video production pipeline.
//!
//! Reconciles the disk-backed artifact cache, the at-most-one-producer
//! registry, and the two delivery modes (pre-transcoded file vs. live
//! stream) on top of the resolver and engine collaborators.
//!
//! Production flow for a cache miss: claim the registry slot, download
//! the raw file, transcode it into the cache format, then let the caller
//! serve the cached artifact. A second request for the same identifier
//! during production is answered with [`PipelineError::InFlight`]
//! immediately instead of waiting for the result.

pub mod error;
pub mod inflight;
pub mod quality;

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::engine::{LiveStream, TranscodeEngine, TranscodeParams};
use crate::resolver::SourceResolver;
use crate::storage::{MediaArtifact, StorageLayout, VideoId};
use error::{PipelineError, Result};
use inflight::InFlightRegistry;
use quality::QualitySpec;

pub struct VideoPipeline {
    storage: StorageLayout,
    resolver: Arc<dyn SourceResolver>,
    engine: Arc<dyn TranscodeEngine>,
    quality: QualitySpec,
    url_format: String,
    inflight: InFlightRegistry,
}

impl VideoPipeline {
    /// Create a pipeline over the given storage layout and collaborators.
    ///
    /// `url_format` is the public video page URL with an `{id}`
    /// placeholder.
    pub fn new(
        storage: StorageLayout,
        resolver: Arc<dyn SourceResolver>,
        engine: Arc<dyn TranscodeEngine>,
        quality: QualitySpec,
        url_format: String,
    ) -> Self {
        Self {
            storage,
            resolver,
            engine,
            quality,
            url_format,
            inflight: InFlightRegistry::new(),
        }
    }

    pub fn storage(&self) -> &StorageLayout {
        &self.storage
    }

    pub fn quality(&self) -> QualitySpec {
        self.quality
    }

    fn video_url(&self, id: &VideoId) -> String {
        self.url_format.replace("{id}", id.as_str())
    }

    /// Ensure the raw download for `id` exists, returning its metadata.
    ///
    /// Idempotent short-circuit: an existing raw artifact means zero
    /// resolver calls.
    pub async fn ensure_raw(&self, id: &VideoId) -> Result<MediaArtifact> {
        let raw_path = self.storage.raw_path(id);
        if raw_path.exists() {
            debug!(id = %id, "raw artifact already present");
            return MediaArtifact::from_path(&raw_path);
        }

        let url = self.video_url(id);
        info!(id = %id, quality = self.quality.height(), "downloading source video");

        let tmp = self.storage.raw_tmp_file(id)?.into_temp_path();
        if let Err(e) = self.resolver.fetch_to_file(&url, self.quality, &tmp).await {
            error!(id = %id, error = %e, "source resolution failed");
            return Err(e);
        }
        tmp.persist(&raw_path).map_err(|e| PipelineError::Io(e.error))?;

        MediaArtifact::from_path(&raw_path)
    }

    /// Ensure the cached transcode for `id` exists, returning its
    /// metadata. Claims the in-flight registry for the whole production
    /// run; a concurrent duplicate gets [`PipelineError::InFlight`].
    pub async fn ensure_cached(&self, id: &VideoId) -> Result<MediaArtifact> {
        let cache_path = self.storage.cache_path(id);
        if cache_path.exists() {
            debug!(id = %id, "cached artifact already present");
            return MediaArtifact::from_path(&cache_path);
        }

        let _guard = self
            .inflight
            .try_acquire(id)
            .ok_or_else(|| PipelineError::InFlight(id.to_string()))?;

        // A producer may have finished between the check and the acquire.
        if cache_path.exists() {
            return MediaArtifact::from_path(&cache_path);
        }

        let raw = self.ensure_raw(id).await?;

        info!(id = %id, quality = self.quality.height(), "transcoding to cache format");

        let tmp = self.storage.cache_tmp_file(id)?.into_temp_path();
        let params = TranscodeParams::batch_webm(self.quality);
        if let Err(e) = self.engine.convert_file(&raw.path, &tmp, &params).await {
            error!(id = %id, error = %e, "transcode failed");
            return Err(e);
        }

        // A zero-length output means the engine exited cleanly without
        // actually producing anything.
        let produced = std::fs::metadata(&tmp).map(|m| m.len() > 0).unwrap_or(false);
        if !produced {
            error!(id = %id, "transcode produced no output");
            return Err(PipelineError::transcode(format!(
                "engine produced no output for {id}"
            )));
        }
        tmp.persist(&cache_path)
            .map_err(|e| PipelineError::Io(e.error))?;

        MediaArtifact::from_path(&cache_path)
    }

    /// Start a live transcode of `id`, seeking approximately to
    /// `seek_offset_bytes` (see [`quality::seek_seconds_for_offset`]).
    ///
    /// Touches neither the cache nor the registry; the returned stream
    /// owns the engine process and terminates it when dropped.
    pub async fn stream_live(&self, id: &VideoId, seek_offset_bytes: u64) -> Result<LiveStream> {
        let url = self.video_url(id);
        let direct_url = match self.resolver.resolve_direct_url(&url, self.quality).await {
            Ok(direct_url) => direct_url,
            Err(e) => {
                error!(id = %id, error = %e, "direct url resolution failed");
                return Err(e);
            }
        };

        let seek =
            (seek_offset_bytes > 0).then(|| quality::seek_seconds_for_offset(seek_offset_bytes));
        info!(id = %id, ?seek, "starting live transcode");

        let params = TranscodeParams::live_flv(self.quality, seek);
        self.engine.convert_to_stream(&direct_url, &params).await
    }
}
