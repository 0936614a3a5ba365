//! Transcoding engine abstraction.
//!
//! A [`TranscodeEngine`] converts media between formats in two modes:
//! file-to-file for the on-disk cache, and URL-to-pipe for live
//! streaming. The parameter set is deterministic per mode; see
//! [`TranscodeParams`].

mod ffmpeg;

pub use ffmpeg::FfmpegEngine;

use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::process::Child;

use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::quality::QualitySpec;

/// Full parameter set for one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeParams {
    /// Target vertical resolution; width follows the aspect ratio.
    pub height: u32,
    pub video_codec: String,
    pub video_bitrate: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub frame_rate: u32,
    pub keyframe_interval: u32,
    pub container: String,
    /// Input-side seek, seconds. Live streaming only.
    pub seek_offset_secs: Option<f64>,
}

impl TranscodeParams {
    /// WebM (VP8/Vorbis) parameter set for the on-disk cache, chosen for
    /// broad compatibility with constrained clients.
    pub fn batch_webm(quality: QualitySpec) -> Self {
        Self {
            height: quality.height(),
            video_codec: "libvpx".to_string(),
            video_bitrate: quality.video_bitrate().to_string(),
            audio_codec: "libvorbis".to_string(),
            audio_bitrate: "128k".to_string(),
            frame_rate: 30,
            keyframe_interval: 30,
            container: "webm".to_string(),
            seek_offset_secs: None,
        }
    }

    /// FLV (FLV1/MP3) parameter set for live streaming.
    pub fn live_flv(quality: QualitySpec, seek_offset_secs: Option<f64>) -> Self {
        Self {
            height: quality.height(),
            video_codec: "flv1".to_string(),
            video_bitrate: quality.video_bitrate().to_string(),
            audio_codec: "mp3".to_string(),
            audio_bitrate: "96k".to_string(),
            frame_rate: 24,
            keyframe_interval: 24,
            container: "flv".to_string(),
            seek_offset_secs,
        }
    }
}

#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// File-to-file conversion. Resolves once the engine exits.
    async fn convert_file(
        &self,
        input: &Path,
        output: &Path,
        params: &TranscodeParams,
    ) -> Result<()>;

    /// URL-to-pipe conversion: starts the engine and returns its output
    /// byte stream.
    async fn convert_to_stream(&self, input_url: &str, params: &TranscodeParams)
        -> Result<LiveStream>;
}

/// A running live conversion: the engine's ordered output bytes plus
/// ownership of the underlying process. Dropping the stream terminates
/// the engine, so an abandoned stream never runs to completion unobserved.
pub struct LiveStream {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    _child: Option<Child>,
}

impl std::fmt::Debug for LiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveStream")
            .field("has_child", &self._child.is_some())
            .finish_non_exhaustive()
    }
}

impl LiveStream {
    /// Wrap a spawned engine process. The child must have been spawned
    /// with piped stdout and `kill_on_drop`.
    pub fn from_child(mut child: Child) -> Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::transcode("engine stdout not piped"))?;
        Ok(Self {
            reader: Box::new(stdout),
            _child: Some(child),
        })
    }

    /// Stream over an in-memory reader. Used by mock engines in tests.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            _child: None,
        }
    }
}

impl AsyncRead for LiveStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}
