//! ffmpeg subprocess backend.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{LiveStream, TranscodeEngine, TranscodeParams};
use crate::pipeline::error::{PipelineError, Result};

/// Transcoding engine backed by the `ffmpeg` executable.
pub struct FfmpegEngine {
    binary: PathBuf,
}

impl FfmpegEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Argument vector for one conversion. The seek is applied on the
    /// input side so the engine skips decoding up to the offset.
    fn build_args(input: &str, output: &str, params: &TranscodeParams) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        if let Some(seek) = params.seek_offset_secs {
            args.extend(["-ss".to_string(), format!("{seek:.2}")]);
        }

        args.extend(["-i".to_string(), input.to_string()]);
        args.extend(["-vf".to_string(), format!("scale=-1:{}", params.height)]);
        args.extend(["-c:v".to_string(), params.video_codec.clone()]);
        args.extend(["-b:v".to_string(), params.video_bitrate.clone()]);

        if params.video_codec == "libvpx" {
            args.extend(["-cpu-used".to_string(), "8".to_string()]);
            args.extend(["-pix_fmt".to_string(), "yuv420p".to_string()]);
        }

        args.extend(["-c:a".to_string(), params.audio_codec.clone()]);
        args.extend(["-b:a".to_string(), params.audio_bitrate.clone()]);
        args.extend(["-r".to_string(), params.frame_rate.to_string()]);
        args.extend(["-g".to_string(), params.keyframe_interval.to_string()]);
        args.extend(["-f".to_string(), params.container.clone()]);
        args.extend(["-y".to_string(), output.to_string()]);

        args
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn convert_file(
        &self,
        input: &Path,
        output: &Path,
        params: &TranscodeParams,
    ) -> Result<()> {
        let args = Self::build_args(
            &input.to_string_lossy(),
            &output.to_string_lossy(),
            params,
        );
        debug!(?args, "invoking ffmpeg");

        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !result.status.success() {
            return Err(PipelineError::transcode(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                last_stderr_line(&result.stderr)
            )));
        }

        Ok(())
    }

    async fn convert_to_stream(
        &self,
        input_url: &str,
        params: &TranscodeParams,
    ) -> Result<LiveStream> {
        let args = Self::build_args(input_url, "pipe:1", params);
        debug!(?args, "invoking ffmpeg for live stream");

        // ffmpeg chatters progress on stderr for the whole run; without a
        // reader a piped stderr fills up and stalls the encode.
        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        LiveStream::from_child(child)
    }
}

fn last_stderr_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("(no stderr)")
        .to_string()
}
