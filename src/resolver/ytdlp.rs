//! yt-dlp subprocess backend.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::SourceResolver;
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::quality::QualitySpec;

/// Source resolver backed by the `yt-dlp` executable.
pub struct YtDlpResolver {
    binary: PathBuf,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Format sort expression preferring the target resolution in an
    /// mp4/m4a container.
    fn format_sort(quality: QualitySpec) -> String {
        format!("res:{},ext:mp4:m4a", quality.height())
    }
}

#[async_trait]
impl SourceResolver for YtDlpResolver {
    async fn fetch_to_file(&self, url: &str, quality: QualitySpec, dest: &Path) -> Result<()> {
        debug!(url, dest = %dest.display(), "invoking yt-dlp download");

        let output = Command::new(&self.binary)
            .arg("--format-sort")
            .arg(Self::format_sort(quality))
            .arg("--no-playlist")
            .arg("--continue")
            .arg("--output")
            .arg(dest)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(PipelineError::resolution(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                last_stderr_line(&output.stderr)
            )));
        }

        // yt-dlp reports success for some no-op invocations without
        // producing a file.
        let downloaded = std::fs::metadata(dest).map(|m| m.len() > 0).unwrap_or(false);
        if !downloaded {
            return Err(PipelineError::resolution(format!(
                "yt-dlp produced no file at {}",
                dest.display()
            )));
        }

        Ok(())
    }

    async fn resolve_direct_url(&self, url: &str, quality: QualitySpec) -> Result<String> {
        debug!(url, "invoking yt-dlp url resolution");

        let output = Command::new(&self.binary)
            .arg("--format-sort")
            .arg(Self::format_sort(quality))
            .arg("--no-playlist")
            .arg("--print")
            .arg("urls")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(PipelineError::resolution(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                last_stderr_line(&output.stderr)
            )));
        }

        // One url per selected stream; the first is the one to play.
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| PipelineError::resolution(format!("yt-dlp returned no url for {url}")))
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sort() {
        assert_eq!(
            YtDlpResolver::format_sort(QualitySpec::new(360)),
            "res:360,ext:mp4:m4a"
        );
        assert_eq!(
            YtDlpResolver::format_sort(QualitySpec::new(720)),
            "res:720,ext:mp4:m4a"
        );
    }

    #[test]
    fn test_last_stderr_line() {
        assert_eq!(
            last_stderr_line(b"warning: x\nERROR: video unavailable\n\n"),
            "ERROR: video unavailable"
        );
        assert_eq!(last_stderr_line(b""), "(no stderr)");
    }
}
