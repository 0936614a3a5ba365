//! External tool detection and management.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::ToolsConfig;

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if a tool is available using a custom version argument.
pub fn check_tool_with_arg(name: &str, command: &Path, version_arg: &str) -> ToolInfo {
    let result = Command::new(command).arg(version_arg).output();

    match result {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            let path = which::which(command).ok();

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Resolve a tool's command, preferring a configured path over PATH lookup.
pub fn resolve_tool(name: &str, configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(path) => path.to_path_buf(),
        // Fall back to the bare name so PATH lookup happens at spawn time.
        None => which::which(name).unwrap_or_else(|_| PathBuf::from(name)),
    }
}

/// Check the tools the pipeline shells out to.
pub fn check_tools(config: &ToolsConfig) -> Vec<ToolInfo> {
    vec![
        check_tool_with_arg(
            "ffmpeg",
            &resolve_tool("ffmpeg", config.ffmpeg.as_deref()),
            "-version",
        ),
        check_tool_with_arg(
            "yt-dlp",
            &resolve_tool("yt-dlp", config.ytdlp.as_deref()),
            "--version",
        ),
    ]
}
