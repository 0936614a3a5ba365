use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::pipeline::quality;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub video: VideoConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5005
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory for raw downloads, pre-transcode.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Directory for final, client-ready artifacts.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./data/downloads")
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("./data/cache/videos")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            cache_dir: default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoConfig {
    /// Target vertical resolution in pixels.
    #[serde(default = "default_quality")]
    pub quality: u32,

    /// Public video page URL with an `{id}` placeholder.
    #[serde(default = "default_url_format")]
    pub url_format: String,
}

fn default_quality() -> u32 {
    quality::DEFAULT_HEIGHT
}
fn default_url_format() -> String {
    "https://www.youtube.com/watch?v={id}".to_string()
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            url_format: default_url_format(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Path to the ffmpeg executable (default: PATH lookup).
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the yt-dlp executable (default: PATH lookup).
    #[serde(default)]
    pub ytdlp: Option<PathBuf>,
}
