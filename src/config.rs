use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::wizard::options::{SubtitleFormat, TranscribeOptions, TranscribeTask};

/// Environment variable that overrides `server.base_url`.
pub const SERVER_URL_ENV: &str = "SUBWIZ_SERVER_URL";

/// Bound on the best-effort session calls.
pub const DEFAULT_CLEANUP_TIMEOUT_SECS: u64 = 10;

/// Largest file the server accepts, 200 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub transcription: TranscriptionConfig,
    pub download: DownloadConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    /// Per-request timeout. Unset means wait as long as the server needs.
    pub timeout_secs: Option<u64>,
    /// Timeout for the best-effort `/download-complete` and `/clear` calls,
    /// which must never hold up the wizard.
    pub cleanup_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub model: String,
    /// Language hint; empty means auto-detect.
    pub language: String,
    pub task: TranscribeTask,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub format: SubtitleFormat,
    pub directory: PathBuf,
    /// Tell the server once a download is saved so it can free storage.
    pub release_after_download: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Lines of transcript shown while the preview is collapsed.
    pub preview_lines: usize,
}

// --- Default implementations ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: None,
            cleanup_timeout_secs: DEFAULT_CLEANUP_TIMEOUT_SECS,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            language: String::new(),
            task: TranscribeTask::Transcribe,
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            format: SubtitleFormat::Srt,
            directory: default_download_dir(),
            release_after_download: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { preview_lines: 8 }
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

impl TranscriptionConfig {
    /// Form options the wizard sends unless the user overrides them.
    pub fn options(&self) -> TranscribeOptions {
        let language = self.language.trim();
        TranscribeOptions {
            model: self.model.clone(),
            language: (!language.is_empty()).then(|| language.to_string()),
            task: self.task,
        }
    }
}

// --- Config loading ---

impl Config {
    /// Load config and return the resolved file path (if any).
    pub fn load_with_path(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        // 1. Check explicit path
        if let Some(p) = path {
            let content = std::fs::read_to_string(p).map_err(|e| {
                anyhow::anyhow!("Failed to read config file {}: {}", p.display(), e)
            })?;
            let config: Config = toml::from_str(&content)?;
            return Ok((config, Some(p.to_path_buf())));
        }

        // 2. Check beside the executable
        if let Ok(exe_path) = std::env::current_exe() {
            let beside_exe = exe_path.parent().map(|p| p.join("subwiz.toml"));
            if let Some(p) = beside_exe {
                if p.exists() {
                    let content = std::fs::read_to_string(&p)?;
                    let config: Config = toml::from_str(&content)?;
                    return Ok((config, Some(p)));
                }
            }
        }

        // 3. Check platform config directory (e.g. ~/.config/subwiz/config.toml)
        if let Some(p) = Self::platform_path() {
            if p.exists() {
                let content = std::fs::read_to_string(&p)?;
                let config: Config = toml::from_str(&content)?;
                return Ok((config, Some(p)));
            }
        }

        // 4. Fall back to defaults
        tracing::info!("No config file found, using defaults");
        Ok((Config::default(), None))
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_path(path).map(|(config, _)| config)
    }

    /// Where `init-config` writes when no path is given.
    pub fn platform_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("subwiz").join("config.toml"))
    }

    /// Apply the environment variable and command-line server overrides, in
    /// that order.
    pub fn apply_overrides(&mut self, server_flag: Option<&str>) {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                self.server.base_url = url.trim().to_string();
            }
        }
        if let Some(url) = server_flag {
            self.server.base_url = url.to_string();
        }
    }

    /// Generate a default config file with all fields and inline documentation.
    pub fn generate_default_commented() -> String {
        let download_dir = default_download_dir();
        let download_dir_str = download_dir.to_string_lossy().replace('\\', "\\\\");

        format!(
r#"# subwiz configuration
# Settings for the upload, transcribe and download wizard.

[server]
# Base URL of the subtitle server. The SUBWIZ_SERVER_URL environment variable
# and the --server flag take precedence.
base_url = "http://127.0.0.1:5000"
# Per-request timeout in seconds. Leave unset to wait as long as the server
# needs (large files can take many minutes to transcribe).
# timeout_secs = 600
# Seconds to wait for the server to acknowledge a finished download or a
# cleared session. These calls are best effort, so the wizard moves on
# regardless.
cleanup_timeout_secs = 10

[upload]
# Files larger than this many bytes are rejected before anything is sent.
# 209715200 bytes = 200 MiB, the server's own limit.
max_bytes = 209715200

[transcription]
# Whisper model: tiny, base, small, medium or large.
model = "base"
# Language hint such as "en" or "de". Empty lets the server auto-detect.
language = ""
# "transcribe" keeps the spoken language, "translate" produces English.
task = "transcribe"

[download]
# Default subtitle format: srt, vtt or txt.
format = "srt"
# Directory downloaded subtitles are saved to.
directory = "{download_dir}"
# Tell the server once a download is saved so it can delete its copy.
release_after_download = true

[display]
# Transcript lines shown while the preview is collapsed.
preview_lines = 8
"#,
            download_dir = download_dir_str
        )
    }
}
