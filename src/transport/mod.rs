pub mod http;

use std::sync::Arc;

use serde::Deserialize;

use crate::wizard::options::{SubtitleFormat, TranscribeOptions};
use crate::wizard::state::SelectedFile;

pub use http::HttpTransport;

/// Receives `(bytes_sent, bytes_total)` while an upload body is streamed.
/// Called from whichever thread drives the request body.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// How a server call failed, already classified so callers never look at
/// status codes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// Connection refused, dropped or otherwise never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// Non-success status or an `error` field in the JSON body.
    #[error("{}", describe_server_error(.status, .message))]
    Server {
        status: Option<u16>,
        message: Option<String>,
    },

    /// The body could not be understood.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The local file could not be opened for streaming.
    #[error("cannot read local file: {0}")]
    LocalFile(String),
}

fn describe_server_error(status: &Option<u16>, message: &Option<String>) -> String {
    let message = message.as_deref().unwrap_or("no message");
    match status {
        Some(code) => format!("server error (HTTP {code}): {message}"),
        None => format!("server error: {message}"),
    }
}

impl TransportError {
    /// Message the server supplied, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server { message, .. } => message.as_deref().filter(|m| !m.is_empty()),
            _ => None,
        }
    }
}

/// Body of a successful `/upload`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UploadReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body of a successful `/transcribe`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranscribeReply {
    pub preview: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Raw subtitle bytes plus the server's naming hint.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadPayload {
    pub bytes: Vec<u8>,
    pub content_disposition: Option<String>,
}

/// Body of `/download-complete`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StatusReply {
    #[serde(default)]
    pub status: Option<String>,
}

/// The five server endpoints the wizard drives.
pub trait WizardTransport: Send + Sync {
    fn upload(&self, file: &SelectedFile, progress: ProgressFn)
        -> Result<UploadReply, TransportError>;

    fn transcribe(&self, options: &TranscribeOptions) -> Result<TranscribeReply, TransportError>;

    fn download(&self, format: SubtitleFormat) -> Result<DownloadPayload, TransportError>;

    /// Tell the server the download landed so it can drop its copy.
    fn download_complete(&self) -> Result<StatusReply, TransportError>;

    /// Ask the server to forget the current session.
    fn clear(&self) -> Result<(), TransportError>;
}
