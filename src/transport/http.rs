use std::fs::File;
use std::io::{self, Read};
use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::CONTENT_DISPOSITION;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ServerConfig;
use crate::transport::{
    DownloadPayload, ProgressFn, StatusReply, TranscribeReply, TransportError, UploadReply,
    WizardTransport,
};
use crate::wizard::options::{SubtitleFormat, TranscribeOptions};
use crate::wizard::state::SelectedFile;

/// Talks to the subtitle server over HTTP. The cookie store keeps the
/// server's session cookie between calls, which is how the server ties an
/// upload to the later transcribe and download requests.
pub struct HttpTransport {
    base: Url,
    client: Client,
    cleanup_timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl HttpTransport {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let base = normalize_base(&config.base_url)?;

        // No timeout unless configured: a slow transcription is still a
        // transcription.
        let client = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()
            .context("Failed to build HTTP client")?;

        tracing::debug!("Using server at {}", base);
        Ok(Self {
            base,
            client,
            cleanup_timeout: Duration::from_secs(config.cleanup_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, name: &str) -> Result<Url, TransportError> {
        self.base
            .join(name)
            .map_err(|e| TransportError::Network(format!("invalid endpoint '{name}': {e}")))
    }

    fn post(&self, name: &str) -> Result<reqwest::blocking::RequestBuilder, TransportError> {
        let url = self.endpoint(name)?;
        tracing::debug!("POST {}", url);
        Ok(self.client.post(url))
    }
}

/// Parse the configured base URL and make sure endpoint names join beneath
/// its path instead of replacing the last segment.
fn normalize_base(raw: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(raw.trim())
        .with_context(|| format!("Invalid server URL '{}'", raw.trim()))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("Server URL must use http or https, got '{}'", url.scheme());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn network(err: reqwest::Error) -> TransportError {
    TransportError::Network(err.to_string())
}

/// A non-empty `error` member of a JSON reply body.
fn error_field(body: &serde_json::Value) -> Option<String> {
    match body.get("error")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Turn a JSON endpoint's response into the typed reply or a classified
/// error.
fn json_reply<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    let text = response.text().map_err(network)?;
    let parsed = serde_json::from_str::<serde_json::Value>(&text);

    if !status.is_success() {
        let message = parsed.ok().as_ref().and_then(error_field);
        return Err(TransportError::Server {
            status: Some(status.as_u16()),
            message,
        });
    }

    let body = parsed.map_err(|e| TransportError::Malformed(e.to_string()))?;
    if let Some(message) = error_field(&body) {
        return Err(TransportError::Server {
            status: Some(status.as_u16()),
            message: Some(message),
        });
    }

    serde_json::from_value(body).map_err(|e| TransportError::Malformed(e.to_string()))
}

/// Wraps the upload stream and reports cumulative bytes read.
struct ProgressReader<R> {
    inner: R,
    sent: u64,
    total: u64,
    report: ProgressFn,
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.sent += n as u64;
            (self.report)(self.sent, self.total);
        }
        Ok(n)
    }
}

impl WizardTransport for HttpTransport {
    fn upload(
        &self,
        file: &SelectedFile,
        progress: ProgressFn,
    ) -> Result<UploadReply, TransportError> {
        let handle = File::open(&file.path)
            .map_err(|e| TransportError::LocalFile(format!("{}: {}", file.path.display(), e)))?;

        let reader = ProgressReader {
            inner: handle,
            sent: 0,
            total: file.size,
            report: progress,
        };
        let part =
            multipart::Part::reader_with_length(reader, file.size).file_name(file.name.clone());
        let form = multipart::Form::new().part("file", part);

        let response = self.post("upload")?.multipart(form).send().map_err(network)?;
        json_reply(response)
    }

    fn transcribe(&self, options: &TranscribeOptions) -> Result<TranscribeReply, TransportError> {
        let mut form = multipart::Form::new();
        for (name, value) in options.form_fields() {
            form = form.text(name, value);
        }

        let response = self.post("transcribe")?.multipart(form).send().map_err(network)?;
        json_reply(response)
    }

    fn download(&self, format: SubtitleFormat) -> Result<DownloadPayload, TransportError> {
        let form = multipart::Form::new().text("format", format.as_str());
        let response = self.post("download")?.multipart(form).send().map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .ok()
                .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
                .as_ref()
                .and_then(error_field);
            return Err(TransportError::Server {
                status: Some(status.as_u16()),
                message,
            });
        }

        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().map_err(network)?.to_vec();

        Ok(DownloadPayload {
            bytes,
            content_disposition,
        })
    }

    fn download_complete(&self) -> Result<StatusReply, TransportError> {
        let response = self
            .post("download-complete")?
            .timeout(self.cleanup_timeout)
            .send()
            .map_err(network)?;
        json_reply(response)
    }

    fn clear(&self) -> Result<(), TransportError> {
        let response = self
            .post("clear")?
            .timeout(self.cleanup_timeout)
            .send()
            .map_err(network)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Server {
                status: Some(status.as_u16()),
                message: None,
            })
        }
    }
}
