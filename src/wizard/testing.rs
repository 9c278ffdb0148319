//! In-memory transport and recording view for controller tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Mutex;

use crate::presenter::{Notification, Presenter, Severity};
use crate::transport::{
    DownloadPayload, ProgressFn, StatusReply, TranscribeReply, TransportError, UploadReply,
    WizardTransport,
};
use crate::wizard::controller::{WizardController, WizardSettings};
use crate::wizard::options::{SubtitleFormat, TranscribeOptions};
use crate::wizard::state::{SelectedFile, Step};

#[derive(Default)]
pub(crate) struct FakeTransport {
    /// `(sent, total)` pairs replayed during upload; empty means one final
    /// update for the whole file.
    progress_script: Vec<(u64, u64)>,
    upload_result: Mutex<Option<Result<UploadReply, TransportError>>>,
    transcribe_result: Mutex<Option<Result<TranscribeReply, TransportError>>>,
    download_result: Mutex<Option<Result<DownloadPayload, TransportError>>>,
    download_complete_result: Mutex<Option<Result<StatusReply, TransportError>>>,
    clear_result: Mutex<Option<Result<(), TransportError>>>,
    upload_gate: Mutex<Option<(Sender<()>, Receiver<()>)>>,
    uploads: AtomicUsize,
    transcribes: AtomicUsize,
    download_completes: AtomicUsize,
    clears: AtomicUsize,
    last_options: Mutex<Option<TranscribeOptions>>,
    formats: Mutex<Vec<SubtitleFormat>>,
}

impl FakeTransport {
    pub fn with_progress(progress_script: Vec<(u64, u64)>) -> Self {
        Self {
            progress_script,
            ..Default::default()
        }
    }

    pub fn set_upload_result(&self, result: Result<UploadReply, TransportError>) {
        *self.upload_result.lock().unwrap() = Some(result);
    }

    pub fn set_transcribe_result(&self, result: Result<TranscribeReply, TransportError>) {
        *self.transcribe_result.lock().unwrap() = Some(result);
    }

    pub fn set_download_result(&self, result: Result<DownloadPayload, TransportError>) {
        *self.download_result.lock().unwrap() = Some(result);
    }

    pub fn set_download_complete_result(&self, result: Result<StatusReply, TransportError>) {
        *self.download_complete_result.lock().unwrap() = Some(result);
    }

    pub fn set_clear_result(&self, result: Result<(), TransportError>) {
        *self.clear_result.lock().unwrap() = Some(result);
    }

    /// Make the next upload signal `started` and then wait for `release`.
    pub fn gate_upload(&self, started: Sender<()>, release: Receiver<()>) {
        *self.upload_gate.lock().unwrap() = Some((started, release));
    }

    pub fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn transcribe_calls(&self) -> usize {
        self.transcribes.load(Ordering::SeqCst)
    }

    pub fn download_complete_calls(&self) -> usize {
        self.download_completes.load(Ordering::SeqCst)
    }

    pub fn clear_calls(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn download_formats(&self) -> Vec<SubtitleFormat> {
        self.formats.lock().unwrap().clone()
    }

    pub fn last_options(&self) -> Option<TranscribeOptions> {
        self.last_options.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.upload_calls()
            + self.transcribe_calls()
            + self.download_formats().len()
            + self.download_complete_calls()
            + self.clear_calls()
    }
}

impl WizardTransport for FakeTransport {
    fn upload(
        &self,
        file: &SelectedFile,
        progress: ProgressFn,
    ) -> Result<UploadReply, TransportError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);

        let gate = self.upload_gate.lock().unwrap().take();
        if let Some((started, release)) = gate {
            started.send(()).unwrap();
            release.recv().unwrap();
        }

        if self.progress_script.is_empty() {
            progress(file.size, file.size);
        } else {
            for (sent, total) in &self.progress_script {
                progress(*sent, *total);
            }
        }

        self.upload_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| {
                Ok(UploadReply {
                    message: Some("File uploaded successfully".to_string()),
                    filename: Some(file.name.clone()),
                    status: Some("ready".to_string()),
                })
            })
    }

    fn transcribe(&self, options: &TranscribeOptions) -> Result<TranscribeReply, TransportError> {
        self.transcribes.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        self.transcribe_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| {
                Ok(TranscribeReply {
                    preview: "Transcript preview".to_string(),
                    message: None,
                })
            })
    }

    fn download(&self, format: SubtitleFormat) -> Result<DownloadPayload, TransportError> {
        self.formats.lock().unwrap().push(format);
        self.download_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| {
                Ok(DownloadPayload {
                    bytes: b"1\n00:00:00,000 --> 00:00:02,000\nHello\n".to_vec(),
                    content_disposition: None,
                })
            })
    }

    fn download_complete(&self) -> Result<StatusReply, TransportError> {
        self.download_completes.fetch_add(1, Ordering::SeqCst);
        self.download_complete_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| {
                Ok(StatusReply {
                    status: Some("success".to_string()),
                })
            })
    }

    fn clear(&self) -> Result<(), TransportError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.clear_result.lock().unwrap().clone().unwrap_or(Ok(()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ViewEvent {
    Notify(Notification),
    Step(Step, Step),
    FileSelected(Option<String>),
    UploadStarted(u64),
    Progress(u8),
    UploadFinished,
    Processing(bool),
    Preview(String, bool),
}

#[derive(Default)]
pub(crate) struct RecordingPresenter {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingPresenter {
    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Notify(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter(|n| n.severity == Severity::Error)
            .map(|n| n.message)
            .collect()
    }

    pub fn steps(&self) -> Vec<(Step, Step)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Step(from, to) => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    pub fn progress_values(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ViewEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn notify(&self, notification: &Notification) {
        self.push(ViewEvent::Notify(notification.clone()));
    }

    fn step_changed(&self, from: Step, to: Step) {
        self.push(ViewEvent::Step(from, to));
    }

    fn file_selected(&self, file: Option<&SelectedFile>) {
        self.push(ViewEvent::FileSelected(file.map(|f| f.name.clone())));
    }

    fn upload_started(&self, total_bytes: u64) {
        self.push(ViewEvent::UploadStarted(total_bytes));
    }

    fn upload_progress(&self, percent: u8) {
        self.push(ViewEvent::Progress(percent));
    }

    fn upload_finished(&self) {
        self.push(ViewEvent::UploadFinished);
    }

    fn processing(&self, active: bool) {
        self.push(ViewEvent::Processing(active));
    }

    fn preview(&self, text: &str, expanded: bool) {
        self.push(ViewEvent::Preview(text.to_string(), expanded));
    }
}

/// Write a small file under `dir` and describe it.
pub(crate) fn sample_file(dir: &Path, size: usize) -> SelectedFile {
    let path = dir.join("talk.mp3");
    std::fs::write(&path, vec![0u8; size]).unwrap();
    SelectedFile::from_path(&path).unwrap()
}

/// Controller saving downloads under `dir/downloads`.
pub(crate) fn controller_in(
    dir: &Path,
    transport: FakeTransport,
) -> WizardController<FakeTransport, RecordingPresenter> {
    WizardController::new(
        transport,
        RecordingPresenter::default(),
        WizardSettings {
            max_upload_bytes: 200 * 1024 * 1024,
            download_dir: dir.join("downloads"),
            release_after_download: true,
        },
    )
}
