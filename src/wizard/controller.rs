use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Config;
use crate::presenter::{Notification, Presenter};
use crate::save::DownloadTarget;
use crate::transport::{ProgressFn, TransportError, UploadReply, WizardTransport};
use crate::wizard::disposition::download_filename;
use crate::wizard::error::WizardError;
use crate::wizard::options::{SubtitleFormat, TranscribeOptions};
use crate::wizard::state::{Operation, SelectedFile, Step, Transition, WizardState};

const UPLOAD_FAILED: &str = "Upload failed.";
const TRANSCRIBE_FAILED: &str = "Something went wrong during transcription.";
const DOWNLOAD_FAILED: &str = "Download failed. Please try again.";
const NETWORK_FAILED: &str = "A network error occurred.";

/// Limits and behaviour switches the controller needs from the config.
#[derive(Debug, Clone)]
pub struct WizardSettings {
    pub max_upload_bytes: u64,
    pub download_dir: PathBuf,
    pub release_after_download: bool,
}

impl WizardSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_bytes: config.upload.max_bytes,
            download_dir: config.download.directory.clone(),
            release_after_download: config.download.release_after_download,
        }
    }
}

/// State and view shared with the upload progress callback, which runs on
/// the transport's thread.
struct Shared<P> {
    state: Mutex<WizardState>,
    presenter: P,
}

impl<P: Presenter> Shared<P> {
    fn state(&self) -> MutexGuard<'_, WizardState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn advance_progress(&self, sent: u64, total: u64) {
        let moved = self.state().progress.advance(sent, total);
        if let Some(percent) = moved {
            self.presenter.upload_progress(percent);
        }
    }
}

/// Drives one upload → transcribe → download session against a server.
///
/// Every operation reports its outcome through the presenter and also
/// returns it, so a script can stop on the first failure while an
/// interactive session just keeps going. The presenter is never called with
/// the state lock held.
pub struct WizardController<T, P> {
    transport: T,
    shared: Arc<Shared<P>>,
    settings: WizardSettings,
}

impl<T, P> WizardController<T, P>
where
    T: WizardTransport,
    P: Presenter + 'static,
{
    pub fn new(transport: T, presenter: P, settings: WizardSettings) -> Self {
        Self {
            transport,
            shared: Arc::new(Shared {
                state: Mutex::new(WizardState::default()),
                presenter,
            }),
            settings,
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> WizardState {
        self.shared.state().clone()
    }

    pub fn presenter(&self) -> &P {
        &self.shared.presenter
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn state(&self) -> MutexGuard<'_, WizardState> {
        self.shared.state()
    }

    /// Report a rejected precondition. Disabled controls stay silent, like a
    /// greyed-out button.
    fn reject(&self, err: WizardError) -> WizardError {
        match &err {
            WizardError::ActionDisabled(action) => {
                tracing::debug!("{} ignored: control disabled", action);
            }
            _ => {
                tracing::warn!("{}", err);
                self.shared.presenter.notify(&Notification::error(err.to_string()));
            }
        }
        err
    }

    /// Report a failed network operation, preferring the server's own words.
    fn fail(&self, err: TransportError, generic: &str) -> WizardError {
        tracing::error!("{}", err);
        let message = match &err {
            TransportError::Network(_) => NETWORK_FAILED.to_string(),
            TransportError::LocalFile(_) => err.to_string(),
            _ => err
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| generic.to_string()),
        };
        self.shared.presenter.notify(&Notification::error(message));
        WizardError::Transport(err)
    }

    fn step_changed(&self, from: Step, to: Step) {
        tracing::info!("Step {} -> {}", from, to);
        self.shared.presenter.step_changed(from, to);
    }

    /// Choose the file to upload, or clear the choice with `None`.
    pub fn select_file(&self, file: Option<SelectedFile>) -> Result<(), WizardError> {
        {
            let mut state = self.state();
            if state.is_in_flight(Operation::Upload) {
                drop(state);
                return Err(self.reject(WizardError::ActionDisabled("Selecting a file")));
            }
            state.controls.upload = file.is_some();
            state.file = file.clone();
        }

        match &file {
            Some(f) => tracing::info!("Selected {} ({} bytes)", f.path.display(), f.size),
            None => tracing::info!("Selection cleared"),
        }
        self.shared.presenter.file_selected(file.as_ref());
        Ok(())
    }

    fn begin_upload(&self, state: &mut WizardState) -> Result<SelectedFile, WizardError> {
        if state.step != Step::Upload {
            return Err(WizardError::WrongStep {
                action: "upload",
                step: state.step,
            });
        }
        let file = state.file.clone().ok_or(WizardError::NoFileSelected)?;
        if !state.controls.upload {
            return Err(WizardError::ActionDisabled("Upload"));
        }
        if file.size > self.settings.max_upload_bytes {
            return Err(WizardError::FileTooLarge {
                size: file.size,
                limit: self.settings.max_upload_bytes,
            });
        }

        state.controls.upload = false;
        state.progress.reset();
        state.begin(Operation::Upload);
        Ok(file)
    }

    /// Send the selected file to the server and move on to transcription.
    pub fn upload_selected(&self) -> Result<UploadReply, WizardError> {
        let checked = {
            let mut state = self.state();
            self.begin_upload(&mut state)
        };
        let file = checked.map_err(|e| self.reject(e))?;

        tracing::info!("Uploading {} ({} bytes)", file.name, file.size);
        self.shared.presenter.upload_started(file.size);

        let shared = Arc::clone(&self.shared);
        let progress: ProgressFn = Arc::new(move |sent, total| shared.advance_progress(sent, total));
        let result = self.transport.upload(&file, progress);
        self.shared.presenter.upload_finished();

        match result {
            Ok(reply) => {
                let moved = {
                    let mut state = self.state();
                    state.settle(Operation::Upload);
                    state.transition(Transition::UploadSucceeded)
                };
                moved.map_err(|e| self.reject(e))?;
                self.step_changed(Step::Upload, Step::Transcribe);
                self.shared
                    .presenter
                    .notify(&Notification::success("File uploaded successfully!"));
                Ok(reply)
            }
            Err(err) => {
                {
                    let mut state = self.state();
                    state.settle(Operation::Upload);
                    state.controls.upload = state.file.is_some();
                }
                Err(self.fail(err, UPLOAD_FAILED))
            }
        }
    }

    /// Ask the server to transcribe the uploaded file. Returns the preview.
    pub fn transcribe_selected(&self, options: &TranscribeOptions) -> Result<String, WizardError> {
        let checked = {
            let mut state = self.state();
            if state.step != Step::Transcribe {
                Err(WizardError::WrongStep {
                    action: "transcribe",
                    step: state.step,
                })
            } else if !state.controls.transcribe {
                Err(WizardError::ActionDisabled("Transcribe"))
            } else {
                state.controls.transcribe = false;
                state.begin(Operation::Transcribe);
                Ok(())
            }
        };
        checked.map_err(|e| self.reject(e))?;

        options.warn_unknown();
        tracing::info!(
            "Transcribing with model={} language={} task={}",
            options.model,
            options.language.as_deref().unwrap_or("auto"),
            options.task
        );
        self.shared.presenter.processing(true);
        let result = self.transport.transcribe(options);
        self.shared.presenter.processing(false);

        match result {
            Ok(reply) => {
                let moved = {
                    let mut state = self.state();
                    state.settle(Operation::Transcribe);
                    state.preview = Some(reply.preview.clone());
                    state.preview_expanded = false;
                    state.transition(Transition::TranscribeSucceeded)
                };
                moved.map_err(|e| self.reject(e))?;
                self.step_changed(Step::Transcribe, Step::Download);
                self.shared.presenter.preview(&reply.preview, false);
                self.shared
                    .presenter
                    .notify(&Notification::success("Transcription completed!"));
                Ok(reply.preview)
            }
            Err(err) => {
                {
                    let mut state = self.state();
                    state.settle(Operation::Transcribe);
                    state.controls.transcribe = true;
                }
                Err(self.fail(err, TRANSCRIBE_FAILED))
            }
        }
    }

    /// Fetch the subtitles in `format` and save them to the download
    /// directory. Returns where the file landed.
    pub fn download_selected(&self, format: &str) -> Result<PathBuf, WizardError> {
        let checked = {
            let mut state = self.state();
            if state.step != Step::Download {
                Err(WizardError::WrongStep {
                    action: "download",
                    step: state.step,
                })
            } else {
                match format.parse::<SubtitleFormat>() {
                    Err(e) => Err(e),
                    Ok(_) if !state.controls.download => {
                        Err(WizardError::ActionDisabled("Download"))
                    }
                    Ok(parsed) => {
                        state.controls.download = false;
                        state.format = Some(parsed);
                        state.begin(Operation::Download);
                        Ok(parsed)
                    }
                }
            }
        };
        let format = checked.map_err(|e| self.reject(e))?;

        let result = self.fetch_and_save(format);
        {
            let mut state = self.state();
            state.settle(Operation::Download);
            state.controls.download = true;
        }

        let saved = result?;
        self.shared.presenter.notify(&Notification::success(format!(
            "Subtitles downloaded in {} format: {}",
            format.as_str().to_uppercase(),
            saved.display()
        )));

        if self.settings.release_after_download {
            self.release_download();
        }
        Ok(saved)
    }

    fn fetch_and_save(&self, format: SubtitleFormat) -> Result<PathBuf, WizardError> {
        let target = DownloadTarget::open(&self.settings.download_dir)
            .map_err(|e| self.reject(WizardError::Save(format!("{e:#}"))))?;

        tracing::info!("Downloading {} subtitles", format);
        let payload = match self.transport.download(format) {
            Ok(payload) => payload,
            Err(err) => {
                target.discard();
                return Err(self.fail(err, DOWNLOAD_FAILED));
            }
        };

        let filename = download_filename(payload.content_disposition.as_deref(), format);
        let saved = target
            .commit(&payload.bytes, &filename)
            .map_err(|e| self.reject(WizardError::Save(format!("{e:#}"))))?;
        tracing::info!("Saved {} bytes to {}", payload.bytes.len(), saved.display());
        Ok(saved)
    }

    /// Best effort: the file is already saved, so failures are only logged.
    fn release_download(&self) {
        match self.transport.download_complete() {
            Ok(reply) => tracing::debug!(
                "Server released download ({})",
                reply.status.as_deref().unwrap_or("no status")
            ),
            Err(e) => tracing::warn!("Could not notify server of completed download: {}", e),
        }
    }

    /// Leave the transcribe step without losing the selected file.
    pub fn go_back_to_upload(&self) -> Result<(), WizardError> {
        let moved = {
            let mut state = self.state();
            if state.any_in_flight() {
                Err(WizardError::ActionDisabled("Back"))
            } else {
                let moved = state.transition(Transition::Back);
                if moved.is_ok() {
                    state.controls.upload = state.file.is_some();
                }
                moved
            }
        };
        moved.map_err(|e| self.reject(e))?;
        self.step_changed(Step::Transcribe, Step::Upload);
        Ok(())
    }

    /// Clear the server session and reset everything local. The local reset
    /// happens whether or not the server call succeeds.
    pub fn start_over(&self) -> Result<(), WizardError> {
        let checked = {
            let state = self.state();
            if state.step != Step::Download {
                Err(WizardError::WrongStep {
                    action: "start over",
                    step: state.step,
                })
            } else if state.any_in_flight() {
                Err(WizardError::ActionDisabled("New file"))
            } else {
                Ok(())
            }
        };
        checked.map_err(|e| self.reject(e))?;

        if let Err(e) = self.transport.clear() {
            tracing::warn!("Could not clear server session: {}", e);
        }

        let from = {
            let mut state = self.state();
            let from = state.step;
            state.reset_session();
            if state.transition(Transition::NewFile).is_err() {
                tracing::debug!("Session already back at {}", state.step);
            }
            from
        };
        self.shared.presenter.file_selected(None);
        if from != Step::Upload {
            self.step_changed(from, Step::Upload);
        }
        Ok(())
    }

    /// Flip the transcript preview between collapsed and full. Returns the
    /// new expansion state.
    pub fn toggle_preview_expansion(&self) -> bool {
        let (preview, expanded) = {
            let mut state = self.state();
            state.preview_expanded = !state.preview_expanded;
            (state.preview.clone(), state.preview_expanded)
        };
        if let Some(text) = preview {
            self.shared.presenter.preview(&text, expanded);
        }
        expanded
    }
}
