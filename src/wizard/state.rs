use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::wizard::error::WizardError;
use crate::wizard::options::SubtitleFormat;

/// Which part of the wizard is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Upload,
    Transcribe,
    Download,
}

impl Step {
    /// 1-based position shown in the step indicator.
    pub fn number(&self) -> u8 {
        match self {
            Self::Upload => 1,
            Self::Transcribe => 2,
            Self::Download => 3,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => write!(f, "upload"),
            Self::Transcribe => write!(f, "transcribe"),
            Self::Download => write!(f, "download"),
        }
    }
}

/// Events that move the wizard between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    UploadSucceeded,
    TranscribeSucceeded,
    Back,
    NewFile,
}

impl Transition {
    fn action(&self) -> &'static str {
        match self {
            Self::UploadSucceeded => "finish an upload",
            Self::TranscribeSucceeded => "finish a transcription",
            Self::Back => "go back to upload",
            Self::NewFile => "start over",
        }
    }
}

/// A local file chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

impl SelectedFile {
    /// Read name and size from the filesystem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        if !metadata.is_file() {
            anyhow::bail!("{} is not a regular file", path.display());
        }
        let name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("path has no filename: {}", path.display()))?
            .to_string_lossy()
            .to_string();
        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
        })
    }

    pub fn size_mb(&self) -> f64 {
        self.size as f64 / 1_048_576.0
    }
}

/// Upload percentage for the current transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadProgress {
    percent: u8,
}

impl UploadProgress {
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Fold in a transfer counter update. Returns the new percentage when it
    /// moved forward; updates without a known total, or that would move the
    /// bar backwards, are ignored.
    pub fn advance(&mut self, sent: u64, total: u64) -> Option<u8> {
        if total == 0 {
            return None;
        }
        let ratio = sent.min(total) as f64 / total as f64;
        let percent = (ratio * 100.0).round() as u8;
        if percent > self.percent {
            self.percent = percent;
            Some(percent)
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.percent = 0;
    }
}

/// Enabled state of the three action controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub upload: bool,
    pub transcribe: bool,
    pub download: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            upload: false,
            transcribe: true,
            download: true,
        }
    }
}

/// Network operations the controller can have outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Transcribe,
    Download,
}

/// Everything the wizard knows about the current session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardState {
    pub step: Step,
    pub file: Option<SelectedFile>,
    pub progress: UploadProgress,
    pub preview: Option<String>,
    pub preview_expanded: bool,
    pub format: Option<SubtitleFormat>,
    pub controls: Controls,
    in_flight: Vec<Operation>,
}

impl WizardState {
    /// Apply a step transition, rejecting any edge the wizard does not have.
    pub fn transition(&mut self, transition: Transition) -> Result<Step, WizardError> {
        let next = match (self.step, transition) {
            (Step::Upload, Transition::UploadSucceeded) => Step::Transcribe,
            (Step::Transcribe, Transition::TranscribeSucceeded) => Step::Download,
            (Step::Transcribe, Transition::Back) => Step::Upload,
            (Step::Download, Transition::NewFile) => Step::Upload,
            (step, transition) => {
                return Err(WizardError::WrongStep {
                    action: transition.action(),
                    step,
                })
            }
        };
        self.step = next;
        Ok(next)
    }

    /// Return to the initial state. The step itself moves through
    /// [`Transition::NewFile`] so callers keep the step machine honest.
    pub fn reset_session(&mut self) {
        self.file = None;
        self.progress.reset();
        self.preview = None;
        self.preview_expanded = false;
        self.format = None;
        self.controls = Controls::default();
    }

    pub fn is_in_flight(&self, operation: Operation) -> bool {
        self.in_flight.contains(&operation)
    }

    pub fn any_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub(crate) fn begin(&mut self, operation: Operation) {
        if !self.in_flight.contains(&operation) {
            self.in_flight.push(operation);
        }
    }

    pub(crate) fn settle(&mut self, operation: Operation) {
        self.in_flight.retain(|op| *op != operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initial_state() {
        let state = WizardState::default();
        assert_eq!(state.step, Step::Upload);
        assert!(state.file.is_none());
        assert_eq!(state.progress.percent(), 0);
        assert!(!state.controls.upload);
        assert!(state.controls.transcribe);
        assert!(state.controls.download);
        assert!(!state.any_in_flight());
    }

    #[test]
    fn test_full_cycle_transitions() {
        let mut state = WizardState::default();
        assert_eq!(state.transition(Transition::UploadSucceeded).unwrap(), Step::Transcribe);
        assert_eq!(state.transition(Transition::TranscribeSucceeded).unwrap(), Step::Download);
        assert_eq!(state.transition(Transition::NewFile).unwrap(), Step::Upload);
        // restartable
        assert_eq!(state.transition(Transition::UploadSucceeded).unwrap(), Step::Transcribe);
        assert_eq!(state.transition(Transition::Back).unwrap(), Step::Upload);
    }

    #[test]
    fn test_upload_cannot_skip_to_download() {
        let mut state = WizardState::default();
        let err = state.transition(Transition::TranscribeSucceeded).unwrap_err();
        assert!(matches!(err, WizardError::WrongStep { step: Step::Upload, .. }));
        assert_eq!(state.step, Step::Upload);
    }

    #[test]
    fn test_back_only_from_transcribe() {
        let mut state = WizardState::default();
        assert!(state.transition(Transition::Back).is_err());
        state.step = Step::Download;
        assert!(state.transition(Transition::Back).is_err());
        assert_eq!(state.step, Step::Download);
    }

    #[test]
    fn test_new_file_only_from_download() {
        let mut state = WizardState::default();
        state.step = Step::Transcribe;
        assert!(state.transition(Transition::NewFile).is_err());
        assert_eq!(state.step, Step::Transcribe);
    }

    #[test]
    fn test_progress_rounds_and_is_monotonic() {
        let mut progress = UploadProgress::default();
        assert_eq!(progress.advance(1, 3), Some(33));
        assert_eq!(progress.advance(2, 3), Some(67));
        // a stale counter never moves the bar backwards
        assert_eq!(progress.advance(1, 3), None);
        assert_eq!(progress.percent(), 67);
        assert_eq!(progress.advance(3, 3), Some(100));
        assert_eq!(progress.advance(3, 3), None);
    }

    #[test]
    fn test_progress_bounded_and_ignores_unknown_total() {
        let mut progress = UploadProgress::default();
        assert_eq!(progress.advance(10, 0), None);
        assert_eq!(progress.advance(500, 100), Some(100));
        assert_eq!(progress.percent(), 100);
        progress.reset();
        assert_eq!(progress.percent(), 0);
    }

    #[test]
    fn test_reset_session_clears_entities() {
        let mut state = WizardState {
            step: Step::Download,
            file: Some(SelectedFile {
                path: PathBuf::from("talk.mp3"),
                name: "talk.mp3".to_string(),
                size: 10,
            }),
            preview: Some("hello".to_string()),
            preview_expanded: true,
            format: Some(SubtitleFormat::Vtt),
            ..Default::default()
        };
        state.progress.advance(5, 10);
        state.controls.transcribe = false;

        state.reset_session();
        assert!(state.file.is_none());
        assert!(state.preview.is_none());
        assert!(!state.preview_expanded);
        assert!(state.format.is_none());
        assert_eq!(state.progress.percent(), 0);
        assert_eq!(state.controls, Controls::default());
    }

    #[test]
    fn test_in_flight_tracking() {
        let mut state = WizardState::default();
        state.begin(Operation::Upload);
        state.begin(Operation::Upload);
        assert!(state.is_in_flight(Operation::Upload));
        assert!(!state.is_in_flight(Operation::Download));
        state.settle(Operation::Upload);
        assert!(!state.any_in_flight());
    }

    #[test]
    fn test_selected_file_from_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("lecture.wav");
        std::fs::write(&path, [0u8; 2048]).unwrap();

        let file = SelectedFile::from_path(&path).unwrap();
        assert_eq!(file.name, "lecture.wav");
        assert_eq!(file.size, 2048);
    }

    #[test]
    fn test_selected_file_rejects_directory_and_missing() {
        let tmp = TempDir::new().unwrap();
        assert!(SelectedFile::from_path(tmp.path()).is_err());
        assert!(SelectedFile::from_path(&tmp.path().join("missing.mp3")).is_err());
    }
}
