use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};

use crate::wizard::state::{SelectedFile, Step};

/// How a notification should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "ok"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A non-blocking message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub at: DateTime<Local>,
}

impl Notification {
    pub fn new(title: &str, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.to_string(),
            message: message.into(),
            severity,
            at: Local::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new("Success", message, Severity::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message, Severity::Error)
    }
}

/// Rendering hooks the wizard calls as the session moves along. Only
/// `notify` is required; a view that does not animate anything can ignore
/// the rest.
pub trait Presenter: Send + Sync {
    fn notify(&self, notification: &Notification);

    fn step_changed(&self, _from: Step, _to: Step) {}

    fn file_selected(&self, _file: Option<&SelectedFile>) {}

    fn upload_started(&self, _total_bytes: u64) {}

    /// Called only when the percentage moves forward.
    fn upload_progress(&self, _percent: u8) {}

    fn upload_finished(&self) {}

    /// Transcription is running on the server (`true`) or has settled.
    fn processing(&self, _active: bool) {}

    fn preview(&self, _text: &str, _expanded: bool) {}
}

/// Drops everything except errors, which go to the log.
#[derive(Debug, Default)]
pub struct QuietView;

impl Presenter for QuietView {
    fn notify(&self, notification: &Notification) {
        if notification.severity == Severity::Error {
            tracing::error!("{}: {}", notification.title, notification.message);
        }
    }
}

/// Terminal rendering: timestamped notifications, an upload bar and a
/// transcription spinner.
pub struct ConsoleView {
    preview_lines: usize,
    bar: Mutex<Option<ProgressBar>>,
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleView {
    pub fn new(preview_lines: usize) -> Self {
        Self {
            preview_lines: preview_lines.max(1),
            bar: Mutex::new(None),
            spinner: Mutex::new(None),
        }
    }

    fn println(&self, line: &str) {
        // Print above any active bar so it is not torn.
        let bar = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        match bar.as_ref() {
            Some(pb) => pb.println(line),
            None => write_line(&mut std::io::stdout().lock(), line),
        }
    }
}

/// Write errors on stdout are logged, not propagated.
fn write_line(out: &mut impl Write, line: &str) {
    if let Err(e) = writeln!(out, "{line}") {
        tracing::debug!("Could not write to stdout: {}", e);
    }
}

impl Presenter for ConsoleView {
    fn notify(&self, notification: &Notification) {
        let line = format!(
            "[{}] {} ({}): {}",
            notification.at.format("%H:%M:%S"),
            notification.title,
            notification.severity,
            notification.message
        );
        self.println(&line);
    }

    fn step_changed(&self, _from: Step, to: Step) {
        let marker = |step: Step| {
            if step == to {
                format!("[{}. {}]", step.number(), step)
            } else {
                format!(" {}. {} ", step.number(), step)
            }
        };
        self.println(&format!(
            "{} > {} > {}",
            marker(Step::Upload),
            marker(Step::Transcribe),
            marker(Step::Download)
        ));
    }

    fn file_selected(&self, file: Option<&SelectedFile>) {
        match file {
            Some(file) => self.println(&format!("Selected {} ({:.1} MB)", file.name, file.size_mb())),
            None => self.println("No file selected"),
        }
    }

    fn upload_started(&self, total_bytes: u64) {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(format!("of {:.1} MB", total_bytes as f64 / 1_048_576.0));
        *self.bar.lock().unwrap_or_else(|e| e.into_inner()) = Some(pb);
    }

    fn upload_progress(&self, percent: u8) {
        if let Some(pb) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            pb.set_position(u64::from(percent));
        }
    }

    fn upload_finished(&self) {
        if let Some(pb) = self.bar.lock().unwrap_or_else(|e| e.into_inner()).take() {
            pb.finish_and_clear();
        }
    }

    fn processing(&self, active: bool) {
        let mut spinner = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if active {
            let pb = ProgressBar::new_spinner();
            pb.set_message("Transcribing on the server, this can take a while...");
            pb.enable_steady_tick(Duration::from_millis(120));
            *spinner = Some(pb);
        } else if let Some(pb) = spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn preview(&self, text: &str, expanded: bool) {
        self.println(&render_preview(text, expanded, self.preview_lines));
    }
}

/// Collapse a transcript to its first `max_lines` lines unless expanded.
pub fn render_preview(text: &str, expanded: bool, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if expanded || lines.len() <= max_lines {
        return format!("--- transcript preview ---\n{}\n---", text.trim_end());
    }
    format!(
        "--- transcript preview ---\n{}\n... ({} more lines, `toggle` to expand)\n---",
        lines[..max_lines].join("\n"),
        lines.len() - max_lines
    )
}
