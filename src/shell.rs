use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;

use crate::presenter::Presenter;
use crate::transport::WizardTransport;
use crate::wizard::options::{TranscribeOptions, TranscribeTask};
use crate::wizard::state::SelectedFile;
use crate::wizard::{SubtitleFormat, WizardController};

/// One line typed at the wizard prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Select(PathBuf),
    Deselect,
    Upload,
    Transcribe(Vec<(String, String)>),
    Download(Option<String>),
    Back,
    New,
    Toggle,
    Status,
    Help,
    Quit,
}

/// Parse a prompt line. `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "select" | "open" => {
            if rest.is_empty() {
                return Err("usage: select <path>".to_string());
            }
            ShellCommand::Select(PathBuf::from(unquote(rest)))
        }
        "deselect" => ShellCommand::Deselect,
        "upload" => ShellCommand::Upload,
        "transcribe" => {
            let mut fields = Vec::new();
            for token in rest.split_whitespace() {
                let (key, value) = token
                    .split_once('=')
                    .ok_or_else(|| format!("expected key=value, got '{token}'"))?;
                fields.push((key.to_ascii_lowercase(), value.to_string()));
            }
            ShellCommand::Transcribe(fields)
        }
        "download" => ShellCommand::Download((!rest.is_empty()).then(|| rest.to_string())),
        "back" => ShellCommand::Back,
        "new" | "reset" => ShellCommand::New,
        "toggle" => ShellCommand::Toggle,
        "status" => ShellCommand::Status,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command '{other}', type 'help'")),
    };
    Ok(Some(command))
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(s)
}

/// Overlay `key=value` pairs from the prompt onto the configured options.
pub fn apply_fields(
    base: &TranscribeOptions,
    fields: &[(String, String)],
) -> Result<TranscribeOptions, String> {
    let mut options = base.clone();
    for (key, value) in fields {
        match key.as_str() {
            "model" => options.model = value.clone(),
            "language" | "lang" => {
                options.language = match value.as_str() {
                    "" | "auto" => None,
                    code => Some(code.to_string()),
                }
            }
            "task" => options.task = value.parse::<TranscribeTask>()?,
            other => return Err(format!("unknown option '{other}' (model, language, task)")),
        }
    }
    Ok(options)
}

const HELP: &str = "\
Commands:
  select <path>        choose the audio or video file to upload
  deselect             clear the selected file
  upload               upload the selected file
  transcribe [model=..] [language=..|auto] [task=transcribe|translate]
  download [srt|vtt|txt]
  back                 return from transcribe to upload
  new                  start over with a new file
  toggle               expand or collapse the transcript preview
  status               show the current step and selection
  quit";

/// Run the wizard prompt until `quit` or end of input. Failed operations
/// have already been reported through the presenter, so the loop only
/// logs them and carries on.
pub fn run_shell<T, P, R, W>(
    controller: &WizardController<T, P>,
    defaults: &TranscribeOptions,
    default_format: SubtitleFormat,
    input: R,
    mut output: W,
) -> Result<()>
where
    T: WizardTransport,
    P: Presenter + 'static,
    R: BufRead,
    W: Write,
{
    writeln!(output, "subwiz: type 'help' for commands")?;
    let mut lines = input.lines();
    loop {
        let step = controller.snapshot().step;
        write!(output, "[{}. {}]> ", step.number(), step)?;
        output.flush()?;

        let Some(line) = lines.next() else {
            writeln!(output)?;
            break;
        };
        let command = match parse_command(&line?) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                writeln!(output, "{message}")?;
                continue;
            }
        };

        let outcome: Result<()> = match command {
            ShellCommand::Quit => break,
            ShellCommand::Help => {
                writeln!(output, "{HELP}")?;
                Ok(())
            }
            ShellCommand::Status => {
                let state = controller.snapshot();
                writeln!(output, "step:     {}. {}", state.step.number(), state.step)?;
                match &state.file {
                    Some(f) => writeln!(output, "file:     {} ({:.1} MB)", f.path.display(), f.size_mb())?,
                    None => writeln!(output, "file:     none")?,
                }
                writeln!(output, "progress: {}%", state.progress.percent())?;
                if let Some(format) = state.format {
                    writeln!(output, "format:   {format}")?;
                }
                Ok(())
            }
            ShellCommand::Select(path) => match SelectedFile::from_path(&path) {
                Ok(file) => controller.select_file(Some(file)).map_err(Into::into),
                Err(e) => {
                    writeln!(output, "{e:#}")?;
                    Ok(())
                }
            },
            ShellCommand::Deselect => controller.select_file(None).map_err(Into::into),
            ShellCommand::Upload => controller.upload_selected().map(|_| ()).map_err(Into::into),
            ShellCommand::Transcribe(fields) => match apply_fields(defaults, &fields) {
                Ok(options) => controller
                    .transcribe_selected(&options)
                    .map(|_| ())
                    .map_err(Into::into),
                Err(message) => {
                    writeln!(output, "{message}")?;
                    Ok(())
                }
            },
            ShellCommand::Download(format) => {
                let format = format.unwrap_or_else(|| default_format.as_str().to_string());
                controller.download_selected(&format).map(|_| ()).map_err(Into::into)
            }
            ShellCommand::Back => controller.go_back_to_upload().map_err(Into::into),
            ShellCommand::New => controller.start_over().map_err(Into::into),
            ShellCommand::Toggle => {
                controller.toggle_preview_expansion();
                Ok(())
            }
        };

        if let Err(e) = outcome {
            tracing::debug!("Command failed: {:#}", e);
        }
    }
    Ok(())
}
