use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Config;
use crate::presenter::{ConsoleView, Presenter};
use crate::transport::{HttpTransport, WizardTransport};
use crate::wizard::options::{SubtitleFormat, TranscribeOptions, LANGUAGES, WHISPER_MODELS};
use crate::wizard::state::SelectedFile;
use crate::wizard::{TranscribeTask, WizardController, WizardSettings};

/// What `run` should do, after merging flags over the config.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub file: PathBuf,
    pub options: TranscribeOptions,
    pub formats: Vec<SubtitleFormat>,
    /// Clear the server session once every format is saved.
    pub clear_session: bool,
}

/// Build the wizard for the configured server with terminal output.
pub fn console_controller(config: &Config) -> Result<WizardController<HttpTransport, ConsoleView>> {
    let transport = HttpTransport::new(&config.server)?;
    Ok(WizardController::new(
        transport,
        ConsoleView::new(config.display.preview_lines),
        WizardSettings::from_config(config),
    ))
}

/// Walk the whole wizard once: select, upload, transcribe, download every
/// requested format. Stops at the first failed step.
pub fn run_pipeline<T, P>(controller: &WizardController<T, P>, plan: &RunPlan) -> Result<Vec<PathBuf>>
where
    T: WizardTransport,
    P: Presenter + 'static,
{
    let file = SelectedFile::from_path(&plan.file)?;
    controller.select_file(Some(file))?;
    controller.upload_selected().context("Upload failed")?;
    controller
        .transcribe_selected(&plan.options)
        .context("Transcription failed")?;

    let mut saved = Vec::with_capacity(plan.formats.len());
    for format in &plan.formats {
        let path = controller
            .download_selected(format.as_str())
            .with_context(|| format!("Download of {} failed", format))?;
        saved.push(path);
    }

    if plan.clear_session {
        controller.start_over()?;
    }
    Ok(saved)
}

/// Print the formats, tasks, models and languages the server accepts.
pub fn show_options() -> Result<()> {
    println!("Subtitle formats:");
    for format in SubtitleFormat::ALL {
        println!("  {:<6} {}", format.as_str(), format.description());
    }

    println!("Tasks:");
    println!("  {:<10} keep the spoken language", TranscribeTask::Transcribe);
    println!("  {:<10} translate the speech to English", TranscribeTask::Translate);

    println!("Models:");
    for (id, label) in WHISPER_MODELS {
        println!("  {:<6} {}", id, label);
    }

    println!("Languages (omit for auto-detect):");
    for (code, name) in LANGUAGES {
        println!("  {:<3} {}", code, name);
    }
    Ok(())
}

/// Write the commented default config, refusing to replace an existing file
/// unless `force` is set.
pub fn init_config(path: Option<&Path>, force: bool) -> Result<PathBuf> {
    let target = match path {
        Some(p) => p.to_path_buf(),
        None => Config::platform_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine the config directory"))?,
    };

    if target.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            target.display()
        );
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    std::fs::write(&target, Config::generate_default_commented())
        .with_context(|| format!("Cannot write {}", target.display()))?;

    println!("Wrote config: {}", target.display());
    Ok(target)
}
