use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::wizard::{SubtitleFormat, TranscribeTask};

#[derive(Parser, Debug)]
#[command(
    name = "subwiz",
    version,
    about = "Upload a recording, transcribe it on a subtitle server, download the subtitles"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Server base URL (overrides config and SUBWIZ_SERVER_URL)
    #[arg(long, global = true)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive wizard (default if no subcommand)
    Shell,

    /// Upload, transcribe and download one file in a single pass
    Run {
        /// Audio or video file to transcribe
        file: PathBuf,

        /// Whisper model (tiny, base, small, medium, large)
        #[arg(long)]
        model: Option<String>,

        /// Language hint such as "en"; "auto" lets the server detect it
        #[arg(long)]
        language: Option<String>,

        /// Keep the spoken language or translate to English
        #[arg(long, value_enum)]
        task: Option<TranscribeTask>,

        /// Subtitle format to download; repeat for several
        #[arg(short, long = "format", value_enum)]
        formats: Vec<SubtitleFormat>,

        /// Directory to save subtitles in
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Leave the server session in place after downloading
        #[arg(long)]
        keep_session: bool,
    },

    /// List formats, tasks, models and languages
    Options,

    /// Write a commented default config file
    InitConfig {
        /// Where to write it (defaults to the platform config directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}
