use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::wizard::error::WizardError;

/// Subtitle formats the server can render a transcript into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// SubRip
    Srt,
    /// WebVTT
    Vtt,
    /// Plain text, no timestamps
    Txt,
}

impl SubtitleFormat {
    pub const ALL: [SubtitleFormat; 3] = [Self::Srt, Self::Vtt, Self::Txt];

    /// Value sent in the `format` form field, also used as the file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Txt => "txt",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Srt => "SubRip subtitles",
            Self::Vtt => "WebVTT subtitles",
            Self::Txt => "Plain transcript text",
        }
    }

    /// Fallback name used when the server does not suggest one.
    pub fn default_filename(&self) -> String {
        format!("subtitles.{}", self.as_str())
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SubtitleFormat {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == needle)
            .ok_or_else(|| WizardError::UnknownFormat(s.to_string()))
    }
}

/// What the server should do with the speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TranscribeTask {
    /// Keep the spoken language
    #[default]
    Transcribe,
    /// Translate the speech to English
    Translate,
}

impl TranscribeTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
        }
    }
}

impl fmt::Display for TranscribeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TranscribeTask {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transcribe" => Ok(Self::Transcribe),
            "translate" => Ok(Self::Translate),
            other => Err(format!("unknown task '{other}' (expected transcribe or translate)")),
        }
    }
}

/// Whisper model sizes offered by the server, smallest first.
pub const WHISPER_MODELS: &[(&str, &str)] = &[
    ("tiny", "Tiny (fast, less accurate)"),
    ("base", "Base (balanced speed and accuracy)"),
    ("small", "Small (better accuracy, slower)"),
    ("medium", "Medium (good accuracy, slower)"),
    ("large", "Large (best accuracy, slowest)"),
];

/// Language hints the server understands. Omitting the hint means auto-detect.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("nl", "Dutch"),
    ("ru", "Russian"),
    ("zh", "Chinese"),
    ("ja", "Japanese"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
    ("ko", "Korean"),
    ("tr", "Turkish"),
    ("pl", "Polish"),
    ("vi", "Vietnamese"),
    ("sv", "Swedish"),
    ("uk", "Ukrainian"),
    ("fa", "Persian"),
];

pub fn is_known_model(name: &str) -> bool {
    WHISPER_MODELS.iter().any(|(id, _)| *id == name)
}

pub fn is_known_language(code: &str) -> bool {
    LANGUAGES.iter().any(|(id, _)| *id == code)
}

/// Fields of the transcription form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeOptions {
    pub model: String,
    /// `None` lets the server detect the language.
    pub language: Option<String>,
    pub task: TranscribeTask,
}

impl Default for TranscribeOptions {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            language: None,
            task: TranscribeTask::Transcribe,
        }
    }
}

impl TranscribeOptions {
    /// Form fields in the order the server's form declares them.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("model", self.model.clone())];
        if let Some(language) = self.language.as_deref().filter(|l| !l.is_empty()) {
            fields.push(("language", language.to_string()));
        }
        fields.push(("task", self.task.as_str().to_string()));
        fields
    }

    /// Log values the server is unlikely to accept. The server stays the
    /// authority, so nothing is rejected here.
    pub fn warn_unknown(&self) {
        if !is_known_model(&self.model) {
            tracing::warn!("Model '{}' is not one of the known Whisper models", self.model);
        }
        if let Some(language) = &self.language {
            if !language.is_empty() && !is_known_language(language) {
                tracing::warn!("Language '{}' is not in the known language list", language);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse_is_case_insensitive() {
        assert_eq!("SRT".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Srt);
        assert_eq!(" vtt ".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Vtt);
        assert_eq!("txt".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Txt);
    }

    #[test]
    fn test_format_parse_rejects_unknown() {
        let err = "docx".parse::<SubtitleFormat>().unwrap_err();
        assert!(matches!(err, WizardError::UnknownFormat(ref f) if f == "docx"));
    }

    #[test]
    fn test_default_filename() {
        assert_eq!(SubtitleFormat::Srt.default_filename(), "subtitles.srt");
        assert_eq!(SubtitleFormat::Vtt.default_filename(), "subtitles.vtt");
    }

    #[test]
    fn test_form_fields_omit_auto_language() {
        let options = TranscribeOptions::default();
        let fields = options.form_fields();
        assert_eq!(
            fields,
            vec![
                ("model", "base".to_string()),
                ("task", "transcribe".to_string())
            ]
        );
    }

    #[test]
    fn test_form_fields_with_language() {
        let options = TranscribeOptions {
            model: "small".to_string(),
            language: Some("de".to_string()),
            task: TranscribeTask::Translate,
        };
        let fields = options.form_fields();
        assert!(fields.contains(&("language", "de".to_string())));
        assert!(fields.contains(&("task", "translate".to_string())));
    }

    #[test]
    fn test_task_parse() {
        assert_eq!("Translate".parse::<TranscribeTask>().unwrap(), TranscribeTask::Translate);
        assert!("summarize".parse::<TranscribeTask>().is_err());
    }

    #[test]
    fn test_known_tables() {
        assert!(is_known_model("medium"));
        assert!(!is_known_model("huge"));
        assert!(is_known_language("fa"));
        assert!(!is_known_language("xx"));
    }

    #[test]
    fn test_serde_format_values() {
        let json = serde_json::to_string(&SubtitleFormat::Vtt).unwrap();
        assert_eq!(json, "\"vtt\"");
        let task: TranscribeTask = serde_json::from_str("\"translate\"").unwrap();
        assert_eq!(task, TranscribeTask::Translate);
    }
}
