pub mod controller;
pub mod disposition;
pub mod error;
pub mod options;
pub mod state;
#[cfg(test)]
pub(crate) mod testing;

pub use controller::{WizardController, WizardSettings};
pub use error::WizardError;
pub use options::{SubtitleFormat, TranscribeOptions, TranscribeTask};
pub use state::{Controls, SelectedFile, Step, WizardState};
