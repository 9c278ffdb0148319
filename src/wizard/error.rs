use crate::transport::TransportError;
use crate::wizard::state::Step;

/// Why a wizard operation did not complete.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WizardError {
    #[error("Please select a file first.")]
    NoFileSelected,

    #[error("File is too large ({size} bytes). Maximum size is {}MB.", .limit / (1024 * 1024))]
    FileTooLarge { size: u64, limit: u64 },

    /// The operation is not offered on the current step.
    #[error("Cannot {action} from the {step} step.")]
    WrongStep { action: &'static str, step: Step },

    #[error("Unsupported subtitle format: {0}")]
    UnknownFormat(String),

    /// The triggering control is disabled, usually because the same
    /// operation is still in flight.
    #[error("{0} is not available right now.")]
    ActionDisabled(&'static str),

    #[error("Could not save the download: {0}")]
    Save(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
