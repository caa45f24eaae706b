use thiserror::Error;

/// Failures acquiring or driving the capture device.
///
/// Stored by the recorder as readable state until the next start attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Audio capture is not supported on this device: {0}")]
    DeviceUnsupported(String),

    #[error("Microphone permission was denied")]
    PermissionDenied,

    #[error("Audio device error: {0}")]
    DeviceError(String),
}

impl CaptureError {
    /// Get a user-friendly description
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureError::DeviceUnsupported(_) => "Voice input is not supported on this device.",
            CaptureError::PermissionDenied => {
                "Microphone access was denied. Please allow microphone access and try again."
            }
            CaptureError::DeviceError(_) => "Could not start the microphone.",
        }
    }
}

/// Failures anywhere in the enhance -> synthesize sequence.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Transcription failed or audio was empty")]
    EmptyTranscription,

    #[error("Image endpoint did not return an image")]
    NoImageReturned,

    #[error("No input provided for editing")]
    NoInputForEditing,

    #[error("Prompt text is empty")]
    EmptyPrompt,

    #[error("Audio clip too short to submit ({bytes} bytes, need more than {min})")]
    AudioTooShort { bytes: usize, min: usize },

    #[error("There is no displayed image to edit")]
    NothingToEdit,

    #[error("A generation is already in progress")]
    Busy,

    #[error("Generation was cancelled")]
    Cancelled,

    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

impl PipelineError {
    /// Precondition failures are rejected before any remote call is issued.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            PipelineError::NoInputForEditing
                | PipelineError::EmptyPrompt
                | PipelineError::AudioTooShort { .. }
                | PipelineError::NothingToEdit
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
