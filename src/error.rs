use crate::audio::capture::CaptureError;
use crate::session::SessionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IntakeError>;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Recognition error: {0}")]
    Recognition(SessionError),

    #[error("Audio capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Malformed audio frame: {0}")]
    MalformedFrame(String),

    #[error("Classification fault: {0}")]
    ClassificationFault(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session worker stopped")]
    WorkerGone,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl IntakeError {
    /// Faults that only invalidate a single analysis tick.
    pub fn is_tick_local(&self) -> bool {
        matches!(
            self,
            IntakeError::MalformedFrame(_) | IntakeError::ClassificationFault(_)
        )
    }
}
