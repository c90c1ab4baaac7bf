//! Continuous speech session
//!
//! [`SpeechSessionManager`] owns the transcription engine, the audio capture and
//! every classifier. It is driven by a single worker: [`SessionHandle`] spawns
//! that worker as a tokio task and talks to it over a command channel.

pub mod callbacks;
pub mod engine;
pub mod handle;
pub mod manager;

pub use callbacks::SessionCallbacks;
pub use engine::{EngineEvent, TranscriptionEngine};
pub use handle::SessionHandle;
pub use manager::{SpeechSessionManager, Wake};

use crate::audio::CaptureError;
use crate::emotion::EmotionSample;
use crate::transcript::Alternative;
use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Number of emotion samples reported by `get_state`
pub const RECENT_EMOTIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Listening,
    Stopping,
}

/// Recognition error kinds, parsed from and serialized as the engine's raw error codes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize,
)]
pub enum RecognitionErrorCode {
    #[strum(serialize = "no-speech")]
    #[serde(rename = "no-speech")]
    NoSpeechDetected,
    #[strum(serialize = "aborted")]
    #[serde(rename = "aborted")]
    Aborted,
    #[strum(serialize = "audio-capture")]
    #[serde(rename = "audio-capture")]
    MicrophoneUnavailable,
    #[strum(serialize = "network")]
    #[serde(rename = "network")]
    NetworkFailure,
    #[strum(serialize = "not-allowed")]
    #[serde(rename = "not-allowed")]
    PermissionDenied,
    #[strum(serialize = "service-not-allowed")]
    #[serde(rename = "service-not-allowed")]
    ServiceUnavailable,
    #[strum(serialize = "bad-grammar")]
    #[serde(rename = "bad-grammar")]
    UnsupportedGrammar,
    #[strum(serialize = "language-not-supported")]
    #[serde(rename = "language-not-supported")]
    UnsupportedLanguage,
    #[strum(serialize = "unknown")]
    #[serde(rename = "unknown")]
    Unknown,
}

impl RecognitionErrorCode {
    pub fn from_raw(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(RecognitionErrorCode::Unknown)
    }

    /// Errors worth one automatic restart
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RecognitionErrorCode::NetworkFailure | RecognitionErrorCode::Aborted
        )
    }

    /// User-facing message (Indonesian)
    pub fn message(&self) -> &'static str {
        match self {
            RecognitionErrorCode::NoSpeechDetected => {
                "Tidak ada suara yang terdeteksi. Silakan coba bicara lagi."
            }
            RecognitionErrorCode::Aborted => "Perekaman dibatalkan.",
            RecognitionErrorCode::MicrophoneUnavailable => {
                "Mikrofon tidak tersedia. Periksa perangkat audio Anda."
            }
            RecognitionErrorCode::NetworkFailure => {
                "Koneksi jaringan bermasalah. Periksa koneksi internet Anda."
            }
            RecognitionErrorCode::PermissionDenied => {
                "Izin mikrofon ditolak. Izinkan akses mikrofon di pengaturan perangkat."
            }
            RecognitionErrorCode::ServiceUnavailable => "Layanan pengenalan suara tidak tersedia.",
            RecognitionErrorCode::UnsupportedGrammar => {
                "Tata bahasa pengenalan suara tidak didukung."
            }
            RecognitionErrorCode::UnsupportedLanguage => "Bahasa yang dipilih tidak didukung.",
            RecognitionErrorCode::Unknown => "Terjadi kesalahan pada pengenalan suara.",
        }
    }
}

/// Error delivered through `on_error`: kind, the engine's raw code and a
/// localized message.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{message} ({raw_code})")]
pub struct SessionError {
    pub kind: RecognitionErrorCode,
    pub raw_code: String,
    pub message: String,
}

impl SessionError {
    pub fn from_raw(raw_code: impl Into<String>) -> Self {
        let raw_code = raw_code.into();
        let kind = RecognitionErrorCode::from_raw(&raw_code);
        Self {
            kind,
            message: kind.message().to_string(),
            raw_code,
        }
    }

    pub fn from_kind(kind: RecognitionErrorCode) -> Self {
        Self {
            kind,
            raw_code: kind.to_string(),
            message: kind.message().to_string(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.kind.is_recoverable()
    }
}

impl From<&CaptureError> for SessionError {
    fn from(error: &CaptureError) -> Self {
        match error {
            CaptureError::PermissionDenied => {
                SessionError::from_kind(RecognitionErrorCode::PermissionDenied)
            }
            _ => SessionError::from_kind(RecognitionErrorCode::MicrophoneUnavailable),
        }
    }
}

/// A normalized final transcript, as delivered through `on_result`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub text: String,
    pub confidence: f32,
    pub alternatives: Vec<Alternative>,
    pub timestamp_ms: u64,
}

/// Point-in-time view returned by `get_state`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub is_recording: bool,
    pub is_supported: bool,
    /// Most recent emotions, newest first
    pub recent_emotions: Vec<EmotionSample>,
    pub state: SessionState,
}
