use crate::config::SessionOptions;
use crate::session::SessionError;
use crate::transcript::Alternative;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Events a transcription engine reports while a recognition session runs
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Hypotheses for the current segment, best first
    Result {
        alternatives: Vec<Alternative>,
        is_final: bool,
    },
    Error(SessionError),
    /// The engine ended the recognition session on its own
    End,
}

/// Continuous speech-recognition capability consumed by the session.
///
/// Every `start` receives a fresh sender; events sent on a sender from an
/// earlier start are never delivered. Dropping the sender counts as `End`.
#[async_trait]
pub trait TranscriptionEngine: Send {
    fn is_supported(&self) -> bool;

    /// Whether the engine records from the same microphone as the audio
    /// capture, so that losing the capture also ends transcription
    fn shares_audio_input(&self) -> bool {
        false
    }

    /// Resolves once the engine has confirmed it is listening
    async fn start(
        &mut self,
        options: &SessionOptions,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), SessionError>;

    async fn stop(&mut self);
}
