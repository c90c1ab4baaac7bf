//! Scripted transcription engine for replaying recorded sessions.
//!
//! A script is a list of recognition runs. Every `start` plays the next run,
//! sending each step at its offset from the start. A run ends when its steps
//! run out; once all runs are used up the engine keeps listening silently.

use crate::config::SessionOptions;
use crate::error::Result;
use crate::session::{EngineEvent, SessionError, TranscriptionEngine};
use crate::transcript::Alternative;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

fn default_confidence() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScriptEvent {
    Interim {
        text: String,
    },
    Final {
        text: String,
        #[serde(default = "default_confidence")]
        confidence: f32,
        /// Lower-ranked hypotheses
        #[serde(default)]
        alternatives: Vec<Alternative>,
    },
    Error {
        code: String,
    },
    End,
}

impl ScriptEvent {
    fn into_engine_event(self) -> EngineEvent {
        match self {
            ScriptEvent::Interim { text } => EngineEvent::Result {
                alternatives: vec![Alternative::new(text, 0.0)],
                is_final: false,
            },
            ScriptEvent::Final {
                text,
                confidence,
                alternatives,
            } => {
                let mut all = vec![Alternative::new(text, confidence)];
                all.extend(alternatives);
                EngineEvent::Result {
                    alternatives: all,
                    is_final: true,
                }
            }
            ScriptEvent::Error { code } => EngineEvent::Error(SessionError::from_raw(code)),
            ScriptEvent::End => EngineEvent::End,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    /// Offset from the start of the run
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: ScriptEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptScript {
    #[serde(default = "default_supported")]
    pub supported: bool,
    #[serde(default)]
    pub shares_audio_input: bool,
    /// Raw error code returned by the first start, if any
    #[serde(default)]
    pub start_error: Option<String>,
    #[serde(default)]
    pub runs: Vec<Vec<ScriptStep>>,
}

fn default_supported() -> bool {
    true
}

impl Default for TranscriptScript {
    fn default() -> Self {
        Self {
            supported: true,
            shares_audio_input: false,
            start_error: None,
            runs: Vec::new(),
        }
    }
}

impl TranscriptScript {
    pub fn single_run(steps: Vec<ScriptStep>) -> Self {
        Self {
            runs: vec![steps],
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let script = Self::from_json(&json)?;
        log::info!(
            "Loaded script with {} runs from {}",
            script.runs.len(),
            path.as_ref().display()
        );
        Ok(script)
    }

    /// Sum of the last step offset of every run
    pub fn duration_ms(&self) -> u64 {
        self.runs
            .iter()
            .filter_map(|run| run.iter().map(|s| s.at_ms).max())
            .sum()
    }
}

/// [`TranscriptionEngine`] playing back a [`TranscriptScript`]
pub struct ScriptedEngine {
    supported: bool,
    shares_audio_input: bool,
    start_error: Option<String>,
    runs: VecDeque<Vec<ScriptStep>>,
    playback: Option<(CancellationToken, JoinHandle<()>)>,
    idle_sender: Option<mpsc::UnboundedSender<EngineEvent>>,
    starts: usize,
}

impl ScriptedEngine {
    pub fn new(script: TranscriptScript) -> Self {
        Self {
            supported: script.supported,
            shares_audio_input: script.shares_audio_input,
            start_error: script.start_error,
            runs: script.runs.into(),
            playback: None,
            idle_sender: None,
            starts: 0,
        }
    }

    /// Number of times the engine was started
    pub fn starts(&self) -> usize {
        self.starts
    }

    pub fn remaining_runs(&self) -> usize {
        self.runs.len()
    }

    async fn cancel_playback(&mut self) {
        self.idle_sender = None;
        if let Some((token, task)) = self.playback.take() {
            token.cancel();
            if let Err(e) = task.await {
                log::warn!("Script playback task failed: {}", e);
            }
        }
    }
}

#[async_trait]
impl TranscriptionEngine for ScriptedEngine {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn shares_audio_input(&self) -> bool {
        self.shares_audio_input
    }

    async fn start(
        &mut self,
        options: &SessionOptions,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> std::result::Result<(), SessionError> {
        self.cancel_playback().await;
        self.starts += 1;

        if let Some(code) = self.start_error.take() {
            log::debug!("Scripted start failure: {}", code);
            return Err(SessionError::from_raw(code));
        }

        let Some(steps) = self.runs.pop_front() else {
            log::debug!("Script exhausted, listening silently");
            self.idle_sender = Some(events);
            return Ok(());
        };

        log::debug!(
            "Playing scripted run {} ({} steps, language: {})",
            self.starts,
            steps.len(),
            options.language
        );
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let task = tokio::spawn(async move {
            let started = Instant::now();
            for step in steps {
                tokio::select! {
                    _ = cancelled.cancelled() => return,
                    _ = sleep_until(started + Duration::from_millis(step.at_ms)) => {}
                }
                if events.send(step.event.into_engine_event()).is_err() {
                    return;
                }
            }
        });
        self.playback = Some((token, task));
        Ok(())
    }

    async fn stop(&mut self) {
        self.cancel_playback().await;
    }
}
