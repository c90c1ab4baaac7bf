//! Audio side of the intake pipeline
//!
//! Frames pulled from an [`capture::AudioCapture`] at the analysis interval are
//! kept in a rolling [`AudioFrameWindow`] and classified into [`AudioEvent`]s by
//! the [`classifier::AudioEventClassifier`].

pub mod capture;
pub mod classifier;
pub mod frequency;
pub mod spectrum;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use capture::{
    AnalyzerReading, AudioCapture, CaptureError, CaptureFormat, CaptureRequest, SampleCapture,
};
pub use classifier::{AudioClassifierConfig, AudioEventClassifier};
#[cfg(feature = "microphone")]
pub use microphone::CpalCapture;
pub use spectrum::SpectrumAnalyzer;

use crate::error::{IntakeError, Result};
use serde::Serialize;
use std::collections::VecDeque;
use strum::{Display, IntoStaticStr};

/// Default length of the rolling audio window
pub const DEFAULT_WINDOW_MS: u64 = 2000;

/// One analysis tick worth of audio: RMS volume plus the dB magnitude spectrum
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Monotonic capture time in milliseconds
    pub timestamp_ms: u64,
    /// Normalized RMS volume (0.0-1.0)
    pub volume: f32,
    /// Magnitude spectrum in dB, one entry per frequency bin
    pub spectrum: Vec<f32>,
}

impl AudioFrame {
    pub fn new(timestamp_ms: u64, volume: f32, spectrum: Vec<f32>) -> Self {
        Self {
            timestamp_ms,
            volume,
            spectrum,
        }
    }

    /// Rejects frames the classifier cannot reason about.
    ///
    /// `-inf` bins are accepted since analysers report silence that way.
    pub fn validate(&self) -> Result<()> {
        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err(IntakeError::MalformedFrame(format!(
                "volume {} outside 0.0-1.0",
                self.volume
            )));
        }
        if self.spectrum.is_empty() {
            return Err(IntakeError::MalformedFrame("empty spectrum".to_string()));
        }
        if let Some(bin) = self
            .spectrum
            .iter()
            .position(|db| db.is_nan() || *db == f32::INFINITY)
        {
            return Err(IntakeError::MalformedFrame(format!(
                "spectrum bin {} is {}",
                bin, self.spectrum[bin]
            )));
        }
        Ok(())
    }
}

/// Time-bounded frame buffer. Every insert evicts frames that fell out of the window.
#[derive(Debug, Clone)]
pub struct AudioFrameWindow {
    frames: VecDeque<AudioFrame>,
    window_ms: u64,
}

impl AudioFrameWindow {
    pub fn new(window_ms: u64) -> Self {
        Self {
            frames: VecDeque::new(),
            window_ms,
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Insert a frame and trim everything with `now - timestamp >= window`.
    ///
    /// `now` is the inserted frame's timestamp. Frames older than the newest
    /// retained frame are rejected so the buffer stays ordered.
    pub fn push(&mut self, frame: AudioFrame) -> Result<()> {
        if let Some(last) = self.frames.back() {
            if frame.timestamp_ms < last.timestamp_ms {
                return Err(IntakeError::MalformedFrame(format!(
                    "frame at {}ms arrived after frame at {}ms",
                    frame.timestamp_ms, last.timestamp_ms
                )));
            }
        }

        let now = frame.timestamp_ms;
        self.frames.push_back(frame);
        while let Some(front) = self.frames.front() {
            if now.saturating_sub(front.timestamp_ms) >= self.window_ms {
                self.frames.pop_front();
            } else {
                break;
            }
        }
        Ok(())
    }

    pub fn latest(&self) -> Option<&AudioFrame> {
        self.frames.back()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AudioFrame> {
        self.frames.iter()
    }

    /// Volume sequence, oldest first
    pub fn volumes(&self) -> Vec<f32> {
        self.frames.iter().map(|f| f.volume).collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Default for AudioFrameWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS)
    }
}

/// Kinds of audio patterns the classifier recognises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AudioEventKind {
    Scream,
    Crying,
    Laughing,
    Distress,
}

impl AudioEventKind {
    /// User-facing description (Indonesian)
    pub fn message(&self) -> &'static str {
        match self {
            AudioEventKind::Scream => "Terdeteksi suara teriakan",
            AudioEventKind::Crying => "Terdeteksi suara tangisan",
            AudioEventKind::Laughing => "Terdeteksi suara tawa",
            AudioEventKind::Distress => "Terdeteksi tanda tekanan emosional",
        }
    }

    /// Whether the pattern indicates distress rather than a neutral or positive state
    pub fn is_distress(&self) -> bool {
        !matches!(self, AudioEventKind::Laughing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioEvent {
    pub kind: AudioEventKind,
    pub confidence: f32,
    pub message: String,
    pub timestamp_ms: u64,
}

impl AudioEvent {
    pub fn new(kind: AudioEventKind, confidence: f32, timestamp_ms: u64) -> Self {
        Self {
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            message: kind.message().to_string(),
            timestamp_ms,
        }
    }
}
