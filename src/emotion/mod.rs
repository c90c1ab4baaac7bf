//! Text-derived emotion tracking
//!
//! The [`TextEmotionClassifier`] scores final transcript text against a fixed
//! Indonesian lexicon and keeps what it found in a rolling [`EmotionHistory`].

pub mod classifier;
pub mod lexicon;

pub use classifier::{EmotionAnalysis, EmotionMatch, TextEmotionClassifier};

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Retention of the emotion history: three times the audio window
pub const DEFAULT_HISTORY_MS: u64 = 3 * crate::audio::DEFAULT_WINDOW_MS;

/// Upper bound for any keyword-derived confidence
pub const MAX_EMOTION_CONFIDENCE: f32 = 0.95;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum Emotion {
    /// Sadness
    Sedih,
    /// Anger
    Marah,
    /// Fear
    Takut,
    /// Hopelessness
    PutusAsa,
    /// Shame
    Malu,
    /// Confusion
    Bingung,
    /// Relief
    Lega,
    /// Hope
    Berharap,
}

impl Emotion {
    /// Emotions that count as distress for the audio rule and for fusion
    pub fn is_distress(&self) -> bool {
        matches!(
            self,
            Emotion::Sedih | Emotion::Takut | Emotion::PutusAsa | Emotion::Marah
        )
    }

    /// English category name
    pub fn category(&self) -> &'static str {
        match self {
            Emotion::Sedih => "sadness",
            Emotion::Marah => "anger",
            Emotion::Takut => "fear",
            Emotion::PutusAsa => "hopelessness",
            Emotion::Malu => "shame",
            Emotion::Bingung => "confusion",
            Emotion::Lega => "relief",
            Emotion::Berharap => "hope",
        }
    }
}

/// One detected emotion, as stored in the history
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionSample {
    pub emotion: Emotion,
    pub keyword: String,
    pub confidence: f32,
    pub source_text: String,
    pub timestamp_ms: u64,
}

impl EmotionSample {
    pub fn new(
        emotion: Emotion,
        keyword: impl Into<String>,
        confidence: f32,
        source_text: impl Into<String>,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            emotion,
            keyword: keyword.into(),
            confidence: confidence.clamp(0.0, MAX_EMOTION_CONFIDENCE),
            source_text: source_text.into(),
            timestamp_ms,
        }
    }
}

/// Rolling, time-ordered record of detected emotions.
/// Entries older than the retention window are evicted on every append.
#[derive(Debug, Clone)]
pub struct EmotionHistory {
    samples: VecDeque<EmotionSample>,
    retention_ms: u64,
}

impl EmotionHistory {
    pub fn new(retention_ms: u64) -> Self {
        Self {
            samples: VecDeque::new(),
            retention_ms,
        }
    }

    pub fn retention_ms(&self) -> u64 {
        self.retention_ms
    }

    /// Append a sample and evict everything outside the retention window.
    /// A sample older than the newest entry is clamped forward to keep order.
    pub fn push(&mut self, mut sample: EmotionSample) {
        if let Some(last) = self.samples.back() {
            sample.timestamp_ms = sample.timestamp_ms.max(last.timestamp_ms);
        }
        let now = sample.timestamp_ms;
        self.samples.push_back(sample);
        while let Some(front) = self.samples.front() {
            if now.saturating_sub(front.timestamp_ms) >= self.retention_ms {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// The `n` most recent samples, newest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &EmotionSample> {
        self.samples.iter().rev().take(n)
    }

    /// Samples still inside `window_ms` at `now_ms`, oldest first
    pub fn within(&self, now_ms: u64, window_ms: u64) -> impl Iterator<Item = &EmotionSample> {
        self.samples
            .iter()
            .filter(move |s| now_ms.saturating_sub(s.timestamp_ms) < window_ms)
    }

    pub fn latest(&self) -> Option<&EmotionSample> {
        self.samples.back()
    }

    /// Owned copy for readers that must not hold a borrow
    pub fn snapshot(&self) -> Vec<EmotionSample> {
        self.samples.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for EmotionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_MS)
    }
}
