//! Transcript segments as delivered by the transcription engine

pub mod normalizer;

pub use normalizer::TranscriptNormalizer;

use serde::{Deserialize, Serialize};

/// One recognition hypothesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub text: String,
    #[serde(default)]
    pub confidence: f32,
}

impl Alternative {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: sanitize_confidence(confidence),
        }
    }
}

/// A transcription result, interim or final.
/// Alternatives are ordered best-first; the first one carries the segment text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub text: String,
    pub is_final: bool,
    pub alternatives: Vec<Alternative>,
    pub timestamp_ms: u64,
}

impl TranscriptSegment {
    /// Build a segment from engine alternatives. Returns None when there is no
    /// hypothesis to deliver.
    pub fn from_alternatives(
        alternatives: Vec<Alternative>,
        is_final: bool,
        max_alternatives: usize,
        timestamp_ms: u64,
    ) -> Option<Self> {
        let mut alternatives: Vec<Alternative> = alternatives
            .into_iter()
            .map(|a| Alternative::new(a.text, a.confidence))
            .collect();
        alternatives.truncate(max_alternatives.max(1));
        let text = alternatives.first()?.text.clone();
        Some(Self {
            text,
            is_final,
            alternatives,
            timestamp_ms,
        })
    }

    /// Confidence of the best alternative
    pub fn confidence(&self) -> f32 {
        self.alternatives.first().map_or(0.0, |a| a.confidence)
    }
}

fn sanitize_confidence(confidence: f32) -> f32 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
