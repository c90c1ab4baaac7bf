//! Fusion of audio events and text emotions into one distress signal.
//!
//! The engine is event driven: each audio event or new emotion sample triggers
//! one recomputation. The audio side contributes the confidence of the latest
//! distress-like event still inside the audio window, the text side the mean
//! confidence of the dominant emotion inside the emotion window when that
//! emotion is a distress emotion. The two are combined as independent
//! evidence: `1 - (1 - audio) * (1 - text)`.

use crate::audio::{AudioEvent, DEFAULT_WINDOW_MS};
use crate::emotion::{Emotion, EmotionHistory, DEFAULT_HISTORY_MS};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistressAssessment {
    pub dominant_emotion: Option<Emotion>,
    pub audio_event: Option<AudioEvent>,
    pub confidence: f32,
    pub timestamp_ms: u64,
}

impl DistressAssessment {
    pub fn is_distressed(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

#[derive(Debug, Clone)]
pub struct FusionEngine {
    audio_window_ms: u64,
    emotion_window_ms: u64,
    last_audio_event: Option<AudioEvent>,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS, DEFAULT_HISTORY_MS)
    }
}

impl FusionEngine {
    pub fn new(audio_window_ms: u64, emotion_window_ms: u64) -> Self {
        Self {
            audio_window_ms,
            emotion_window_ms,
            last_audio_event: None,
        }
    }

    pub fn last_audio_event(&self) -> Option<&AudioEvent> {
        self.last_audio_event.as_ref()
    }

    pub fn reset(&mut self) {
        self.last_audio_event = None;
    }

    /// Record a new audio event and recompute
    pub fn observe_audio_event(
        &mut self,
        event: AudioEvent,
        history: &EmotionHistory,
        now_ms: u64,
    ) -> Option<DistressAssessment> {
        self.last_audio_event = Some(event);
        self.assess(history, now_ms)
    }

    /// Recompute after the emotion history changed
    pub fn observe_emotion(
        &mut self,
        history: &EmotionHistory,
        now_ms: u64,
    ) -> Option<DistressAssessment> {
        self.assess(history, now_ms)
    }

    fn assess(&self, history: &EmotionHistory, now_ms: u64) -> Option<DistressAssessment> {
        let audio_event = self
            .last_audio_event
            .as_ref()
            .filter(|e| now_ms.saturating_sub(e.timestamp_ms) < self.audio_window_ms)
            .cloned();
        let dominant = self.dominant_emotion(history, now_ms);

        if audio_event.is_none() && dominant.is_none() {
            return None;
        }

        let audio_score = audio_event
            .as_ref()
            .filter(|e| e.kind.is_distress())
            .map_or(0.0, |e| e.confidence);
        let emotion_score = dominant
            .filter(|(emotion, _)| emotion.is_distress())
            .map_or(0.0, |(_, mean)| mean);

        let combined = 1.0 - (1.0 - audio_score) * (1.0 - emotion_score);
        let confidence = if combined.is_finite() {
            combined.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Some(DistressAssessment {
            dominant_emotion: dominant.map(|(emotion, _)| emotion),
            audio_event,
            confidence,
            timestamp_ms: now_ms,
        })
    }

    /// Emotion with the highest summed confidence in the window, with its mean
    /// confidence. Ties go to the emotion seen first.
    fn dominant_emotion(&self, history: &EmotionHistory, now_ms: u64) -> Option<(Emotion, f32)> {
        let mut totals: Vec<(Emotion, f32, usize)> = Vec::new();
        for sample in history.within(now_ms, self.emotion_window_ms) {
            match totals.iter_mut().find(|(e, _, _)| *e == sample.emotion) {
                Some(entry) => {
                    entry.1 += sample.confidence;
                    entry.2 += 1;
                }
                None => totals.push((sample.emotion, sample.confidence, 1)),
            }
        }

        let mut best: Option<(Emotion, f32, usize)> = None;
        for entry in totals {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map(|(emotion, sum, count)| (emotion, sum / count as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioEventKind;
    use crate::emotion::EmotionSample;

    fn history(samples: &[(Emotion, f32, u64)]) -> EmotionHistory {
        let mut history = EmotionHistory::default();
        for (emotion, confidence, ts) in samples {
            history.push(EmotionSample::new(*emotion, "kata", *confidence, "teks", *ts));
        }
        history
    }

    #[test]
    fn test_nothing_to_fuse() {
        let mut fusion = FusionEngine::default();
        assert!(fusion.observe_emotion(&EmotionHistory::default(), 1000).is_none());
    }

    #[test]
    fn test_text_only() {
        let mut fusion = FusionEngine::default();
        let h = history(&[(Emotion::Takut, 0.85, 1000), (Emotion::Takut, 0.75, 2000)]);
        let a = fusion.observe_emotion(&h, 2000).unwrap();
        assert_eq!(a.dominant_emotion, Some(Emotion::Takut));
        assert!(a.audio_event.is_none());
        assert!((a.confidence - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_non_distress_emotion_scores_zero() {
        let mut fusion = FusionEngine::default();
        let h = history(&[(Emotion::Lega, 0.9, 1000)]);
        let a = fusion.observe_emotion(&h, 1000).unwrap();
        assert_eq!(a.dominant_emotion, Some(Emotion::Lega));
        assert_eq!(a.confidence, 0.0);
    }

    #[test]
    fn test_dominant_by_summed_confidence() {
        let mut fusion = FusionEngine::default();
        let h = history(&[
            (Emotion::Marah, 0.9, 1000),
            (Emotion::Sedih, 0.7, 1500),
            (Emotion::Sedih, 0.7, 2000),
        ]);
        let a = fusion.observe_emotion(&h, 2000).unwrap();
        assert_eq!(a.dominant_emotion, Some(Emotion::Sedih));
        assert!((a.confidence - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_audio_and_text_combined() {
        let mut fusion = FusionEngine::default();
        let h = history(&[(Emotion::Sedih, 0.5, 1000)]);
        let event = AudioEvent::new(AudioEventKind::Crying, 0.6, 1200);
        let a = fusion.observe_audio_event(event, &h, 1200).unwrap();
        // 1 - 0.4 * 0.5
        assert!((a.confidence - 0.8).abs() < 1e-5);
        assert_eq!(a.audio_event.unwrap().kind, AudioEventKind::Crying);
    }

    #[test]
    fn test_laughing_does_not_raise_distress() {
        let mut fusion = FusionEngine::default();
        let event = AudioEvent::new(AudioEventKind::Laughing, 0.9, 100);
        let a = fusion
            .observe_audio_event(event, &EmotionHistory::default(), 100)
            .unwrap();
        assert_eq!(a.confidence, 0.0);
        assert!(a.dominant_emotion.is_none());
    }

    #[test]
    fn test_stale_audio_event_ignored() {
        let mut fusion = FusionEngine::default();
        let event = AudioEvent::new(AudioEventKind::Scream, 1.0, 0);
        fusion.observe_audio_event(event, &EmotionHistory::default(), 0);

        let h = history(&[(Emotion::Malu, 0.8, 2500)]);
        let a = fusion.observe_emotion(&h, 2500).unwrap();
        assert!(a.audio_event.is_none());
        assert_eq!(a.confidence, 0.0);
        assert!(fusion.last_audio_event().is_some());

        fusion.reset();
        assert!(fusion.last_audio_event().is_none());
    }

    #[test]
    fn test_old_emotions_outside_window() {
        let mut fusion = FusionEngine::new(2000, 3000);
        let h = history(&[(Emotion::Sedih, 0.9, 0)]);
        assert!(fusion.observe_emotion(&h, 3000).is_none());
    }
}
