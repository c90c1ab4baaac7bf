//! Keyword-driven emotion scoring over final transcript text.

use super::lexicon::LEXICON;
use super::{Emotion, EmotionHistory, EmotionSample, MAX_EMOTION_CONFIDENCE};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const BASE_CONFIDENCE: f32 = 0.7;
const WHOLE_WORD_BONUS: f32 = 0.15;
const EXCLAMATION_BONUS: f32 = 0.05;
const LONG_TEXT_BONUS: f32 = 0.05;
const LONG_TEXT_CHARS: usize = 50;

struct Keyword {
    emotion: Emotion,
    word: &'static str,
    whole_word: Regex,
}

static KEYWORDS: Lazy<Vec<Keyword>> = Lazy::new(|| {
    LEXICON
        .iter()
        .flat_map(|(emotion, words)| {
            words.iter().map(move |word| Keyword {
                emotion: *emotion,
                word: *word,
                whole_word: Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word)))
                    .expect("lexicon keywords are valid patterns"),
            })
        })
        .collect()
});

/// A single keyword hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionMatch {
    pub emotion: Emotion,
    pub keyword: String,
    pub confidence: f32,
    pub whole_word: bool,
}

/// Result of analysing one piece of text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionAnalysis {
    /// Highest-confidence hit
    pub primary: EmotionMatch,
    /// Every distinct emotion that matched, in lexicon order
    pub secondary: Vec<Emotion>,
    /// All keyword hits
    pub matches: Vec<EmotionMatch>,
}

impl EmotionAnalysis {
    pub fn emotion(&self) -> Emotion {
        self.primary.emotion
    }

    pub fn confidence(&self) -> f32 {
        self.primary.confidence
    }
}

/// Scores text against the lexicon and owns the rolling [`EmotionHistory`]
#[derive(Debug, Clone, Default)]
pub struct TextEmotionClassifier {
    history: EmotionHistory,
}

impl TextEmotionClassifier {
    pub fn new(retention_ms: u64) -> Self {
        Self {
            history: EmotionHistory::new(retention_ms),
        }
    }

    pub fn history(&self) -> &EmotionHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Score `text` without touching the history
    pub fn score(text: &str) -> Option<EmotionAnalysis> {
        let lower = text.to_lowercase();
        if lower.trim().is_empty() {
            return None;
        }

        let mut bonus = 0.0;
        if text.contains('!') {
            bonus += EXCLAMATION_BONUS;
        }
        if text.chars().count() > LONG_TEXT_CHARS {
            bonus += LONG_TEXT_BONUS;
        }

        let matches: Vec<EmotionMatch> = KEYWORDS
            .iter()
            .filter(|k| lower.contains(k.word))
            .map(|k| {
                let whole_word = k.whole_word.is_match(&lower);
                let mut confidence = BASE_CONFIDENCE + bonus;
                if whole_word {
                    confidence += WHOLE_WORD_BONUS;
                }
                EmotionMatch {
                    emotion: k.emotion,
                    keyword: k.word.to_string(),
                    confidence: confidence.min(MAX_EMOTION_CONFIDENCE),
                    whole_word,
                }
            })
            .collect();

        // first strictly-better hit wins, so ties resolve in lexicon order
        let primary = matches
            .iter()
            .fold(None::<&EmotionMatch>, |best, m| match best {
                Some(b) if b.confidence >= m.confidence => Some(b),
                _ => Some(m),
            })?
            .clone();

        let mut secondary: Vec<Emotion> = Vec::new();
        for m in &matches {
            if !secondary.contains(&m.emotion) {
                secondary.push(m.emotion);
            }
        }

        Some(EmotionAnalysis {
            primary,
            secondary,
            matches,
        })
    }

    /// Score `text` and record the primary match in the history
    pub fn analyze(&mut self, text: &str, timestamp_ms: u64) -> Option<EmotionAnalysis> {
        let analysis = Self::score(text)?;
        self.history.push(EmotionSample::new(
            analysis.primary.emotion,
            analysis.primary.keyword.clone(),
            analysis.primary.confidence,
            text,
            timestamp_ms,
        ));
        log::debug!(
            "Emotion {} via '{}' (confidence: {:.2}, {} matches)",
            analysis.primary.emotion,
            analysis.primary.keyword,
            analysis.primary.confidence,
            analysis.matches.len()
        );
        Some(analysis)
    }
}
