//! Heuristic audio event classification.
//!
//! Rules are evaluated once per tick in priority order and the first match
//! wins: scream, crying, laughing, then the text-assisted distress rule.

use crate::audio::frequency::{self, band_energy, count_volume_changes, detect_rhythmic_peaks};
use crate::audio::{AudioEvent, AudioEventKind, AudioFrame, AudioFrameWindow, DEFAULT_WINDOW_MS};
use crate::emotion::EmotionHistory;
use crate::error::{IntakeError, Result};

/// Thresholds for the audio classifier
#[derive(Debug, Clone)]
pub struct AudioClassifierConfig {
    /// Rolling window length in milliseconds
    pub window_ms: u64,
    /// Sample rate the spectrum was computed at
    pub sample_rate: u32,
    /// Volume above which a frame counts as a scream
    pub scream_level: f32,
    /// Volume above which a frame counts as loud speech
    pub loud_speech: f32,
    /// Mean volume of ordinary speech
    pub normal_speech: f32,
    /// Mean volume below which the window is considered silent
    pub silence_level: f32,
    /// Loud frames required in the window for a scream
    pub min_loud_frames: usize,
    /// Volume variance required for crying
    pub crying_variance: f32,
    /// Volume variance required for laughing and distress
    pub agitation_variance: f32,
    /// Required ratio of 250-500Hz energy over 500-2000Hz energy for crying
    pub crying_band_ratio: f32,
    /// Direction changes in the volume sequence must exceed this for crying
    pub min_volume_changes: usize,
    /// How many recent emotion samples the distress rule inspects
    pub distress_lookback: usize,
    /// Fixed confidence of the distress rule
    pub distress_confidence: f32,
}

impl Default for AudioClassifierConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            sample_rate: 16000,
            scream_level: 0.7,
            loud_speech: 0.4,
            normal_speech: 0.1,
            silence_level: 0.01,
            min_loud_frames: 5,
            crying_variance: 0.01,
            agitation_variance: 0.02,
            crying_band_ratio: 1.5,
            min_volume_changes: 3,
            distress_lookback: 3,
            distress_confidence: 0.8,
        }
    }
}

const CRYING_LOW_BAND: (f32, f32) = (250.0, 500.0);
const CRYING_MID_BAND: (f32, f32) = (500.0, 2000.0);
const CRYING_MAX_CONFIDENCE: f32 = 0.9;

/// Summary statistics of the current window, computed once per tick
#[derive(Debug, Clone)]
struct WindowStats {
    volumes: Vec<f32>,
    mean: f32,
    variance: f32,
}

impl WindowStats {
    fn of(window: &AudioFrameWindow) -> Self {
        let volumes = window.volumes();
        let mean = frequency::mean(&volumes);
        let variance = frequency::variance(&volumes);
        Self {
            volumes,
            mean,
            variance,
        }
    }
}

pub struct AudioEventClassifier {
    config: AudioClassifierConfig,
    window: AudioFrameWindow,
}

impl AudioEventClassifier {
    pub fn new(config: AudioClassifierConfig) -> Self {
        let window = AudioFrameWindow::new(config.window_ms);
        Self { config, window }
    }

    pub fn config(&self) -> &AudioClassifierConfig {
        &self.config
    }

    /// Update the sample rate once the capture reports its real format
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.config.sample_rate = sample_rate;
    }

    pub fn window(&self) -> &AudioFrameWindow {
        &self.window
    }

    /// Drop all buffered frames
    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// Insert a frame and classify the resulting window.
    ///
    /// Malformed frames and non-finite intermediate values are returned as
    /// tick-local errors; the window is left untouched for malformed frames.
    pub fn process_frame(
        &mut self,
        frame: AudioFrame,
        history: &EmotionHistory,
    ) -> Result<Option<AudioEvent>> {
        frame.validate()?;
        self.window.push(frame)?;

        let event = self.classify(history)?;
        if let Some(event) = &event {
            log::debug!(
                "Audio event {} (confidence: {:.2}) at {}ms",
                event.kind,
                event.confidence,
                event.timestamp_ms
            );
        }
        Ok(event)
    }

    fn classify(&self, history: &EmotionHistory) -> Result<Option<AudioEvent>> {
        let current = match self.window.latest() {
            Some(frame) => frame,
            None => return Ok(None),
        };
        let stats = WindowStats::of(&self.window);
        if !stats.mean.is_finite() || !stats.variance.is_finite() {
            return Err(IntakeError::ClassificationFault(format!(
                "window statistics not finite (mean {}, variance {})",
                stats.mean, stats.variance
            )));
        }

        let matched = if let Some(hit) = self.detect_scream(current, &stats) {
            Some(hit)
        } else if let Some(hit) = self.detect_crying(current, &stats)? {
            Some(hit)
        } else {
            self.detect_laughing(&stats)
                .or_else(|| self.detect_distress(current, &stats, history))
        };

        match matched {
            Some((kind, confidence)) if confidence.is_finite() => {
                Ok(Some(AudioEvent::new(kind, confidence, current.timestamp_ms)))
            }
            Some((kind, confidence)) => Err(IntakeError::ClassificationFault(format!(
                "{} confidence is {}",
                kind, confidence
            ))),
            None => Ok(None),
        }
    }

    fn detect_scream(
        &self,
        current: &AudioFrame,
        stats: &WindowStats,
    ) -> Option<(AudioEventKind, f32)> {
        if current.volume <= self.config.scream_level {
            return None;
        }
        let loud_frames = stats
            .volumes
            .iter()
            .filter(|&&v| v > self.config.loud_speech)
            .count();
        if loud_frames < self.config.min_loud_frames {
            return None;
        }
        let confidence = (current.volume / self.config.scream_level).min(1.0);
        Some((AudioEventKind::Scream, confidence))
    }

    fn detect_crying(
        &self,
        current: &AudioFrame,
        stats: &WindowStats,
    ) -> Result<Option<(AudioEventKind, f32)>> {
        if stats.variance <= self.config.crying_variance || stats.mean <= self.config.silence_level
        {
            return Ok(None);
        }
        if count_volume_changes(&stats.volumes) <= self.config.min_volume_changes {
            return Ok(None);
        }

        let sample_rate = self.config.sample_rate;
        let low = band_energy(
            &current.spectrum,
            sample_rate,
            CRYING_LOW_BAND.0,
            CRYING_LOW_BAND.1,
        );
        let mid = band_energy(
            &current.spectrum,
            sample_rate,
            CRYING_MID_BAND.0,
            CRYING_MID_BAND.1,
        );
        if !low.is_finite() || !mid.is_finite() {
            return Err(IntakeError::ClassificationFault(format!(
                "band energy not finite (low {}, mid {})",
                low, mid
            )));
        }
        // Without mid-band energy the ratio is meaningless
        if mid <= f32::EPSILON || low <= mid * self.config.crying_band_ratio {
            return Ok(None);
        }

        let confidence = ((low / mid) * 0.5).min(CRYING_MAX_CONFIDENCE);
        Ok(Some((AudioEventKind::Crying, confidence)))
    }

    fn detect_laughing(&self, stats: &WindowStats) -> Option<(AudioEventKind, f32)> {
        if stats.variance <= self.config.agitation_variance
            || stats.mean <= self.config.normal_speech
        {
            return None;
        }
        detect_rhythmic_peaks(&stats.volumes)
            .map(|pattern| (AudioEventKind::Laughing, pattern.regularity()))
    }

    /// Only samples still inside the history's retention window at the
    /// current frame count; the history itself is only trimmed on append.
    fn detect_distress(
        &self,
        current: &AudioFrame,
        stats: &WindowStats,
        history: &EmotionHistory,
    ) -> Option<(AudioEventKind, f32)> {
        let now = current.timestamp_ms;
        let recent_distress = history
            .recent(self.config.distress_lookback)
            .filter(|sample| now.saturating_sub(sample.timestamp_ms) < history.retention_ms())
            .any(|sample| sample.emotion.is_distress());
        if recent_distress
            && stats.mean > self.config.normal_speech
            && stats.variance > self.config.agitation_variance
        {
            Some((AudioEventKind::Distress, self.config.distress_confidence))
        } else {
            None
        }
    }
}

impl Default for AudioEventClassifier {
    fn default() -> Self {
        Self::new(AudioClassifierConfig::default())
    }
}
