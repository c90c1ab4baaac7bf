//! Stateless numeric helpers used by the audio classifier.
//!
//! Everything here is O(n) over its input and allocation-light so a full
//! classifier tick stays well inside the analysis interval.

/// Convert a dB magnitude to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Width of one spectrum bin in Hz: `sample_rate / (2 * bin_count)`
pub fn bin_width_hz(sample_rate: u32, bin_count: usize) -> f32 {
    if bin_count == 0 {
        return 0.0;
    }
    sample_rate as f32 / (2.0 * bin_count as f32)
}

/// Integrated linear magnitude over `[low_hz, high_hz]`.
///
/// Bins are converted from dB before summing; `-inf` bins contribute nothing.
pub fn band_energy(spectrum: &[f32], sample_rate: u32, low_hz: f32, high_hz: f32) -> f32 {
    let width = bin_width_hz(sample_rate, spectrum.len());
    if width <= 0.0 || high_hz < low_hz {
        return 0.0;
    }

    let start = (low_hz / width).floor() as usize;
    let end = ((high_hz / width).floor() as usize).min(spectrum.len().saturating_sub(1));
    if start > end {
        return 0.0;
    }

    spectrum[start..=end]
        .iter()
        .map(|&db| db_to_linear(db))
        .filter(|v| v.is_finite())
        .sum()
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Population variance
pub fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f32>() / values.len() as f32
}

/// Number of times the volume sequence switches between rising and falling.
/// Flat steps keep the previous direction.
pub fn count_volume_changes(volumes: &[f32]) -> usize {
    let mut changes = 0;
    let mut rising: Option<bool> = None;

    for pair in volumes.windows(2) {
        let delta = pair[1] - pair[0];
        if delta == 0.0 {
            continue;
        }
        let now_rising = delta > 0.0;
        if let Some(prev) = rising {
            if prev != now_rising {
                changes += 1;
            }
        }
        rising = Some(now_rising);
    }

    changes
}

/// Indices of strict local maxima
pub fn find_peaks(volumes: &[f32]) -> Vec<usize> {
    volumes
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > w[0] && w[1] > w[2])
        .map(|(i, _)| i + 1)
        .collect()
}

/// An evenly spaced run of volume peaks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RhythmicPattern {
    pub peak_count: usize,
    /// Mean spacing between peaks, in frames
    pub mean_interval: f32,
    pub interval_variance: f32,
}

impl RhythmicPattern {
    /// `1 - variance / mean`, clamped to [0, 1]
    pub fn regularity(&self) -> f32 {
        if self.mean_interval <= 0.0 {
            return 0.0;
        }
        (1.0 - self.interval_variance / self.mean_interval).clamp(0.0, 1.0)
    }
}

/// Looks for at least three peaks whose spacing variance stays under half the
/// mean spacing.
pub fn detect_rhythmic_peaks(volumes: &[f32]) -> Option<RhythmicPattern> {
    let peaks = find_peaks(volumes);
    if peaks.len() < 3 {
        return None;
    }

    let intervals: Vec<f32> = peaks.windows(2).map(|p| (p[1] - p[0]) as f32).collect();
    let mean_interval = mean(&intervals);
    let interval_variance = variance(&intervals);

    if interval_variance < mean_interval * 0.5 {
        Some(RhythmicPattern {
            peak_count: peaks.len(),
            mean_interval,
            interval_variance,
        })
    } else {
        None
    }
}
