//! PCM to (volume, spectrum) conversion shared by the concrete captures.
//!
//! Behaves like a browser analyser node: Hann window, FFT of `fft_size`
//! samples, `fft_size / 2` magnitude bins reported in dB and floored at
//! `min_db`.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

pub const DEFAULT_FFT_SIZE: usize = 1024;
pub const DEFAULT_MIN_DB: f32 = -100.0;

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    min_db: f32,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window = (0..fft_size)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / (fft_size - 1) as f32).cos())
            })
            .collect();

        Self {
            fft,
            fft_size,
            window,
            min_db: DEFAULT_MIN_DB,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn with_min_db(mut self, min_db: f32) -> Self {
        self.min_db = min_db;
        self
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of magnitude bins produced per analysis
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// RMS of the samples, clamped into 0.0-1.0
    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
        (sum_sq / samples.len() as f32).sqrt().clamp(0.0, 1.0)
    }

    /// Magnitude spectrum in dB of the most recent `fft_size` samples.
    /// Shorter input is zero-padded at the front.
    pub fn spectrum(&mut self, samples: &[f32]) -> Vec<f32> {
        let take = samples.len().min(self.fft_size);
        let offset = self.fft_size - take;
        let tail = &samples[samples.len() - take..];

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = if i < offset { 0.0 } else { tail[i - offset] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        self.scratch[..self.bin_count()]
            .iter()
            .map(|c| {
                let magnitude = c.norm() * scale;
                if magnitude > 0.0 {
                    (20.0 * magnitude.log10()).max(self.min_db)
                } else {
                    self.min_db
                }
            })
            .collect()
    }

    /// Volume and spectrum for one analysis tick
    pub fn analyze(&mut self, samples: &[f32]) -> (f32, Vec<f32>) {
        let tail = &samples[samples.len().saturating_sub(self.fft_size)..];
        (Self::rms(tail), self.spectrum(samples))
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE)
    }
}
