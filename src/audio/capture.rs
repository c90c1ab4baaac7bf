use crate::audio::spectrum::{SpectrumAnalyzer, DEFAULT_FFT_SIZE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("Microphone permission denied")]
    PermissionDenied,
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Audio input lost: {0}")]
    Lost(String),
    #[error("Audio capture not acquired")]
    NotAcquired,
    #[error("Audio stream error: {0}")]
    Stream(String),
}

/// What the session asks of the capture when it acquires it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureRequest {
    /// Preferred sample rate in Hz; the capture may choose another one
    pub sample_rate: u32,
    /// Number of input channels to capture (analysis always uses the first)
    pub channels: u16,
    /// FFT size of the analyser; the spectrum has `fft_size / 2` bins
    pub fft_size: usize,
    /// Device name to capture from (None = default device)
    pub device_name: Option<String>,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            fft_size: DEFAULT_FFT_SIZE,
            device_name: None,
        }
    }
}

/// Format the capture actually delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub bin_count: usize,
}

/// One pull from the live analyser
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerReading {
    pub volume: f32,
    pub spectrum: Vec<f32>,
}

/// Audio capture capability consumed by the session.
///
/// `acquire` opens the input and its analyser, `read` pulls the current
/// (volume, spectrum) pair and must not block, `release` frees the handle.
#[async_trait]
pub trait AudioCapture: Send {
    async fn acquire(&mut self, request: &CaptureRequest) -> Result<CaptureFormat, CaptureError>;

    fn read(&mut self) -> Result<AnalyzerReading, CaptureError>;

    fn release(&mut self);

    fn is_acquired(&self) -> bool;
}

/// Capture over a pre-recorded mono sample buffer.
///
/// Each `read` advances the cursor by one analysis hop and analyses the samples
/// that ended there; reaching the end of the buffer reports the input as lost.
pub struct SampleCapture {
    samples: Vec<f32>,
    sample_rate: u32,
    hop: usize,
    cursor: usize,
    analyzer: Option<SpectrumAnalyzer>,
}

impl SampleCapture {
    pub fn new(samples: Vec<f32>, sample_rate: u32, analysis_interval_ms: u64) -> Self {
        let hop = ((sample_rate as u64 * analysis_interval_ms) / 1000).max(1) as usize;
        Self {
            samples,
            sample_rate,
            hop,
            cursor: 0,
            analyzer: None,
        }
    }

    /// Load the first channel of a WAV file
    pub fn from_wav(path: impl AsRef<Path>, analysis_interval_ms: u64) -> crate::Result<Self> {
        let mut reader = hound::WavReader::open(path.as_ref())?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max))
                    .collect::<Result<Vec<f32>, hound::Error>>()?
            }
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<f32>, hound::Error>>()?,
        };

        let mono: Vec<f32> = interleaved.iter().step_by(channels).copied().collect();
        log::info!(
            "Loaded {} samples ({:.1}s) from {} @ {}Hz",
            mono.len(),
            mono.len() as f32 / spec.sample_rate as f32,
            path.as_ref().display(),
            spec.sample_rate
        );

        Ok(Self::new(mono, spec.sample_rate, analysis_interval_ms))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Remaining analysis hops before the buffer runs out
    pub fn remaining_reads(&self) -> usize {
        self.samples.len().saturating_sub(self.cursor) / self.hop
    }
}

#[async_trait]
impl AudioCapture for SampleCapture {
    async fn acquire(&mut self, request: &CaptureRequest) -> Result<CaptureFormat, CaptureError> {
        if self.samples.is_empty() {
            return Err(CaptureError::DeviceUnavailable(
                "sample buffer is empty".to_string(),
            ));
        }
        let analyzer = SpectrumAnalyzer::new(request.fft_size);
        let format = CaptureFormat {
            sample_rate: self.sample_rate,
            bin_count: analyzer.bin_count(),
        };
        self.analyzer = Some(analyzer);
        Ok(format)
    }

    fn read(&mut self) -> Result<AnalyzerReading, CaptureError> {
        let analyzer = self.analyzer.as_mut().ok_or(CaptureError::NotAcquired)?;
        if self.cursor + self.hop > self.samples.len() {
            return Err(CaptureError::Lost("end of recording".to_string()));
        }

        self.cursor += self.hop;
        let start = self.cursor.saturating_sub(analyzer.fft_size());
        let (volume, spectrum) = analyzer.analyze(&self.samples[start..self.cursor]);
        Ok(AnalyzerReading { volume, spectrum })
    }

    fn release(&mut self) {
        self.analyzer = None;
    }

    fn is_acquired(&self) -> bool {
        self.analyzer.is_some()
    }
}
