//! Live microphone capture through cpal.
//!
//! `cpal::Stream` is not `Send`, so the stream lives on a dedicated thread for
//! as long as the capture is acquired. The input callback keeps the last
//! `fft_size` samples of the selected channel in a shared ring that `read`
//! analyses on demand.

use crate::audio::capture::{
    AnalyzerReading, AudioCapture, CaptureError, CaptureFormat, CaptureRequest,
};
use crate::audio::spectrum::SpectrumAnalyzer;
use async_trait::async_trait;
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, Sample, SampleFormat, SizedSample,
};
use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::oneshot;

struct Shared {
    ring: Mutex<VecDeque<f32>>,
    capacity: usize,
    lost: Mutex<Option<String>>,
}

impl Shared {
    fn push_samples(&self, samples: impl Iterator<Item = f32>) {
        if let Ok(mut ring) = self.ring.lock() {
            for sample in samples {
                if ring.len() == self.capacity {
                    ring.pop_front();
                }
                ring.push_back(sample);
            }
        }
    }

    fn mark_lost(&self, reason: String) {
        if let Ok(mut lost) = self.lost.lock() {
            lost.get_or_insert(reason);
        }
    }
}

/// Thread owning a stream until told to stop.
///
/// The thread blocks on the stop channel, so stopping returns as soon as the
/// stream has been dropped.
struct StreamThread {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl StreamThread {
    /// Run `open` on a new thread and keep its stream alive. The receiver
    /// yields the sample rate once the stream plays, or the open error.
    fn spawn<S, F>(
        open: F,
    ) -> Result<(Self, oneshot::Receiver<Result<u32, CaptureError>>), CaptureError>
    where
        S: 'static,
        F: FnOnce() -> Result<(S, u32), CaptureError> + Send + 'static,
    {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop, stop_rx) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("microphone".to_string())
            .spawn(move || {
                let stream = match open() {
                    Ok((stream, sample_rate)) => {
                        let _ = ready_tx.send(Ok(sample_rate));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // returns on an explicit stop or when the sender is dropped
                let _ = stop_rx.recv();
                drop(stream);
                log::debug!("Microphone stream closed");
            })
            .map_err(|e| CaptureError::Stream(e.to_string()))?;
        Ok((Self { stop, handle }, ready_rx))
    }

    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    fn stop(self) {
        let _ = self.stop.send(());
        if self.handle.join().is_err() {
            log::warn!("Microphone thread panicked");
        }
    }
}

struct Running {
    shared: Arc<Shared>,
    thread: StreamThread,
    analyzer: SpectrumAnalyzer,
}

/// [`AudioCapture`] over the system microphone
#[derive(Default)]
pub struct CpalCapture {
    running: Option<Running>,
}

impl CpalCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the available input devices
    pub fn list_devices() -> Result<Vec<String>, CaptureError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

fn find_device(request: &CaptureRequest) -> Result<Device, CaptureError> {
    let host = cpal::default_host();
    match &request.device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
            .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceUnavailable(format!("Device not found: {}", name))),
        None => host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("No default input device found".into())),
    }
}

fn build_stream<T>(
    device: &Device,
    config: &cpal::StreamConfig,
    shared: Arc<Shared>,
) -> Result<cpal::Stream, CaptureError>
where
    T: Sample + SizedSample + Send + Sync + 'static,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let on_error = shared.clone();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // analysis always uses the first channel
                shared.push_samples(
                    data.chunks(channels)
                        .filter_map(|frame| frame.first())
                        .map(|s| f32::from_sample(*s)),
                );
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
                on_error.mark_lost(err.to_string());
            },
            None,
        )
        .map_err(|e| CaptureError::Stream(e.to_string()))
}

/// Open the device and start the stream. Runs on the capture thread.
fn open_stream(
    request: &CaptureRequest,
    shared: Arc<Shared>,
) -> Result<(cpal::Stream, u32), CaptureError> {
    let device = find_device(request)?;

    let supported = device
        .supported_input_configs()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
        .find(|c| {
            c.min_sample_rate().0 <= request.sample_rate
                && c.max_sample_rate().0 >= request.sample_rate
        })
        .map(|c| c.with_sample_rate(cpal::SampleRate(request.sample_rate)));
    let supported = match supported {
        Some(config) => config,
        None => device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?,
    };

    let stream_config = cpal::StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };
    log::info!(
        "Microphone configured: {} channels @ {}Hz (format: {:?})",
        stream_config.channels,
        stream_config.sample_rate.0,
        supported.sample_format()
    );

    let stream = match supported.sample_format() {
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, shared)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, shared)?,
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, shared)?,
        other => {
            return Err(CaptureError::Stream(format!(
                "Unsupported sample format: {:?}",
                other
            )))
        }
    };
    stream
        .play()
        .map_err(|e| CaptureError::Stream(e.to_string()))?;

    Ok((stream, stream_config.sample_rate.0))
}

#[async_trait]
impl AudioCapture for CpalCapture {
    async fn acquire(&mut self, request: &CaptureRequest) -> Result<CaptureFormat, CaptureError> {
        self.release();

        let analyzer = SpectrumAnalyzer::new(request.fft_size);
        let shared = Arc::new(Shared {
            ring: Mutex::new(VecDeque::with_capacity(request.fft_size)),
            capacity: request.fft_size,
            lost: Mutex::new(None),
        });

        let thread_shared = shared.clone();
        let thread_request = request.clone();
        let (thread, ready_rx) =
            StreamThread::spawn(move || open_stream(&thread_request, thread_shared))?;

        let sample_rate = ready_rx
            .await
            .map_err(|_| CaptureError::Stream("capture thread exited".to_string()))??;

        let format = CaptureFormat {
            sample_rate,
            bin_count: analyzer.bin_count(),
        };
        self.running = Some(Running {
            shared,
            thread,
            analyzer,
        });
        Ok(format)
    }

    fn read(&mut self) -> Result<AnalyzerReading, CaptureError> {
        let running = self.running.as_mut().ok_or(CaptureError::NotAcquired)?;

        if let Some(reason) = running.shared.lost.lock().ok().and_then(|l| l.clone()) {
            return Err(CaptureError::Lost(reason));
        }
        if running.thread.is_finished() {
            return Err(CaptureError::Lost("capture thread exited".to_string()));
        }

        let samples: Vec<f32> = running
            .shared
            .ring
            .lock()
            .map_err(|_| CaptureError::Lost("sample buffer poisoned".to_string()))?
            .iter()
            .copied()
            .collect();
        let (volume, spectrum) = running.analyzer.analyze(&samples);
        Ok(AnalyzerReading { volume, spectrum })
    }

    fn release(&mut self) {
        if let Some(running) = self.running.take() {
            running.thread.stop();
            log::info!("Microphone released");
        }
    }

    fn is_acquired(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for CpalCapture {
    fn drop(&mut self) {
        self.release();
    }
}
