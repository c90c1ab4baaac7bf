//! Test doubles shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use voice_intake::{
    audio::{AnalyzerReading, AudioCapture, CaptureError, CaptureFormat, CaptureRequest},
    config::SessionOptions,
    fusion::DistressAssessment,
    session::{EngineEvent, SessionCallbacks, SessionError, TranscriptionEngine},
    transcript::Alternative,
};

pub const BIN_COUNT: usize = 512;

/// Shared view into a [`ManualEngine`] the test keeps after handing the
/// engine to the session
#[derive(Clone, Default)]
pub struct EngineProbe {
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<EngineEvent>>>>,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl EngineProbe {
    /// Send on the sender of the most recent start
    pub fn send(&self, event: EngineEvent) {
        let sender = self.sender.lock().unwrap();
        sender
            .as_ref()
            .expect("engine not started")
            .send(event)
            .expect("session dropped the receiver");
    }

    pub fn final_text(&self, text: &str) {
        self.send(EngineEvent::Result {
            alternatives: vec![Alternative::new(text, 0.9)],
            is_final: true,
        });
    }

    pub fn interim_text(&self, text: &str) {
        self.send(EngineEvent::Result {
            alternatives: vec![Alternative::new(text, 0.5)],
            is_final: false,
        });
    }

    pub fn error(&self, code: &str) {
        self.send(EngineEvent::Error(SessionError::from_raw(code)));
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Engine driven by the test through its [`EngineProbe`]
#[derive(Default)]
pub struct ManualEngine {
    pub unsupported: bool,
    pub shares_audio_input: bool,
    pub start_error: Option<String>,
    pub probe: EngineProbe,
}

impl ManualEngine {
    pub fn new() -> (Self, EngineProbe) {
        let engine = Self::default();
        let probe = engine.probe.clone();
        (engine, probe)
    }

    pub fn sharing_audio_input() -> (Self, EngineProbe) {
        let (mut engine, probe) = Self::new();
        engine.shares_audio_input = true;
        (engine, probe)
    }
}

#[async_trait]
impl TranscriptionEngine for ManualEngine {
    fn is_supported(&self) -> bool {
        !self.unsupported
    }

    fn shares_audio_input(&self) -> bool {
        self.shares_audio_input
    }

    async fn start(
        &mut self,
        _options: &SessionOptions,
        events: mpsc::UnboundedSender<EngineEvent>,
    ) -> Result<(), SessionError> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = &self.start_error {
            return Err(SessionError::from_raw(code.clone()));
        }
        *self.probe.sender.lock().unwrap() = Some(events);
        Ok(())
    }

    async fn stop(&mut self) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        self.probe.sender.lock().unwrap().take();
    }
}

/// Capture returning a fixed reading, optionally failing to acquire or
/// losing the input after a number of reads
pub struct FixedCapture {
    reading: AnalyzerReading,
    /// Volumes played in a loop, one per read; empty keeps `reading.volume`
    volumes: Vec<f32>,
    pub acquire_error: Option<CaptureError>,
    pub lose_after: Option<usize>,
    reads: usize,
    acquired: Arc<AtomicBool>,
}

impl FixedCapture {
    pub fn new(volume: f32, level_db: f32) -> Self {
        Self {
            reading: AnalyzerReading {
                volume,
                spectrum: vec![level_db; BIN_COUNT],
            },
            volumes: Vec::new(),
            acquire_error: None,
            lose_after: None,
            reads: 0,
            acquired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn silent() -> Self {
        Self::new(0.0, -100.0)
    }

    /// Cycles through `volumes` over a flat spectrum
    pub fn looping(volumes: Vec<f32>, level_db: f32) -> Self {
        Self {
            volumes,
            ..Self::new(0.0, level_db)
        }
    }

    pub fn acquired_flag(&self) -> Arc<AtomicBool> {
        self.acquired.clone()
    }
}

#[async_trait]
impl AudioCapture for FixedCapture {
    async fn acquire(&mut self, _request: &CaptureRequest) -> Result<CaptureFormat, CaptureError> {
        if let Some(e) = &self.acquire_error {
            return Err(e.clone());
        }
        self.acquired.store(true, Ordering::SeqCst);
        Ok(CaptureFormat {
            sample_rate: 16000,
            bin_count: BIN_COUNT,
        })
    }

    fn read(&mut self) -> Result<AnalyzerReading, CaptureError> {
        if !self.acquired.load(Ordering::SeqCst) {
            return Err(CaptureError::NotAcquired);
        }
        if self.lose_after.is_some_and(|n| self.reads >= n) {
            return Err(CaptureError::Lost("unplugged".to_string()));
        }
        let mut reading = self.reading.clone();
        if !self.volumes.is_empty() {
            reading.volume = self.volumes[self.reads % self.volumes.len()];
        }
        self.reads += 1;
        Ok(reading)
    }

    fn release(&mut self) {
        self.acquired.store(false, Ordering::SeqCst);
    }

    fn is_acquired(&self) -> bool {
        self.acquired.load(Ordering::SeqCst)
    }
}

/// Records every callback as a short tag, in emission order
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<VecDeque<String>>>,
    assessments: Arc<Mutex<Vec<DistressAssessment>>>,
}

impl Recorder {
    fn push(&self, tag: String) {
        self.events.lock().unwrap().push_back(tag);
    }

    pub fn callbacks(&self) -> SessionCallbacks {
        let start = self.clone();
        let result = self.clone();
        let interim = self.clone();
        let error = self.clone();
        let end = self.clone();
        let emotion = self.clone();
        let audio = self.clone();
        let distress = self.clone();

        SessionCallbacks::new()
            .on_start(move || start.push("start".to_string()))
            .on_result(move |r| result.push(format!("result:{}", r.text)))
            .on_interim(move |text| interim.push(format!("interim:{}", text)))
            .on_error(move |e| error.push(format!("error:{}", e.raw_code)))
            .on_end(move || end.push("end".to_string()))
            .on_emotion_detected(move |a| emotion.push(format!("emotion:{}", a.emotion())))
            .on_audio_event(move |e| audio.push(format!("audio:{}", e.kind)))
            .on_distress(move |a| {
                distress.assessments.lock().unwrap().push(a.clone());
                distress.push("distress".to_string());
            })
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().cloned().collect()
    }

    pub fn assessments(&self) -> Vec<DistressAssessment> {
        self.assessments.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }
}
