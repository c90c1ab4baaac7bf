use crate::audio::{
    AudioCapture, AudioClassifierConfig, AudioEventClassifier, AudioFrame, CaptureError,
};
use crate::config::SessionOptions;
use crate::emotion::TextEmotionClassifier;
use crate::error::{IntakeError, Result};
use crate::fusion::FusionEngine;
use crate::session::engine::{EngineEvent, TranscriptionEngine};
use crate::session::{
    RecognitionErrorCode, RecognitionResult, SessionCallbacks, SessionError, SessionSnapshot,
    SessionState, RECENT_EMOTIONS,
};
use crate::transcript::{Alternative, TranscriptNormalizer, TranscriptSegment};
use std::future::pending;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior};

/// Delay before restarting the engine after a recoverable error
pub const RESTART_DELAY: Duration = Duration::from_millis(500);

/// Automatic restarts allowed without a transcript result in between
pub const MAX_CONSECUTIVE_RETRIES: u32 = 1;

/// What woke the session up. Produced by [`SpeechSessionManager::wait`],
/// consumed by [`SpeechSessionManager::dispatch`].
#[derive(Debug)]
pub enum Wake {
    /// An engine event; `None` when the engine dropped its sender
    Engine(Option<EngineEvent>),
    /// Audio analysis interval elapsed
    Tick,
    /// Pending restart deadline reached
    Restart,
}

/// Owns one continuous recognition session and everything attached to it.
///
/// All work happens on whoever drives [`wait`](Self::wait) and
/// [`dispatch`](Self::dispatch); callbacks run on that same task.
pub struct SpeechSessionManager<E: TranscriptionEngine, A: AudioCapture> {
    engine: E,
    capture: A,
    options: Option<SessionOptions>,
    state: SessionState,
    callbacks: SessionCallbacks,
    normalizer: TranscriptNormalizer,
    text_classifier: TextEmotionClassifier,
    audio_classifier: AudioEventClassifier,
    fusion: FusionEngine,
    events: Option<mpsc::UnboundedReceiver<EngineEvent>>,
    ticker: Option<Interval>,
    restart_at: Option<Instant>,
    consecutive_retries: u32,
    /// Whether the current engine run delivered any result
    heard_result: bool,
    audio_active: bool,
    epoch: Instant,
}

impl<E: TranscriptionEngine, A: AudioCapture> SpeechSessionManager<E, A> {
    pub fn new(engine: E, capture: A) -> Self {
        Self::with_classifier_config(engine, capture, AudioClassifierConfig::default())
    }

    pub fn with_classifier_config(engine: E, capture: A, config: AudioClassifierConfig) -> Self {
        let audio_window = config.window_ms;
        Self {
            engine,
            capture,
            options: None,
            state: SessionState::Idle,
            callbacks: SessionCallbacks::default(),
            normalizer: TranscriptNormalizer::new(),
            text_classifier: TextEmotionClassifier::new(3 * audio_window),
            audio_classifier: AudioEventClassifier::new(config),
            fusion: FusionEngine::new(audio_window, 3 * audio_window),
            events: None,
            ticker: None,
            restart_at: None,
            consecutive_retries: 0,
            heard_result: false,
            audio_active: false,
            epoch: Instant::now(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn capture(&self) -> &A {
        &self.capture
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> Option<&SessionOptions> {
        self.options.as_ref()
    }

    /// Whether audio frames are currently being analysed
    pub fn is_audio_active(&self) -> bool {
        self.audio_active
    }

    /// Whether an automatic restart is scheduled
    pub fn restart_pending(&self) -> bool {
        self.restart_at.is_some()
    }

    /// Milliseconds since the manager was created
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub fn configure(&mut self, options: SessionOptions) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(IntakeError::InvalidState(format!(
                "cannot configure while {}",
                self.state
            )));
        }
        options.validate()?;
        log::debug!("Session configured: {:?}", options);
        self.audio_classifier
            .set_sample_rate(options.capture.sample_rate);
        self.options = Some(options);
        Ok(())
    }

    pub fn set_callbacks(&mut self, callbacks: SessionCallbacks) {
        self.callbacks = callbacks;
    }

    pub fn get_state(&self) -> SessionSnapshot {
        SessionSnapshot {
            is_recording: self.state == SessionState::Listening,
            is_supported: self.engine.is_supported(),
            recent_emotions: self
                .text_classifier
                .history()
                .recent(RECENT_EMOTIONS)
                .cloned()
                .collect(),
            state: self.state,
        }
    }

    /// Start listening. Resolves once the engine confirmed or failed.
    pub async fn start(&mut self) -> Result<()> {
        if !self.engine.is_supported() {
            return Err(IntakeError::UnsupportedCapability(
                "speech recognition is not available".to_string(),
            ));
        }
        if self.state != SessionState::Idle {
            return Err(IntakeError::InvalidState(format!(
                "cannot start while {}",
                self.state
            )));
        }
        let options = self.options.clone().ok_or_else(|| {
            IntakeError::InvalidState("configure must be called before start".to_string())
        })?;

        self.audio_active = false;
        if options.audio_event_detection_enabled {
            match self.capture.acquire(&options.capture).await {
                Ok(format) => {
                    log::info!(
                        "Audio capture acquired ({}Hz, {} bins)",
                        format.sample_rate,
                        format.bin_count
                    );
                    self.audio_classifier.set_sample_rate(format.sample_rate);
                    self.audio_active = true;
                }
                Err(e) if self.engine.shares_audio_input() => {
                    log::error!("Audio capture unavailable: {}", e);
                    return Err(IntakeError::Recognition(SessionError::from(&e)));
                }
                Err(e) => {
                    log::warn!(
                        "Audio capture unavailable, continuing without audio events: {}",
                        e
                    );
                }
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if let Err(err) = self.engine.start(&options, tx).await {
            log::error!("Transcription engine failed to start: {}", err);
            self.teardown();
            self.state = SessionState::Idle;
            return Err(IntakeError::Recognition(err));
        }

        self.events = Some(rx);
        self.consecutive_retries = 0;
        self.heard_result = false;
        self.restart_at = None;
        self.state = SessionState::Listening;
        log::info!(
            "Session listening (language: {}, continuous: {}, audio: {})",
            options.language,
            options.continuous,
            self.audio_active
        );
        self.callbacks.emit_start();

        if self.audio_active {
            let period = Duration::from_millis(options.analysis_interval_ms);
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            self.ticker = Some(ticker);
        }
        Ok(())
    }

    /// Stop listening. Stopping an idle session does nothing.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == SessionState::Idle {
            log::debug!("Stop requested while idle");
            return Ok(());
        }

        self.state = SessionState::Stopping;
        self.engine.stop().await;
        self.teardown();
        self.state = SessionState::Idle;
        log::info!("Session stopped");
        self.callbacks.emit_end();
        Ok(())
    }

    /// Wait for the next thing that needs handling. Pending forever while idle.
    pub async fn wait(&mut self) -> Wake {
        let events = &mut self.events;
        let ticker = &mut self.ticker;
        let restart_at = self.restart_at;

        tokio::select! {
            event = async {
                match events.as_mut() {
                    Some(rx) => rx.recv().await,
                    None => pending().await,
                }
            } => Wake::Engine(event),
            _ = async {
                match ticker.as_mut() {
                    Some(ticker) => {
                        ticker.tick().await;
                    }
                    None => pending::<()>().await,
                }
            } => Wake::Tick,
            _ = async {
                match restart_at {
                    Some(deadline) => sleep_until(deadline).await,
                    None => pending::<()>().await,
                }
            } => Wake::Restart,
        }
    }

    pub async fn dispatch(&mut self, wake: Wake) {
        if self.state != SessionState::Listening {
            log::debug!("Ignoring {:?} while {}", wake, self.state);
            return;
        }

        match wake {
            Wake::Engine(Some(EngineEvent::Result {
                alternatives,
                is_final,
            })) => self.handle_result(alternatives, is_final),
            Wake::Engine(Some(EngineEvent::Error(err))) => self.handle_error(err).await,
            Wake::Engine(Some(EngineEvent::End)) | Wake::Engine(None) => self.handle_end().await,
            Wake::Tick => self.analyze_tick().await,
            Wake::Restart => self.restart_engine().await,
        }
    }

    /// Drive the session for `duration`
    pub async fn run_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while let Ok(wake) = tokio::time::timeout_at(deadline, self.wait()).await {
            self.dispatch(wake).await;
        }
    }

    fn handle_result(&mut self, alternatives: Vec<Alternative>, is_final: bool) {
        self.consecutive_retries = 0;
        self.heard_result = true;
        let now = self.now_ms();
        let Some(options) = self.options.as_ref() else {
            return;
        };
        let max_alternatives = options.max_alternatives as usize;
        let interim_results = options.interim_results;
        let emotion_detection = options.emotion_detection_enabled;

        let Some(segment) =
            TranscriptSegment::from_alternatives(alternatives, is_final, max_alternatives, now)
        else {
            log::debug!("Engine result without alternatives");
            return;
        };

        if !segment.is_final {
            if interim_results {
                self.callbacks.emit_interim(&segment.text);
            }
            return;
        }

        let text = self.normalizer.normalize(&segment.text);
        if text.is_empty() {
            log::debug!("Dropping empty final segment");
            return;
        }
        log::debug!(
            "Final segment: '{}' (confidence: {:.2})",
            text,
            segment.confidence()
        );

        if emotion_detection {
            if let Some(analysis) = self.text_classifier.analyze(&text, now) {
                self.callbacks.emit_emotion(&analysis);
                if let Some(assessment) = self
                    .fusion
                    .observe_emotion(self.text_classifier.history(), now)
                {
                    self.callbacks.emit_distress(&assessment);
                }
            }
        }

        let result = RecognitionResult {
            confidence: segment.confidence(),
            text,
            alternatives: segment.alternatives,
            timestamp_ms: now,
        };
        self.callbacks.emit_result(&result);
    }

    async fn handle_error(&mut self, err: SessionError) {
        if err.is_recoverable() && self.consecutive_retries < MAX_CONSECUTIVE_RETRIES {
            self.consecutive_retries += 1;
            self.restart_at = Some(Instant::now() + RESTART_DELAY);
            log::warn!(
                "Recoverable recognition error '{}', restarting in {}ms",
                err.raw_code,
                RESTART_DELAY.as_millis()
            );
            return;
        }
        self.fail(err).await;
    }

    async fn handle_end(&mut self) {
        if self.restart_at.is_some() {
            log::debug!("Engine ended with a restart pending");
            self.events = None;
            return;
        }

        let continuous = self.options.as_ref().is_some_and(|o| o.continuous);
        if continuous && self.heard_result {
            log::info!("Engine ended, restarting continuous session");
            self.restart_engine().await;
        } else if continuous {
            // an engine that ends without results is restarted at the backoff rate
            log::info!(
                "Engine ended without a result, restarting in {}ms",
                RESTART_DELAY.as_millis()
            );
            self.events = None;
            self.restart_at = Some(Instant::now() + RESTART_DELAY);
        } else {
            self.teardown();
            self.state = SessionState::Idle;
            log::info!("Session ended");
            self.callbacks.emit_end();
        }
    }

    async fn restart_engine(&mut self) {
        self.restart_at = None;
        let Some(options) = self.options.clone() else {
            return;
        };

        let (tx, rx) = mpsc::unbounded_channel();
        // replacing the receiver drops whatever the previous run still had queued
        self.events = None;
        self.heard_result = false;
        match self.engine.start(&options, tx).await {
            Ok(()) => {
                log::info!("Transcription engine restarted");
                self.events = Some(rx);
            }
            Err(err) => {
                log::error!("Transcription engine failed to restart: {}", err);
                self.fail(err).await;
            }
        }
    }

    async fn analyze_tick(&mut self) {
        let now = self.now_ms();
        let reading = match self.capture.read() {
            Ok(reading) => reading,
            Err(e) => {
                self.handle_capture_loss(e).await;
                return;
            }
        };

        let frame = AudioFrame::new(now, reading.volume, reading.spectrum);
        match self
            .audio_classifier
            .process_frame(frame, self.text_classifier.history())
        {
            Ok(Some(event)) => {
                self.callbacks.emit_audio_event(&event);
                if let Some(assessment) =
                    self.fusion
                        .observe_audio_event(event, self.text_classifier.history(), now)
                {
                    self.callbacks.emit_distress(&assessment);
                }
            }
            Ok(None) => {}
            Err(e) if e.is_tick_local() => log::warn!("Skipping analysis tick: {}", e),
            Err(e) => log::error!("Analysis tick failed: {}", e),
        }
    }

    async fn handle_capture_loss(&mut self, error: CaptureError) {
        log::warn!("Audio input lost, disabling audio events: {}", error);
        self.release_audio();
        if self.engine.shares_audio_input() {
            self.fail(SessionError::from_kind(
                RecognitionErrorCode::MicrophoneUnavailable,
            ))
            .await;
        }
    }

    /// Terminal error: back to Idle and report it
    async fn fail(&mut self, err: SessionError) {
        log::error!("Recognition error: {} ({:?})", err.raw_code, err.kind);
        self.engine.stop().await;
        self.teardown();
        self.state = SessionState::Idle;
        self.callbacks.emit_error(&err);
    }

    fn release_audio(&mut self) {
        self.ticker = None;
        if self.capture.is_acquired() {
            self.capture.release();
        }
        self.audio_active = false;
        self.audio_classifier.reset();
    }

    fn teardown(&mut self) {
        self.events = None;
        self.restart_at = None;
        self.consecutive_retries = 0;
        self.release_audio();
        self.fusion.reset();
        self.text_classifier.clear_history();
    }
}
