use crate::audio::AudioEvent;
use crate::emotion::EmotionAnalysis;
use crate::fusion::DistressAssessment;
use crate::session::{RecognitionResult, SessionError};
use std::fmt;

type Handler<T> = Option<Box<dyn FnMut(&T) + Send>>;
type Notify = Option<Box<dyn FnMut() + Send>>;

/// Subscriber slots for session output. Unset slots are skipped.
///
/// All handlers run on the session worker, in emission order.
#[derive(Default)]
pub struct SessionCallbacks {
    start: Notify,
    result: Handler<RecognitionResult>,
    interim: Option<Box<dyn FnMut(&str) + Send>>,
    error: Handler<SessionError>,
    end: Notify,
    emotion_detected: Handler<EmotionAnalysis>,
    audio_event: Handler<AudioEvent>,
    distress: Handler<DistressAssessment>,
}

impl SessionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    pub fn on_result(mut self, f: impl FnMut(&RecognitionResult) + Send + 'static) -> Self {
        self.result = Some(Box::new(f));
        self
    }

    pub fn on_interim(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
        self.interim = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnMut(&SessionError) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn on_end(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.end = Some(Box::new(f));
        self
    }

    pub fn on_emotion_detected(
        mut self,
        f: impl FnMut(&EmotionAnalysis) + Send + 'static,
    ) -> Self {
        self.emotion_detected = Some(Box::new(f));
        self
    }

    pub fn on_audio_event(mut self, f: impl FnMut(&AudioEvent) + Send + 'static) -> Self {
        self.audio_event = Some(Box::new(f));
        self
    }

    pub fn on_distress(mut self, f: impl FnMut(&DistressAssessment) + Send + 'static) -> Self {
        self.distress = Some(Box::new(f));
        self
    }

    pub(crate) fn emit_start(&mut self) {
        if let Some(f) = self.start.as_mut() {
            f();
        }
    }

    pub(crate) fn emit_result(&mut self, result: &RecognitionResult) {
        if let Some(f) = self.result.as_mut() {
            f(result);
        }
    }

    pub(crate) fn emit_interim(&mut self, text: &str) {
        if let Some(f) = self.interim.as_mut() {
            f(text);
        }
    }

    pub(crate) fn emit_error(&mut self, error: &SessionError) {
        if let Some(f) = self.error.as_mut() {
            f(error);
        }
    }

    pub(crate) fn emit_end(&mut self) {
        if let Some(f) = self.end.as_mut() {
            f();
        }
    }

    pub(crate) fn emit_emotion(&mut self, analysis: &EmotionAnalysis) {
        if let Some(f) = self.emotion_detected.as_mut() {
            f(analysis);
        }
    }

    pub(crate) fn emit_audio_event(&mut self, event: &AudioEvent) {
        if let Some(f) = self.audio_event.as_mut() {
            f(event);
        }
    }

    pub(crate) fn emit_distress(&mut self, assessment: &DistressAssessment) {
        if let Some(f) = self.distress.as_mut() {
            f(assessment);
        }
    }
}

impl fmt::Debug for SessionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCallbacks")
            .field("on_start", &self.start.is_some())
            .field("on_result", &self.result.is_some())
            .field("on_interim", &self.interim.is_some())
            .field("on_error", &self.error.is_some())
            .field("on_end", &self.end.is_some())
            .field("on_emotion_detected", &self.emotion_detected.is_some())
            .field("on_audio_event", &self.audio_event.is_some())
            .field("on_distress", &self.distress.is_some())
            .finish()
    }
}
