use crate::audio::CaptureRequest;
use crate::error::{IntakeError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

const MAX_ALTERNATIVES_LIMIT: u32 = 10;
const MIN_ANALYSIS_INTERVAL_MS: u64 = 10;
const MAX_ANALYSIS_INTERVAL_MS: u64 = 1000;

/// Session options passed to `configure`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionOptions {
    /// BCP-47 language tag handed to the transcription engine
    pub language: String,
    /// Keep listening across natural ends of the engine session
    pub continuous: bool,
    pub interim_results: bool,
    pub max_alternatives: u32,
    /// Audio analysis tick in milliseconds
    pub analysis_interval_ms: u64,
    pub emotion_detection_enabled: bool,
    pub audio_event_detection_enabled: bool,
    pub capture: CaptureRequest,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            language: "id-ID".to_string(),
            continuous: true,
            interim_results: true,
            max_alternatives: 3,
            analysis_interval_ms: 100,
            emotion_detection_enabled: true,
            audio_event_detection_enabled: true,
            capture: CaptureRequest::default(),
        }
    }
}

impl SessionOptions {
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(IntakeError::Config("language cannot be empty".to_string()));
        }
        if self.max_alternatives == 0 || self.max_alternatives > MAX_ALTERNATIVES_LIMIT {
            return Err(IntakeError::Config(format!(
                "maxAlternatives must be between 1 and {}, got {}",
                MAX_ALTERNATIVES_LIMIT, self.max_alternatives
            )));
        }
        if !(MIN_ANALYSIS_INTERVAL_MS..=MAX_ANALYSIS_INTERVAL_MS)
            .contains(&self.analysis_interval_ms)
        {
            return Err(IntakeError::Config(format!(
                "analysisIntervalMs must be between {} and {}, got {}",
                MIN_ANALYSIS_INTERVAL_MS, MAX_ANALYSIS_INTERVAL_MS, self.analysis_interval_ms
            )));
        }
        if self.capture.sample_rate == 0 || self.capture.channels == 0 {
            return Err(IntakeError::Config(
                "capture sample rate and channel count must be positive".to_string(),
            ));
        }
        if self.capture.fft_size < 32 || !self.capture.fft_size.is_power_of_two() {
            return Err(IntakeError::Config(format!(
                "capture fftSize must be a power of two >= 32, got {}",
                self.capture.fft_size
            )));
        }
        Ok(())
    }

    /// Parse options from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load options from `INTAKE_*` environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for development)
        dotenvy::dotenv().ok();

        let mut options = Self::default();
        if let Some(language) = read_var("INTAKE_LANGUAGE") {
            options.language = language;
        }
        if let Some(v) = read_var("INTAKE_CONTINUOUS") {
            options.continuous = parse_bool("INTAKE_CONTINUOUS", &v)?;
        }
        if let Some(v) = read_var("INTAKE_INTERIM_RESULTS") {
            options.interim_results = parse_bool("INTAKE_INTERIM_RESULTS", &v)?;
        }
        if let Some(v) = read_var("INTAKE_MAX_ALTERNATIVES") {
            options.max_alternatives = parse_number("INTAKE_MAX_ALTERNATIVES", &v)?;
        }
        if let Some(v) = read_var("INTAKE_ANALYSIS_INTERVAL_MS") {
            options.analysis_interval_ms = parse_number("INTAKE_ANALYSIS_INTERVAL_MS", &v)?;
        }
        if let Some(v) = read_var("INTAKE_EMOTION_DETECTION") {
            options.emotion_detection_enabled = parse_bool("INTAKE_EMOTION_DETECTION", &v)?;
        }
        if let Some(v) = read_var("INTAKE_AUDIO_EVENT_DETECTION") {
            options.audio_event_detection_enabled =
                parse_bool("INTAKE_AUDIO_EVENT_DETECTION", &v)?;
        }
        if let Some(device) = read_var("INTAKE_AUDIO_DEVICE") {
            options.capture.device_name = Some(device);
        }

        options.validate()?;
        Ok(options)
    }
}

fn read_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(IntakeError::Config(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| IntakeError::Config(format!("{} must be a number, got '{}'", name, value)))
}

/// Load options with helpful error messages for development
pub fn load_options() -> Result<SessionOptions> {
    match SessionOptions::from_env() {
        Ok(options) => {
            log::info!(
                "Loaded session options (language: {}, continuous: {}, interval: {}ms)",
                options.language,
                options.continuous,
                options.analysis_interval_ms
            );
            Ok(options)
        }
        Err(e) => {
            log::error!("Configuration error: {}", e);
            log::error!("Check the INTAKE_* variables in your environment or .env file");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = SessionOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.language, "id-ID");
        assert_eq!(options.max_alternatives, 3);
        assert_eq!(options.analysis_interval_ms, 100);
    }

    #[test]
    fn test_from_json_partial() {
        let options =
            SessionOptions::from_json(r#"{"continuous": false, "maxAlternatives": 1}"#).unwrap();
        assert!(!options.continuous);
        assert_eq!(options.max_alternatives, 1);
        assert!(options.interim_results);
        assert_eq!(options.capture.sample_rate, 16000);
    }

    #[test]
    fn test_from_json_capture_section() {
        let options =
            SessionOptions::from_json(r#"{"capture": {"fftSize": 2048, "deviceName": "usb"}}"#)
                .unwrap();
        assert_eq!(options.capture.fft_size, 2048);
        assert_eq!(options.capture.device_name.as_deref(), Some("usb"));
        assert_eq!(options.capture.channels, 1);
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut options = SessionOptions::default();
        options.max_alternatives = 0;
        assert!(matches!(options.validate(), Err(IntakeError::Config(_))));

        let mut options = SessionOptions::default();
        options.analysis_interval_ms = 0;
        assert!(options.validate().is_err());

        let mut options = SessionOptions::default();
        options.language = "  ".to_string();
        assert!(options.validate().is_err());

        let mut options = SessionOptions::default();
        options.capture.fft_size = 1000;
        assert!(options.validate().is_err());

        assert!(SessionOptions::from_json(r#"{"analysisIntervalMs": 5000}"#).is_err());
        assert!(matches!(
            SessionOptions::from_json("not json"),
            Err(IntakeError::Json(_))
        ));
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_bool("X", "Yes").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
        assert_eq!(parse_number::<u32>("X", " 4 ").unwrap(), 4);
        assert!(parse_number::<u64>("X", "-1").is_err());
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"language": "en-US"}"#).unwrap();
        let options = SessionOptions::from_json_file(&path).unwrap();
        assert_eq!(options.language, "en-US");
    }
}
