//! Replays a WAV recording and a transcript script file through a spawned
//! session, the way the intake-replay binary does.

mod common;

use common::Recorder;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use voice_intake::{
    audio::SampleCapture,
    config::SessionOptions,
    emotion::Emotion,
    error::IntakeError,
    replay::{ScriptedEngine, TranscriptScript},
    session::{RecognitionErrorCode, SessionHandle, SessionState, SpeechSessionManager},
};

const SAMPLE_RATE: u32 = 16000;

const SCRIPT: &str = r#"{
    "runs": [
        [
            {"atMs": 150, "type": "interim", "text": "saya sangat"},
            {"atMs": 300, "type": "final", "text": "saya sangat takut", "confidence": 0.8},
            {"atMs": 600, "type": "error", "code": "network"}
        ],
        [
            {"atMs": 200, "type": "final", "text": "gw udah lega"},
            {"atMs": 400, "type": "end"}
        ]
    ]
}"#;

/// One second of a loud 200Hz square wave
fn write_loud_recording(path: &Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let amplitude = (0.9 * i16::MAX as f32) as i16;
    for i in 0..SAMPLE_RATE {
        let high = (i / 40) % 2 == 0;
        writer
            .write_sample(if high { amplitude } else { -amplitude })
            .unwrap();
    }
    writer.finalize().unwrap();
}

fn write_file(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test(start_paused = true)]
async fn test_replay_recording_and_script() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("loud.wav");
    write_loud_recording(&wav);
    let script_path = write_file(&dir, "script.json", SCRIPT);

    let options = SessionOptions {
        continuous: true,
        ..SessionOptions::default()
    };
    let capture = SampleCapture::from_wav(&wav, options.analysis_interval_ms).unwrap();
    assert_eq!(capture.remaining_reads(), 10);
    let script = TranscriptScript::from_file(&script_path).unwrap();

    let recorder = Recorder::default();
    let handle = SessionHandle::spawn(SpeechSessionManager::new(
        ScriptedEngine::new(script),
        capture,
    ));
    handle.set_callbacks(recorder.callbacks()).await.unwrap();
    handle.configure(options).await.unwrap();
    handle.start().await.unwrap();

    // recording ran out at 1.1s, the network error restarted the engine
    tokio::time::sleep(Duration::from_millis(2000)).await;
    let state = handle.get_state().await.unwrap();
    assert!(state.is_recording);
    assert_eq!(state.state, SessionState::Listening);
    let emotions: Vec<Emotion> = state.recent_emotions.iter().map(|s| s.emotion).collect();
    assert_eq!(emotions, vec![Emotion::Lega, Emotion::Takut]);

    handle.stop().await.unwrap();
    handle.shutdown().await.unwrap();

    let events = recorder.events();
    assert_eq!(events.first().map(String::as_str), Some("start"));
    assert_eq!(events.last().map(String::as_str), Some("end"));
    assert!(events.contains(&"interim:saya sangat".to_string()));
    assert!(events.contains(&"result:Saya sangat takut.".to_string()));
    assert!(events.contains(&"result:Saya sudah lega.".to_string()));
    assert!(recorder.count("audio:scream") >= 1);
    assert_eq!(recorder.count("error:"), 0);
    assert_eq!(recorder.count("start"), 1);
    assert_eq!(recorder.count("end"), 1);

    let fear = events
        .iter()
        .position(|e| e == "emotion:takut")
        .unwrap();
    let result = events
        .iter()
        .position(|e| e == "result:Saya sangat takut.")
        .unwrap();
    assert!(fear < result);
}

#[tokio::test(start_paused = true)]
async fn test_replay_start_error_is_returned() {
    let dir = tempfile::tempdir().unwrap();
    let script_path = write_file(
        &dir,
        "denied.json",
        r#"{"startError": "not-allowed", "runs": [[{"atMs": 100, "type": "end"}]]}"#,
    );
    let script = TranscriptScript::from_file(&script_path).unwrap();

    let options = SessionOptions {
        audio_event_detection_enabled: false,
        ..SessionOptions::default()
    };
    let recorder = Recorder::default();
    let handle = SessionHandle::spawn(SpeechSessionManager::new(
        ScriptedEngine::new(script),
        SampleCapture::new(Vec::new(), SAMPLE_RATE, options.analysis_interval_ms),
    ));
    handle.set_callbacks(recorder.callbacks()).await.unwrap();
    handle.configure(options).await.unwrap();

    match handle.start().await {
        Err(IntakeError::Recognition(err)) => {
            assert_eq!(err.kind, RecognitionErrorCode::PermissionDenied);
            assert_eq!(err.raw_code, "not-allowed");
        }
        other => panic!("unexpected start outcome {:?}", other),
    }
    let state = handle.get_state().await.unwrap();
    assert_eq!(state.state, SessionState::Idle);
    assert!(recorder.events().is_empty());

    // the scripted failure only applies to the first start
    handle.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.shutdown().await.unwrap();
    assert_eq!(recorder.events(), vec!["start", "end"]);
}

#[test]
fn test_missing_script_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = TranscriptScript::from_file(dir.path().join("missing.json"));
    assert!(matches!(result, Err(IntakeError::Io(_))));
}
