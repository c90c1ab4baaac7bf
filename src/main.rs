use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use voice_intake::{
    audio::SampleCapture,
    config::{load_options, SessionOptions},
    replay::{ScriptedEngine, TranscriptScript},
    session::{SessionCallbacks, SessionHandle, SpeechSessionManager},
};

/// Grace period after the last scripted step before the replay stops
const TAIL_MS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a recording and a transcript script through an intake session", long_about = None)]
struct Args {
    /// Transcript script (JSON) played by the scripted engine
    #[arg(long)]
    script: PathBuf,

    /// WAV recording analysed for audio events
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Session options (JSON); INTAKE_* environment variables are used otherwise
    #[arg(long)]
    options: Option<PathBuf>,

    /// Stop after this many milliseconds (default: length of script or recording)
    #[arg(long)]
    duration_ms: Option<u64>,
}

fn print_event(event: &str, data: impl Serialize) {
    match serde_json::to_string(&json!({ "event": event, "data": data })) {
        Ok(line) => println!("{}", line),
        Err(e) => log::warn!("Failed to serialize {} event: {}", event, e),
    }
}

fn printing_callbacks() -> SessionCallbacks {
    SessionCallbacks::new()
        .on_start(|| print_event("start", ()))
        .on_result(|result| print_event("result", result))
        .on_interim(|text| print_event("interim", text))
        .on_error(|error| print_event("error", error))
        .on_end(|| print_event("end", ()))
        .on_emotion_detected(|analysis| print_event("emotion", analysis))
        .on_audio_event(|event| print_event("audioEvent", event))
        .on_distress(|assessment| print_event("distress", assessment))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut options = match &args.options {
        Some(path) => SessionOptions::from_json_file(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => load_options()?,
    };

    let script = TranscriptScript::from_file(&args.script)
        .with_context(|| format!("loading script from {}", args.script.display()))?;

    let capture = match &args.wav {
        Some(path) => SampleCapture::from_wav(path, options.analysis_interval_ms)
            .with_context(|| format!("loading recording from {}", path.display()))?,
        None => {
            log::info!("No recording given, audio event detection disabled");
            options.audio_event_detection_enabled = false;
            SampleCapture::new(
                Vec::new(),
                options.capture.sample_rate,
                options.analysis_interval_ms,
            )
        }
    };

    let recording_ms = capture.remaining_reads() as u64 * options.analysis_interval_ms;
    let duration = Duration::from_millis(
        args.duration_ms
            .unwrap_or_else(|| script.duration_ms().max(recording_ms) + TAIL_MS),
    );

    let manager = SpeechSessionManager::new(ScriptedEngine::new(script), capture);
    let handle = SessionHandle::spawn(manager);
    handle.set_callbacks(printing_callbacks()).await?;
    handle.configure(options).await?;
    handle.start().await?;
    log::info!("Replaying for {}ms", duration.as_millis());

    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted");
        }
    }

    handle.stop().await?;
    print_event("state", handle.get_state().await?);
    handle.shutdown().await?;
    Ok(())
}
