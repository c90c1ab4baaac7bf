use crate::audio::AudioCapture;
use crate::config::SessionOptions;
use crate::error::{IntakeError, Result};
use crate::session::{
    SessionCallbacks, SessionSnapshot, SpeechSessionManager, TranscriptionEngine,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 32;

enum Command {
    Configure(SessionOptions, oneshot::Sender<Result<()>>),
    Start(oneshot::Sender<Result<()>>),
    Stop(oneshot::Sender<Result<()>>),
    SetCallbacks(SessionCallbacks, oneshot::Sender<()>),
    GetState(oneshot::Sender<SessionSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Async front end for a [`SpeechSessionManager`] running on its own task.
///
/// Commands are processed in order, before any pending engine event or audio
/// tick, so nothing is delivered for a session once `stop` has returned.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn spawn<E, A>(manager: SpeechSessionManager<E, A>) -> Self
    where
        E: TranscriptionEngine + 'static,
        A: AudioCapture + 'static,
    {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let worker = tokio::spawn(run_worker(manager, rx));
        Self {
            commands,
            worker: Some(worker),
        }
    }

    pub async fn configure(&self, options: SessionOptions) -> Result<()> {
        self.request(|reply| Command::Configure(options, reply))
            .await?
    }

    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await?
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await?
    }

    pub async fn set_callbacks(&self, callbacks: SessionCallbacks) -> Result<()> {
        self.request(|reply| Command::SetCallbacks(callbacks, reply))
            .await
    }

    pub async fn get_state(&self) -> Result<SessionSnapshot> {
        self.request(Command::GetState).await
    }

    /// Stop the session and end the worker task
    pub async fn shutdown(mut self) -> Result<()> {
        self.request(Command::Shutdown).await?;
        if let Some(worker) = self.worker.take() {
            worker.await.map_err(|_| IntakeError::WorkerGone)?;
        }
        Ok(())
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| IntakeError::WorkerGone)?;
        response.await.map_err(|_| IntakeError::WorkerGone)
    }
}

async fn run_worker<E, A>(
    mut manager: SpeechSessionManager<E, A>,
    mut commands: mpsc::Receiver<Command>,
) where
    E: TranscriptionEngine,
    A: AudioCapture,
{
    log::debug!("Session worker started");
    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(Command::Configure(options, reply)) => {
                    let _ = reply.send(manager.configure(options));
                }
                Some(Command::Start(reply)) => {
                    let _ = reply.send(manager.start().await);
                }
                Some(Command::Stop(reply)) => {
                    let _ = reply.send(manager.stop().await);
                }
                Some(Command::SetCallbacks(callbacks, reply)) => {
                    manager.set_callbacks(callbacks);
                    let _ = reply.send(());
                }
                Some(Command::GetState(reply)) => {
                    let _ = reply.send(manager.get_state());
                }
                Some(Command::Shutdown(reply)) => {
                    if let Err(e) = manager.stop().await {
                        log::warn!("Failed to stop session on shutdown: {}", e);
                    }
                    let _ = reply.send(());
                    break;
                }
                None => {
                    if let Err(e) = manager.stop().await {
                        log::warn!("Failed to stop session after handle dropped: {}", e);
                    }
                    break;
                }
            },
            wake = manager.wait() => manager.dispatch(wake).await,
        }
    }
    log::debug!("Session worker finished");
}
