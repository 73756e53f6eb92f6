//! Voice session loop and its controller.
//!
//! The loop runs as a background task: capture a short audio sample, look
//! for the wake phrase, switch into a bounded command capture, and enqueue
//! recognized text for dispatch. Pause/stop are flag flips observed at the
//! top of each outer iteration; the loop task is the only writer of the
//! session state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::audio_io::AudioSource;
use super::speech::SpeechChannel;
use super::stt::SttProvider;
use super::wake::WakePhrase;
use crate::config::VoiceConfig;
use crate::error::VoiceError;

/// Observable state of the voice session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    ListeningForWake,
    ListeningForCommand,
    Paused,
    Stopped,
}

/// Everything the session loop needs, injected at construction.
pub struct SessionParams {
    pub wake_phrase: WakePhrase,
    pub wake_listen_secs: u64,
    pub command_listen_secs: u64,
    pub retry_backoff: Duration,
    pub paused_poll: Duration,
    pub source: Arc<dyn AudioSource>,
    pub stt: Arc<dyn SttProvider>,
    pub speech: Arc<dyn SpeechChannel>,
    /// Recognized utterances are sent here for the dispatch worker.
    pub commands: mpsc::UnboundedSender<String>,
}

impl SessionParams {
    pub fn from_config(
        config: &VoiceConfig,
        wake_phrase: &str,
        source: Arc<dyn AudioSource>,
        stt: Arc<dyn SttProvider>,
        speech: Arc<dyn SpeechChannel>,
        commands: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            wake_phrase: WakePhrase::new(wake_phrase),
            wake_listen_secs: config.wake_listen_secs,
            command_listen_secs: config.command_listen_secs,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            paused_poll: Duration::from_millis(config.paused_poll_ms),
            source,
            stt,
            speech,
            commands,
        }
    }
}

/// Handle for pausing, resuming, and stopping the session from other
/// threads. Only flips flags; the loop acts on them at its check-points.
pub struct SessionController {
    paused: Arc<AtomicBool>,
    cancel_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<SessionState>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    /// Request a pause. Idempotent; takes effect at the next check-point.
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            info!("voice session pause requested");
        }
    }

    /// Request a resume back to wake listening.
    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            info!("voice session resume requested");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Last state published by the loop.
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    /// A receiver for observing state transitions (dashboard, tests).
    pub fn state_receiver(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Stop the session and wait for the loop task to exit. No new audio
    /// is captured; already-queued commands are still dispatched.
    pub async fn stop(&self) {
        let _ = self.cancel_tx.send(true);
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(Duration::from_secs(10), handle).await;
        }
    }
}

/// Start the voice session loop in the background.
pub fn spawn(params: SessionParams) -> SessionController {
    let paused = Arc::new(AtomicBool::new(false));
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (state_tx, state_rx) = watch::channel(SessionState::ListeningForWake);

    let loop_paused = paused.clone();
    let handle = tokio::spawn(async move {
        run_loop(params, loop_paused, cancel_rx, state_tx).await;
    });

    SessionController {
        paused,
        cancel_tx,
        state_rx,
        handle: Mutex::new(Some(handle)),
    }
}

async fn run_loop(
    params: SessionParams,
    paused: Arc<AtomicBool>,
    mut cancel_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<SessionState>,
) {
    info!(wake = params.wake_phrase.phrase(), "voice session started");

    loop {
        // Check-point: stop and pause flags, once per outer iteration.
        if *cancel_rx.borrow() {
            break;
        }
        if paused.load(Ordering::SeqCst) {
            if *state_tx.borrow() != SessionState::Paused {
                info!("voice session paused");
            }
            let _ = state_tx.send_replace(SessionState::Paused);
            tokio::time::sleep(params.paused_poll).await;
            continue;
        }
        let _ = state_tx.send_replace(SessionState::ListeningForWake);

        let chunk = tokio::select! {
            result = params.source.capture(params.wake_listen_secs as f32) => match result {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(error = %e, "wake listen capture failed");
                    tokio::time::sleep(params.retry_backoff).await;
                    continue;
                }
            },
            _ = cancel_rx.changed() => break,
        };

        let transcript = match params.stt.transcribe(&chunk).await {
            Ok(result) => result.text,
            Err(e) => {
                if matches!(e, VoiceError::Unintelligible) {
                    trace!("wake listen: unintelligible");
                } else {
                    warn!(error = %e, transient = e.is_transient(), "wake transcription failed");
                }
                tokio::time::sleep(params.retry_backoff).await;
                continue;
            }
        };
        if transcript.trim().is_empty() {
            continue;
        }
        debug!(text = %transcript, "heard");

        let Some(hit) = params.wake_phrase.detect(&transcript) else {
            continue;
        };
        info!(text = %transcript, "wake phrase detected");

        if let Some(command) = hit.trailing_command {
            // Command spoken in the same utterance: skip the sub-listen.
            if params.commands.send(command).is_err() {
                warn!("command queue closed, dropping utterance");
            }
            continue;
        }

        let _ = state_tx.send_replace(SessionState::ListeningForCommand);
        match listen_for_command(&params).await {
            Ok(command) => {
                info!(text = %command, "command captured");
                if params.commands.send(command).is_err() {
                    warn!("command queue closed, dropping utterance");
                }
            }
            Err(e) => {
                debug!(error = %e, "command capture produced nothing");
                params.speech.speak("Sorry, I didn't catch that.", false).await;
            }
        }
    }

    let _ = state_tx.send_replace(SessionState::Stopped);
    info!("voice session stopped");
}

/// One bounded command capture after the wake phrase. The capture has a
/// hard timeout; an in-flight transcription is awaited to completion.
async fn listen_for_command(params: &SessionParams) -> Result<String, VoiceError> {
    let secs = params.command_listen_secs;
    let deadline = Duration::from_secs(secs) + Duration::from_millis(500);

    let chunk = tokio::time::timeout(deadline, params.source.capture(secs as f32))
        .await
        .map_err(|_| VoiceError::ListenTimeout { timeout_secs: secs })??;

    let result = params.stt.transcribe(&chunk).await?;
    let text = result.text.trim().to_lowercase();
    if text.is_empty() {
        return Err(VoiceError::Unintelligible);
    }
    Ok(text)
}
