//! Assistant wiring.
//!
//! `Assistant` owns the command queue, the dispatch worker, the speech
//! channel, and (once started) the voice session. Collaborators are
//! injected at construction; `with_defaults` assembles the production
//! set from configuration and the environment.

use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::capability::{
    ArboardClipboard, ClipboardCapability, CommandScreenshot, ScreenshotCapability,
};
use crate::config::{AssistantConfig, VoiceConfig};
use crate::dispatch::{CommandDispatcher, DispatchWorker};
use crate::error::Result;
use crate::storage::Storage;
use crate::voice::{
    AudioSink, AudioSource, OpenAiTtsProvider, SessionController, SessionParams, SessionState,
    SpeechOutput, SttProvider,
};

pub struct Assistant {
    config: AssistantConfig,
    storage: Arc<Storage>,
    speech: Arc<SpeechOutput>,
    dispatcher: Arc<CommandDispatcher>,
    commands_tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    worker: Mutex<Option<DispatchWorker>>,
    session: Mutex<Option<SessionController>>,
}

impl Assistant {
    /// Wire an assistant from injected collaborators and start the
    /// dispatch worker.
    pub fn new(
        config: AssistantConfig,
        storage: Arc<Storage>,
        speech: Arc<SpeechOutput>,
        screenshot: Arc<dyn ScreenshotCapability>,
        clipboard: Arc<dyn ClipboardCapability>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(CommandDispatcher::new(
            speech.clone(),
            storage.clone(),
            screenshot,
            clipboard,
        ));
        let worker = DispatchWorker::spawn(dispatcher.clone(), rx);
        info!(wake = %config.wake_phrase, "assistant assembled");
        Self {
            config,
            storage,
            speech,
            dispatcher,
            commands_tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            session: Mutex::new(None),
        }
    }

    /// Assemble the production assistant: on-disk storage, system
    /// capabilities, and OpenAI speech when an API key is present
    /// (otherwise a logs-only speech channel).
    pub fn with_defaults(config: AssistantConfig) -> Result<Self> {
        let storage = Arc::new(Storage::new(config.storage_dir()?)?);
        let speech = if config.voice.enabled {
            match build_tts(&config.voice) {
                Some(tts) => Arc::new(SpeechOutput::new(
                    tts,
                    default_sink(&config.voice),
                    Some(config.voice.tts_voice.clone()),
                    config.voice.tts_speed,
                )),
                None => Arc::new(SpeechOutput::disabled()),
            }
        } else {
            Arc::new(SpeechOutput::disabled())
        };
        let screenshot: Arc<dyn ScreenshotCapability> =
            Arc::new(CommandScreenshot::new(storage.clone()));
        let clipboard: Arc<dyn ClipboardCapability> = Arc::new(ArboardClipboard::new());
        Ok(Self::new(config, storage, speech, screenshot, clipboard))
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn storage(&self) -> Arc<Storage> {
        self.storage.clone()
    }

    pub fn speech_available(&self) -> bool {
        use crate::voice::SpeechChannel as _;
        self.speech.is_available()
    }

    /// A sender into the command queue, or `None` after shutdown.
    pub fn command_sender(&self) -> Option<mpsc::UnboundedSender<String>> {
        self.commands_tx.lock().unwrap().clone()
    }

    /// Run one utterance through the dispatcher directly, bypassing the
    /// queue. Used by the one-shot CLI path.
    pub async fn dispatch_now(&self, utterance: &str) -> bool {
        self.dispatcher.dispatch(utterance).await
    }

    /// Start the voice session with the given capture and transcription
    /// backends. A second call replaces a stopped session.
    pub fn start_voice(&self, source: Arc<dyn AudioSource>, stt: Arc<dyn SttProvider>) {
        let Some(commands) = self.command_sender() else {
            return;
        };
        let params = SessionParams::from_config(
            &self.config.voice,
            &self.config.wake_phrase,
            source,
            stt,
            self.speech.clone(),
            commands,
        );
        let controller = crate::voice::session::spawn(params);
        *self.session.lock().unwrap() = Some(controller);
    }

    pub fn pause_listening(&self) {
        if let Some(session) = &*self.session.lock().unwrap() {
            session.pause();
        }
    }

    pub fn resume_listening(&self) {
        if let Some(session) = &*self.session.lock().unwrap() {
            session.resume();
        }
    }

    pub fn session_state(&self) -> Option<SessionState> {
        self.session.lock().unwrap().as_ref().map(|s| s.state())
    }

    pub fn session_state_receiver(&self) -> Option<watch::Receiver<SessionState>> {
        self.session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.state_receiver())
    }

    /// Orderly shutdown: stop listening, drain already-queued commands,
    /// then let queued speech finish. Any command senders handed out to
    /// other components must be dropped first or the drain will wait on
    /// them.
    pub async fn shutdown(&self) {
        let session = self.session.lock().unwrap().take();
        if let Some(session) = session {
            session.stop().await;
        }
        drop(self.commands_tx.lock().unwrap().take());
        let worker = self.worker.lock().unwrap().take();
        if let Some(worker) = worker {
            worker.join().await;
        }
        self.speech.shutdown().await;
        info!("assistant shut down");
    }
}

fn build_tts(voice: &VoiceConfig) -> Option<Arc<dyn crate::voice::TtsProvider>> {
    match voice.tts_provider.as_str() {
        "mock" => Some(Arc::new(crate::voice::MockTtsProvider::new())),
        "openai" => match std::env::var("OPENAI_API_KEY") {
            Ok(key) => Some(Arc::new(
                OpenAiTtsProvider::new(key).with_voice(voice.tts_voice.clone()),
            )),
            Err(_) => {
                tracing::warn!("OPENAI_API_KEY not set, speech output disabled");
                None
            }
        },
        other => {
            tracing::warn!(provider = other, "unknown TTS provider, speech output disabled");
            None
        }
    }
}

fn default_sink(voice: &VoiceConfig) -> Arc<dyn AudioSink> {
    #[cfg(feature = "audio")]
    {
        Arc::new(crate::voice::CpalSink::new(voice.output_device.clone()))
    }
    #[cfg(not(feature = "audio"))]
    {
        let _ = voice;
        Arc::new(crate::voice::NullSink)
    }
}
