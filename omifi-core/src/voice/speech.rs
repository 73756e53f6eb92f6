//! Speech output channel.
//!
//! `speak(text, block=false)` enqueues onto a FIFO drained by a single
//! background worker, so spoken output is never interleaved or reordered.
//! `speak(text, block=true)` synthesizes and plays on the caller's task.
//! A missing TTS backend degrades the channel to logs-and-drops; it never
//! raises to callers.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::audio_io::AudioSink;
use super::tts::TtsProvider;
use super::types::SynthesisRequest;

/// The contract collaborators speak through. Implemented by the real
/// channel and by test doubles.
#[async_trait]
pub trait SpeechChannel: Send + Sync {
    /// Speak `text`. Blocking mode returns once playback finished;
    /// non-blocking mode returns as soon as the text is enqueued.
    /// Empty text is a no-op. Never fails: problems are logged.
    async fn speak(&self, text: &str, block: bool);

    /// Whether a working TTS backend is attached.
    fn is_available(&self) -> bool;
}

struct SpeechBackend {
    tts: Arc<dyn TtsProvider>,
    sink: Arc<dyn AudioSink>,
    voice: Option<String>,
    speed: f32,
}

impl SpeechBackend {
    async fn vocalize(&self, text: &str) {
        let mut request = SynthesisRequest::new(text).with_speed(self.speed);
        if let Some(voice) = &self.voice {
            request = request.with_voice(voice.clone());
        }
        let chunk = match self.tts.synthesize(&request).await {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, provider = self.tts.name(), "speech synthesis failed");
                return;
            }
        };
        let sink = self.sink.clone();
        let played = tokio::task::spawn_blocking(move || sink.play(&chunk)).await;
        match played {
            Ok(Ok(())) => debug!(text, "spoke"),
            Ok(Err(e)) => warn!(error = %e, "audio playback failed"),
            Err(e) => warn!(error = %e, "playback task failed"),
        }
    }
}

/// The real speech output channel.
pub struct SpeechOutput {
    backend: Option<Arc<SpeechBackend>>,
    queue_tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechOutput {
    /// Create a channel backed by a TTS provider and playback sink, and
    /// start the queue worker.
    pub fn new(
        tts: Arc<dyn TtsProvider>,
        sink: Arc<dyn AudioSink>,
        voice: Option<String>,
        speed: f32,
    ) -> Self {
        let backend = Arc::new(SpeechBackend {
            tts,
            sink,
            voice,
            speed,
        });
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let worker_backend = backend.clone();
        let worker = tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                worker_backend.vocalize(&text).await;
            }
            debug!("speech queue closed, worker exiting");
        });
        info!(provider = backend.tts.name(), "speech output initialized");
        Self {
            backend: Some(backend),
            queue_tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// A channel with no backend: logs and drops everything it is asked
    /// to speak. Used when TTS initialization fails at startup.
    pub fn disabled() -> Self {
        warn!("speech output unavailable, responses will be logged only");
        Self {
            backend: None,
            queue_tx: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Close the queue and wait for any already-enqueued speech to finish.
    pub async fn shutdown(&self) {
        let tx = self.queue_tx.lock().unwrap().take();
        drop(tx);
        let worker = self.worker.lock().unwrap().take();
        if let Some(handle) = worker {
            let _ = handle.await;
        }
    }
}

#[async_trait]
impl SpeechChannel for SpeechOutput {
    async fn speak(&self, text: &str, block: bool) {
        if text.trim().is_empty() {
            return;
        }
        let Some(backend) = &self.backend else {
            debug!(text, "speech unavailable, dropping");
            return;
        };
        if block {
            backend.vocalize(text).await;
            return;
        }
        let sender = self.queue_tx.lock().unwrap().clone();
        match sender {
            Some(tx) => {
                if tx.send(text.to_string()).is_err() {
                    debug!(text, "speech queue closed, dropping");
                }
            }
            None => debug!(text, "speech queue shut down, dropping"),
        }
    }

    fn is_available(&self) -> bool {
        self.backend.is_some()
    }
}

/// A test double that records everything spoken through it.
pub struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
    available: bool,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
            available: true,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            spoken: Mutex::new(Vec::new()),
            available: false,
        }
    }

    /// Everything spoken so far, in order.
    pub fn transcript(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl Default for RecordingSpeech {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechChannel for RecordingSpeech {
    async fn speak(&self, text: &str, _block: bool) {
        if text.trim().is_empty() {
            return;
        }
        self.spoken.lock().unwrap().push(text.to_string());
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoiceError;
    use crate::voice::audio_io::NullSink;
    use crate::voice::tts::MockTtsProvider;
    use crate::voice::types::AudioChunk;
    use std::time::{Duration, Instant};

    /// Sink that records the sample count of every chunk it plays.
    struct CountingSink {
        lengths: Mutex<Vec<usize>>,
    }

    impl CountingSink {
        fn new() -> Self {
            Self {
                lengths: Mutex::new(Vec::new()),
            }
        }
    }

    impl AudioSink for CountingSink {
        fn play(&self, chunk: &AudioChunk) -> Result<(), VoiceError> {
            self.lengths.lock().unwrap().push(chunk.samples.len());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_text_is_noop() {
        let tts = Arc::new(MockTtsProvider::new());
        let speech = SpeechOutput::new(tts.clone(), Arc::new(NullSink), None, 1.0);
        speech.speak("", false).await;
        speech.speak("   ", true).await;
        speech.shutdown().await;
        assert_eq!(tts.call_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_channel_drops_silently() {
        let speech = SpeechOutput::disabled();
        assert!(!speech.is_available());
        speech.speak("anyone listening?", false).await;
        speech.speak("anyone listening?", true).await;
        speech.shutdown().await;
    }

    #[tokio::test]
    async fn test_queued_speech_plays_in_fifo_order() {
        // Mock TTS output length is proportional to text length, so the
        // played sample counts identify which utterance was which.
        let sink = Arc::new(CountingSink::new());
        let speech = SpeechOutput::new(
            Arc::new(MockTtsProvider::new()),
            sink.clone(),
            None,
            1.0,
        );

        speech.speak("hi", false).await;
        speech.speak("a much longer sentence to speak", false).await;
        speech.speak("mid", false).await;
        speech.shutdown().await;

        let lengths = sink.lengths.lock().unwrap().clone();
        assert_eq!(lengths.len(), 3);
        assert!(lengths[0] < lengths[2] && lengths[2] < lengths[1]);
    }

    #[tokio::test]
    async fn test_nonblocking_speak_returns_immediately() {
        /// Sink that sleeps to simulate slow playback.
        struct SlowSink;
        impl AudioSink for SlowSink {
            fn play(&self, _chunk: &AudioChunk) -> Result<(), VoiceError> {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            }
        }

        let speech = SpeechOutput::new(
            Arc::new(MockTtsProvider::new()),
            Arc::new(SlowSink),
            None,
            1.0,
        );
        let start = Instant::now();
        for _ in 0..5 {
            speech.speak("queued", false).await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
        speech.shutdown().await;
    }

    #[tokio::test]
    async fn test_blocking_speak_waits_for_playback() {
        let sink = Arc::new(CountingSink::new());
        let speech = SpeechOutput::new(
            Arc::new(MockTtsProvider::new()),
            sink.clone(),
            None,
            1.0,
        );
        speech.speak("done before return", true).await;
        assert_eq!(sink.lengths.lock().unwrap().len(), 1);
        speech.shutdown().await;
    }

    #[tokio::test]
    async fn test_recording_speech_transcript() {
        let speech = RecordingSpeech::new();
        speech.speak("first", false).await;
        speech.speak("second", true).await;
        assert_eq!(speech.transcript(), vec!["first", "second"]);
    }
}
