//! Command dispatch.
//!
//! A single worker drains the command queue, so commands execute strictly
//! in arrival order. Each handler follows the spoken acknowledgement
//! pattern: announce the action, do it, then report the outcome. Handler
//! failures are spoken and logged; they never take the worker down.

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::capability::{ClipboardCapability, ScreenshotCapability};
use crate::error::CapabilityError;
use crate::intent::{Intent, IntentTable};
use crate::storage::Storage;
use crate::voice::SpeechChannel;

/// How much clipboard text gets read aloud before truncation.
const READ_ALOUD_MAX_CHARS: usize = 200;

pub struct CommandDispatcher {
    intents: IntentTable,
    speech: Arc<dyn SpeechChannel>,
    storage: Arc<Storage>,
    screenshot: Arc<dyn ScreenshotCapability>,
    clipboard: Arc<dyn ClipboardCapability>,
    /// Last sensed clipboard content, for skipping unchanged saves.
    last_clip: Mutex<Option<String>>,
}

impl CommandDispatcher {
    pub fn new(
        speech: Arc<dyn SpeechChannel>,
        storage: Arc<Storage>,
        screenshot: Arc<dyn ScreenshotCapability>,
        clipboard: Arc<dyn ClipboardCapability>,
    ) -> Self {
        Self {
            intents: IntentTable::new(),
            speech,
            storage,
            screenshot,
            clipboard,
            last_clip: Mutex::new(None),
        }
    }

    /// Execute one utterance. Returns whether the command was understood
    /// and completed.
    pub async fn dispatch(&self, utterance: &str) -> bool {
        let Some(intent) = self.intents.resolve(utterance) else {
            info!(text = %utterance, "utterance did not match any command");
            self.speech
                .speak("I'm sorry, I didn't understand that.", false)
                .await;
            return false;
        };
        info!(text = %utterance, intent = intent.label(), "dispatching command");

        match intent {
            Intent::TakeScreenshot => self.handle_take_screenshot().await,
            Intent::SenseClipboard => self.handle_sense_clipboard().await,
            Intent::ReadClipboard => self.handle_read_clipboard().await,
            Intent::OpenLastScreenshot => self.handle_open_last_screenshot().await,
            Intent::Help => self.handle_help().await,
        }
    }

    async fn handle_take_screenshot(&self) -> bool {
        if !self.screenshot.is_available() {
            self.speech
                .speak("Screenshot capability is not available.", false)
                .await;
            return false;
        }
        self.speech.speak("Taking a screenshot", false).await;

        let screenshot = self.screenshot.clone();
        let result = tokio::task::spawn_blocking(move || screenshot.take_screenshot()).await;
        match result {
            Ok(Ok(path)) => {
                debug!(path = %path.display(), "screenshot handler finished");
                self.speech.speak("Screenshot saved", false).await;
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "screenshot capture failed");
                self.speech.speak("Failed to take screenshot", false).await;
                false
            }
            Err(e) => {
                error!(error = %e, "screenshot task failed");
                self.speech.speak("Failed to take screenshot", false).await;
                false
            }
        }
    }

    async fn handle_sense_clipboard(&self) -> bool {
        if !self.clipboard.is_available() {
            self.speech
                .speak("Clipboard capability is not available.", false)
                .await;
            return false;
        }
        self.speech.speak("Checking clipboard", false).await;

        let clipboard = self.clipboard.clone();
        let sensed = tokio::task::spawn_blocking(move || clipboard.sense_clipboard()).await;
        let sensed = match sensed {
            Ok(Ok(sensed)) => sensed,
            Ok(Err(e)) => {
                warn!(error = %e, "clipboard sense failed");
                self.speech.speak("Failed to check clipboard", false).await;
                return false;
            }
            Err(e) => {
                error!(error = %e, "clipboard task failed");
                self.speech.speak("Failed to check clipboard", false).await;
                return false;
            }
        };

        let Some((kind, content)) = sensed else {
            self.speech
                .speak("No clipboard content found", false)
                .await;
            return false;
        };

        let unchanged = {
            let mut last = self.last_clip.lock().unwrap();
            if last.as_deref() == Some(content.as_str()) {
                true
            } else {
                *last = Some(content.clone());
                false
            }
        };
        if unchanged {
            debug!("clipboard content unchanged since last sense");
            self.speech
                .speak("Clipboard content unchanged", false)
                .await;
            return true;
        }

        match self.storage.save_clipboard_content(&content, kind) {
            Ok(path) => {
                debug!(path = %path.display(), ?kind, "clipboard handler finished");
                self.speech.speak("Clipboard content saved", false).await;
                true
            }
            Err(e) => {
                error!(error = %e, "clipboard save failed");
                self.speech
                    .speak("Failed to save clipboard content", false)
                    .await;
                false
            }
        }
    }

    async fn handle_read_clipboard(&self) -> bool {
        match self.storage.get_last_clipboard_content() {
            Ok(Some(content)) => {
                let mut preview: String = content.chars().take(READ_ALOUD_MAX_CHARS).collect();
                if content.chars().count() > READ_ALOUD_MAX_CHARS {
                    preview.push_str("... and more");
                }
                self.speech
                    .speak(&format!("Clipboard contains: {preview}"), false)
                    .await;
                true
            }
            Ok(None) => {
                self.speech
                    .speak("No clipboard content available", false)
                    .await;
                false
            }
            Err(e) => {
                error!(error = %e, "clipboard read failed");
                self.speech
                    .speak("Failed to read clipboard content", false)
                    .await;
                false
            }
        }
    }

    async fn handle_open_last_screenshot(&self) -> bool {
        self.speech
            .speak("Opening the last screenshot", false)
            .await;

        let screenshot = self.screenshot.clone();
        let result = tokio::task::spawn_blocking(move || screenshot.open_last_screenshot()).await;
        match result {
            Ok(Ok(true)) => true,
            Ok(Ok(false)) => {
                self.speech.speak("No screenshot available", false).await;
                false
            }
            Ok(Err(CapabilityError::Unavailable { .. })) => {
                self.speech
                    .speak("Screenshot capability is not available.", false)
                    .await;
                false
            }
            Ok(Err(e)) => {
                warn!(error = %e, "opening screenshot failed");
                self.speech.speak("Failed to open screenshot", false).await;
                false
            }
            Err(e) => {
                error!(error = %e, "open screenshot task failed");
                self.speech.speak("Failed to open screenshot", false).await;
                false
            }
        }
    }

    async fn handle_help(&self) -> bool {
        self.speech
            .speak(
                "I can take screenshots, sense your clipboard, read clipboard \
                 contents aloud, and open the last screenshot. Try saying: \
                 take a screenshot, sense clipboard, read clipboard, or open \
                 last screenshot.",
                false,
            )
            .await;
        true
    }
}

/// Background worker that drains the command queue in FIFO order. The
/// worker exits once every sender is dropped and the queue runs dry.
pub struct DispatchWorker {
    handle: JoinHandle<()>,
}

impl DispatchWorker {
    pub fn spawn(
        dispatcher: Arc<CommandDispatcher>,
        mut commands: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            while let Some(utterance) = commands.recv().await {
                dispatcher.dispatch(&utterance).await;
            }
            debug!("command queue closed, dispatch worker exiting");
        });
        Self { handle }
    }

    /// Wait for the worker to drain the queue and exit.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ClipKind, NullClipboard, NullScreenshot};
    use crate::voice::RecordingSpeech;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct FixedScreenshot {
        path: PathBuf,
        fail: bool,
    }

    impl ScreenshotCapability for FixedScreenshot {
        fn is_available(&self) -> bool {
            true
        }

        fn take_screenshot(&self) -> Result<PathBuf, CapabilityError> {
            if self.fail {
                Err(CapabilityError::CaptureFailed {
                    message: "display asleep".into(),
                })
            } else {
                Ok(self.path.clone())
            }
        }

        fn open_last_screenshot(&self) -> Result<bool, CapabilityError> {
            Ok(!self.fail)
        }
    }

    struct FixedClipboard {
        content: Option<(ClipKind, String)>,
    }

    impl ClipboardCapability for FixedClipboard {
        fn is_available(&self) -> bool {
            true
        }

        fn sense_clipboard(&self) -> Result<Option<(ClipKind, String)>, CapabilityError> {
            Ok(self.content.clone())
        }
    }

    struct Fixture {
        speech: Arc<RecordingSpeech>,
        storage: Arc<Storage>,
        _dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            Self {
                speech: Arc::new(RecordingSpeech::new()),
                storage: Arc::new(Storage::new(dir.path().join("omifi")).unwrap()),
                _dir: dir,
            }
        }

        fn dispatcher(
            &self,
            screenshot: Arc<dyn ScreenshotCapability>,
            clipboard: Arc<dyn ClipboardCapability>,
        ) -> CommandDispatcher {
            CommandDispatcher::new(
                self.speech.clone(),
                self.storage.clone(),
                screenshot,
                clipboard,
            )
        }
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(Arc::new(NullScreenshot), Arc::new(NullClipboard));
        assert!(!dispatcher.dispatch("what time is it").await);
        assert_eq!(
            fx.speech.transcript(),
            vec!["I'm sorry, I didn't understand that."]
        );
    }

    #[tokio::test]
    async fn test_take_screenshot_success() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(
            Arc::new(FixedScreenshot {
                path: PathBuf::from("/tmp/shot.png"),
                fail: false,
            }),
            Arc::new(NullClipboard),
        );
        assert!(dispatcher.dispatch("take a screenshot").await);
        assert_eq!(
            fx.speech.transcript(),
            vec!["Taking a screenshot", "Screenshot saved"]
        );
    }

    #[tokio::test]
    async fn test_take_screenshot_failure() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(
            Arc::new(FixedScreenshot {
                path: PathBuf::new(),
                fail: true,
            }),
            Arc::new(NullClipboard),
        );
        assert!(!dispatcher.dispatch("take a screenshot").await);
        assert_eq!(
            fx.speech.transcript(),
            vec!["Taking a screenshot", "Failed to take screenshot"]
        );
    }

    #[tokio::test]
    async fn test_unavailable_screenshot_skips_announcement() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(Arc::new(NullScreenshot), Arc::new(NullClipboard));
        assert!(!dispatcher.dispatch("take a screenshot").await);
        assert_eq!(
            fx.speech.transcript(),
            vec!["Screenshot capability is not available."]
        );
    }

    #[tokio::test]
    async fn test_sense_clipboard_empty() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(
            Arc::new(NullScreenshot),
            Arc::new(FixedClipboard { content: None }),
        );
        assert!(!dispatcher.dispatch("sense clipboard").await);
        assert_eq!(
            fx.speech.transcript(),
            vec!["Checking clipboard", "No clipboard content found"]
        );
    }

    #[tokio::test]
    async fn test_sense_clipboard_saves_then_skips_unchanged() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(
            Arc::new(NullScreenshot),
            Arc::new(FixedClipboard {
                content: Some((ClipKind::Text, "hello clipboard".to_string())),
            }),
        );

        assert!(dispatcher.dispatch("sense clipboard").await);
        assert!(dispatcher.dispatch("check clipboard").await);

        assert_eq!(
            fx.speech.transcript(),
            vec![
                "Checking clipboard",
                "Clipboard content saved",
                "Checking clipboard",
                "Clipboard content unchanged",
            ]
        );
        // Only one artifact was written.
        assert_eq!(fx.storage.recent_clipboard(10).len(), 1);
    }

    #[tokio::test]
    async fn test_read_clipboard_truncates_long_content() {
        let fx = Fixture::new();
        let long = "x".repeat(450);
        fx.storage
            .save_clipboard_content(&long, ClipKind::Text)
            .unwrap();
        let dispatcher = fx.dispatcher(Arc::new(NullScreenshot), Arc::new(NullClipboard));

        assert!(dispatcher.dispatch("read the clipboard").await);
        let spoken = &fx.speech.transcript()[0];
        assert!(spoken.starts_with("Clipboard contains: "));
        assert!(spoken.ends_with("... and more"));
        assert!(spoken.len() < 450);
    }

    #[tokio::test]
    async fn test_read_clipboard_empty() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(Arc::new(NullScreenshot), Arc::new(NullClipboard));
        assert!(!dispatcher.dispatch("read clipboard").await);
        assert_eq!(fx.speech.transcript(), vec!["No clipboard content available"]);
    }

    #[tokio::test]
    async fn test_open_last_screenshot_none_available() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(
            Arc::new(FixedScreenshot {
                path: PathBuf::new(),
                fail: true,
            }),
            Arc::new(NullClipboard),
        );
        assert!(!dispatcher.dispatch("open last screenshot").await);
        assert_eq!(
            fx.speech.transcript(),
            vec!["Opening the last screenshot", "No screenshot available"]
        );
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let fx = Fixture::new();
        let dispatcher = fx.dispatcher(Arc::new(NullScreenshot), Arc::new(NullClipboard));
        assert!(dispatcher.dispatch("what can you do").await);
        let spoken = &fx.speech.transcript()[0];
        assert!(spoken.contains("take a screenshot"));
        assert!(spoken.contains("sense clipboard"));
    }

    #[tokio::test]
    async fn test_worker_drains_in_order_then_exits() {
        let fx = Fixture::new();
        let dispatcher = Arc::new(fx.dispatcher(
            Arc::new(FixedScreenshot {
                path: PathBuf::from("/tmp/shot.png"),
                fail: false,
            }),
            Arc::new(NullClipboard),
        ));
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = DispatchWorker::spawn(dispatcher, rx);

        tx.send("take a screenshot".to_string()).unwrap();
        tx.send("help".to_string()).unwrap();
        drop(tx);
        worker.join().await;

        let transcript = fx.speech.transcript();
        assert_eq!(transcript[0], "Taking a screenshot");
        assert_eq!(transcript[1], "Screenshot saved");
        assert!(transcript[2].contains("take screenshots"));
    }
}
