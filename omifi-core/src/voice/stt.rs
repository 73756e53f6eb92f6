//! Speech-to-text provider trait and implementations.
//!
//! Failures distinguish unintelligible audio (`VoiceError::Unintelligible`)
//! from an unreachable service (`VoiceError::ServiceUnreachable`); the voice
//! session treats both as retryable.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::audio_io::audio_convert;
use super::types::{AudioChunk, TranscriptionResult};
use crate::error::VoiceError;

/// Trait for speech-to-text providers.
#[async_trait]
pub trait SttProvider: Send + Sync {
    /// Transcribe an audio chunk to text.
    async fn transcribe(&self, audio: &AudioChunk) -> Result<TranscriptionResult, VoiceError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// A scripted STT provider for tests. Yields queued outcomes in order;
/// an exhausted script yields `Unintelligible`.
pub struct MockSttProvider {
    script: Mutex<Vec<Result<TranscriptionResult, VoiceError>>>,
    call_count: AtomicUsize,
}

impl MockSttProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn with_script(script: Vec<Result<TranscriptionResult, VoiceError>>) -> Self {
        Self {
            script: Mutex::new(script),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Convenience constructor: each text becomes one successful result.
    pub fn with_texts(texts: &[&str]) -> Self {
        Self::with_script(
            texts
                .iter()
                .map(|t| Ok(TranscriptionResult::from_text(*t)))
                .collect(),
        )
    }

    /// Number of times `transcribe` was called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Default for MockSttProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SttProvider for MockSttProvider {
    async fn transcribe(&self, _audio: &AudioChunk) -> Result<TranscriptionResult, VoiceError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Err(VoiceError::Unintelligible);
        }
        script.remove(0)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// OpenAI Whisper API-based STT provider (HTTP, no native deps).
pub struct OpenAiSttProvider {
    /// API key for authentication.
    pub api_key: String,
    /// Model name (e.g. "whisper-1").
    pub model: String,
    /// Language hint (e.g. "en").
    pub language: String,
    /// Base URL for the API.
    pub base_url: String,
}

impl OpenAiSttProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "whisper-1".to_string(),
            language: "en".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl SttProvider for OpenAiSttProvider {
    async fn transcribe(&self, audio: &AudioChunk) -> Result<TranscriptionResult, VoiceError> {
        if audio.is_empty() {
            return Err(VoiceError::Unintelligible);
        }

        let wav_bytes = audio_convert::encode_wav(audio)?;

        let part = reqwest::multipart::Part::bytes(wav_bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::TranscriptionFailed {
                message: format!("MIME error: {e}"),
            })?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "verbose_json".to_string());

        let url = format!("{}/audio/transcriptions", self.base_url);

        let response = reqwest::Client::new()
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    VoiceError::ServiceUnreachable {
                        message: e.to_string(),
                    }
                } else {
                    VoiceError::TranscriptionFailed {
                        message: format!("HTTP request failed: {e}"),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::TranscriptionFailed {
                message: format!("API returned {status}: {body}"),
            });
        }

        let json: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| VoiceError::TranscriptionFailed {
                    message: format!("JSON parse error: {e}"),
                })?;

        let text = json["text"].as_str().unwrap_or("").trim().to_string();
        if text.is_empty() {
            return Err(VoiceError::Unintelligible);
        }
        let duration = json["duration"].as_f64().unwrap_or(0.0) as f32;

        Ok(TranscriptionResult {
            text,
            // The API does not report per-result confidence.
            confidence: 1.0,
            duration_secs: duration,
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_yields_script_in_order() {
        let mock = MockSttProvider::with_texts(&["hey omifi", "take a screenshot"]);
        let chunk = AudioChunk::silence(16_000, 1, 480);

        assert_eq!(mock.transcribe(&chunk).await.unwrap().text, "hey omifi");
        assert_eq!(
            mock.transcribe(&chunk).await.unwrap().text,
            "take a screenshot"
        );
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_exhausted_is_unintelligible() {
        let mock = MockSttProvider::new();
        let chunk = AudioChunk::silence(16_000, 1, 480);
        let err = mock.transcribe(&chunk).await.unwrap_err();
        assert!(matches!(err, VoiceError::Unintelligible));
    }

    #[tokio::test]
    async fn test_mock_scripted_error() {
        let mock = MockSttProvider::with_script(vec![Err(VoiceError::ServiceUnreachable {
            message: "offline".into(),
        })]);
        let chunk = AudioChunk::silence(16_000, 1, 480);
        let err = mock.transcribe(&chunk).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_openai_rejects_empty_audio() {
        let provider = OpenAiSttProvider::new("sk-test");
        let empty = AudioChunk::new(vec![], 16_000, 1);
        let err = provider.transcribe(&empty).await.unwrap_err();
        assert!(matches!(err, VoiceError::Unintelligible));
    }

    #[test]
    fn test_openai_builder() {
        let provider = OpenAiSttProvider::new("sk-test")
            .with_model("whisper-1")
            .with_language("fr")
            .with_base_url("https://custom.api.com/v1");
        assert_eq!(provider.language, "fr");
        assert_eq!(provider.base_url, "https://custom.api.com/v1");
        assert_eq!(provider.name(), "openai");
    }
}
