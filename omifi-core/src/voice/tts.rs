//! Text-to-speech provider trait and implementations.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::audio_io::audio_convert;
use super::types::{AudioChunk, SynthesisRequest};
use crate::error::VoiceError;

/// Trait for text-to-speech providers.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize speech for a request.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioChunk, VoiceError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// A mock TTS provider for tests. Generates a sine wave whose length is
/// proportional to the text length, so ordering is observable downstream.
pub struct MockTtsProvider {
    call_count: AtomicUsize,
}

impl MockTtsProvider {
    pub fn new() -> Self {
        Self {
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Default for MockTtsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TtsProvider for MockTtsProvider {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioChunk, VoiceError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        let sample_rate = 16_000u32;
        let duration_secs = (request.text.len() as f32 * 0.01).max(0.01);
        let num_samples = (sample_rate as f32 * duration_secs) as usize;
        let samples: Vec<f32> = (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
            })
            .collect();

        Ok(AudioChunk::new(samples, sample_rate, 1))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// OpenAI TTS provider (HTTP, WAV response).
pub struct OpenAiTtsProvider {
    /// API key for authentication.
    pub api_key: String,
    /// Model name (e.g. "tts-1").
    pub model: String,
    /// Default voice name.
    pub voice: String,
    /// Base URL for the API.
    pub base_url: String,
}

impl OpenAiTtsProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "tts-1".to_string(),
            voice: "nova".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl TtsProvider for OpenAiTtsProvider {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioChunk, VoiceError> {
        let voice = request.voice.as_deref().unwrap_or(&self.voice);
        let url = format!("{}/audio/speech", self.base_url);

        let body = serde_json::json!({
            "model": self.model,
            "input": request.text,
            "voice": voice,
            "speed": request.speed,
            "response_format": "wav",
        });

        let response = reqwest::Client::new()
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::SynthesisFailed {
                message: format!("HTTP request failed: {e}"),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::SynthesisFailed {
                message: format!("API returned {status}: {body}"),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceError::SynthesisFailed {
                message: format!("failed to read response: {e}"),
            })?;

        audio_convert::decode_wav(&bytes)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generates_audio() {
        let mock = MockTtsProvider::new();
        let chunk = mock
            .synthesize(&SynthesisRequest::new("Hello, world!"))
            .await
            .unwrap();
        assert!(!chunk.is_empty());
        assert_eq!(chunk.sample_rate, 16_000);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_length_tracks_text_length() {
        let mock = MockTtsProvider::new();
        let short = mock
            .synthesize(&SynthesisRequest::new("hi"))
            .await
            .unwrap();
        let long = mock
            .synthesize(&SynthesisRequest::new("a considerably longer sentence"))
            .await
            .unwrap();
        assert!(long.samples.len() > short.samples.len());
    }

    #[test]
    fn test_openai_builder() {
        let provider = OpenAiTtsProvider::new("sk-test")
            .with_model("tts-1-hd")
            .with_voice("alloy")
            .with_base_url("https://custom.api.com/v1");
        assert_eq!(provider.model, "tts-1-hd");
        assert_eq!(provider.voice, "alloy");
        assert_eq!(provider.name(), "openai");
    }
}
