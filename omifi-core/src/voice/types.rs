//! Core audio and transcription types for the voice module.

use serde::{Deserialize, Serialize};

/// A chunk of captured or synthesized audio. Samples are always f32.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioChunk {
    /// Audio samples in f32 format (-1.0 to 1.0).
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 16000).
    pub sample_rate: u32,
    /// Number of channels (1 = mono).
    pub channels: u16,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// A silent chunk with the given number of samples.
    pub fn silence(sample_rate: u32, channels: u16, num_samples: usize) -> Self {
        Self::new(vec![0.0; num_samples], sample_rate, channels)
    }

    /// Duration of this chunk in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }

    /// Root mean square energy of the audio.
    pub fn rms_energy(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum_sq / self.samples.len() as f32).sqrt()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Result of a speech-to-text transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// The transcribed text.
    pub text: String,
    /// Overall confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Duration of the transcribed audio in seconds.
    pub duration_secs: f32,
}

impl TranscriptionResult {
    /// A transcription carrying only text, with full confidence.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: 1.0,
            duration_secs: 0.0,
        }
    }
}

impl Default for TranscriptionResult {
    fn default() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            duration_secs: 0.0,
        }
    }
}

/// A request to synthesize speech from text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    /// Optional voice name (provider default when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    /// Speech speed multiplier (1.0 = normal).
    pub speed: f32,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            speed: 1.0,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_chunk() {
        let chunk = AudioChunk::silence(16_000, 1, 480);
        assert_eq!(chunk.samples.len(), 480);
        assert!(!chunk.is_empty());
        assert!(chunk.rms_energy() < f32::EPSILON);
    }

    #[test]
    fn test_duration() {
        // 16000 samples at 16kHz mono = 1 second
        let chunk = AudioChunk::silence(16_000, 1, 16_000);
        assert!((chunk.duration_secs() - 1.0).abs() < 0.001);

        // Degenerate chunk does not divide by zero.
        let broken = AudioChunk::new(vec![0.0; 10], 0, 1);
        assert_eq!(broken.duration_secs(), 0.0);
    }

    #[test]
    fn test_rms_energy() {
        let chunk = AudioChunk::new(vec![0.5; 100], 16_000, 1);
        assert!((chunk.rms_energy() - 0.5).abs() < 0.001);

        let empty = AudioChunk::new(vec![], 16_000, 1);
        assert_eq!(empty.rms_energy(), 0.0);
    }

    #[test]
    fn test_synthesis_request_builder() {
        let req = SynthesisRequest::new("hello").with_voice("nova").with_speed(1.5);
        assert_eq!(req.text, "hello");
        assert_eq!(req.voice.as_deref(), Some("nova"));
        assert!((req.speed - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_transcription_from_text() {
        let t = TranscriptionResult::from_text("take a screenshot");
        assert_eq!(t.text, "take a screenshot");
        assert!((t.confidence - 1.0).abs() < f32::EPSILON);
    }
}
