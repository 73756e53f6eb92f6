//! Audio I/O: capture sources, playback sinks, and format conversion.
//!
//! The `AudioSource` / `AudioSink` traits and their mocks are always
//! available; the cpal-backed implementations require the `audio` feature.
//! Capture acquires the input device for the duration of one call only and
//! releases it before returning, so other audio consumers are not starved.

use async_trait::async_trait;
use std::sync::Mutex;

use super::types::AudioChunk;
use crate::error::VoiceError;

/// WAV and sample-format conversion helpers.
pub mod audio_convert {
    use super::*;

    /// Convert f32 samples (-1.0..1.0) to i16.
    pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
        samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect()
    }

    /// Convert i16 samples to f32 (-1.0..1.0).
    pub fn i16_to_f32(samples: &[i16]) -> Vec<f32> {
        samples.iter().map(|&s| s as f32 / i16::MAX as f32).collect()
    }

    /// Downmix interleaved multi-channel samples to mono by averaging frames.
    pub fn downmix_mono(samples: &[f32], channels: u16) -> Vec<f32> {
        if channels <= 1 {
            return samples.to_vec();
        }
        samples
            .chunks(channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }

    /// Resample audio using linear interpolation.
    pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
        if from_rate == to_rate || samples.is_empty() {
            return samples.to_vec();
        }
        let ratio = from_rate as f64 / to_rate as f64;
        let out_len = ((samples.len() as f64) / ratio).ceil() as usize;
        let mut out = Vec::with_capacity(out_len);
        for i in 0..out_len {
            let src_pos = i as f64 * ratio;
            let idx = src_pos as usize;
            let frac = (src_pos - idx as f64) as f32;
            if idx + 1 < samples.len() {
                out.push(samples[idx] * (1.0 - frac) + samples[idx + 1] * frac);
            } else if idx < samples.len() {
                out.push(samples[idx]);
            }
        }
        out
    }

    /// Encode an `AudioChunk` to 16-bit PCM WAV bytes.
    pub fn encode_wav(chunk: &AudioChunk) -> Result<Vec<u8>, VoiceError> {
        let spec = hound::WavSpec {
            channels: chunk.channels,
            sample_rate: chunk.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let wav_err = |e: hound::Error| VoiceError::UnsupportedFormat {
            format: format!("WAV encode: {e}"),
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(wav_err)?;
            for sample in f32_to_i16(&chunk.samples) {
                writer.write_sample(sample).map_err(wav_err)?;
            }
            writer.finalize().map_err(wav_err)?;
        }
        Ok(cursor.into_inner())
    }

    /// Decode WAV bytes to an `AudioChunk`.
    pub fn decode_wav(data: &[u8]) -> Result<AudioChunk, VoiceError> {
        let wav_err = |e: hound::Error| VoiceError::UnsupportedFormat {
            format: format!("WAV decode: {e}"),
        };
        let mut reader = hound::WavReader::new(std::io::Cursor::new(data)).map_err(wav_err)?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max_val = (1i32 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(wav_err)?
            }
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(wav_err)?,
        };

        Ok(AudioChunk::new(samples, spec.sample_rate, spec.channels))
    }
}

/// One-shot microphone capture.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Capture up to `max_secs` of audio. The device is held only for the
    /// duration of this call.
    async fn capture(&self, max_secs: f32) -> Result<AudioChunk, VoiceError>;
}

/// Blocking audio playback. Returns once the audio has finished playing.
pub trait AudioSink: Send + Sync {
    fn play(&self, chunk: &AudioChunk) -> Result<(), VoiceError>;
}

/// A scripted audio source for tests. Yields queued results in order;
/// an exhausted script yields silence.
pub struct MockAudioSource {
    script: Mutex<Vec<Result<AudioChunk, VoiceError>>>,
    sample_rate: u32,
}

impl MockAudioSource {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            sample_rate: 16_000,
        }
    }

    pub fn with_script(script: Vec<Result<AudioChunk, VoiceError>>) -> Self {
        Self {
            script: Mutex::new(script),
            sample_rate: 16_000,
        }
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSource for MockAudioSource {
    async fn capture(&self, max_secs: f32) -> Result<AudioChunk, VoiceError> {
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            let samples = (self.sample_rate as f32 * max_secs.max(0.0)) as usize;
            return Ok(AudioChunk::silence(self.sample_rate, 1, samples.min(1024)));
        }
        script.remove(0)
    }
}

/// A sink that drops audio. Used by the degraded speech channel and tests.
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&self, _chunk: &AudioChunk) -> Result<(), VoiceError> {
        Ok(())
    }
}

/// cpal-backed microphone capture (requires the `audio` feature).
#[cfg(feature = "audio")]
pub struct CpalAudioSource {
    /// Input device name (None = system default).
    pub device_name: Option<String>,
    /// Sample rate the captured audio is resampled to.
    pub target_rate: u32,
}

#[cfg(feature = "audio")]
impl CpalAudioSource {
    pub fn new(device_name: Option<String>, target_rate: u32) -> Self {
        Self {
            device_name,
            target_rate,
        }
    }
}

#[cfg(feature = "audio")]
#[async_trait]
impl AudioSource for CpalAudioSource {
    async fn capture(&self, max_secs: f32) -> Result<AudioChunk, VoiceError> {
        let device_name = self.device_name.clone();
        let target_rate = self.target_rate;
        tokio::task::spawn_blocking(move || {
            cpal_backend::capture_blocking(device_name, target_rate, max_secs)
        })
        .await
        .map_err(|e| VoiceError::MicUnavailable {
            message: format!("capture task failed: {e}"),
        })?
    }
}

/// cpal-backed speaker playback (requires the `audio` feature).
#[cfg(feature = "audio")]
pub struct CpalSink {
    /// Output device name (None = system default).
    pub device_name: Option<String>,
}

#[cfg(feature = "audio")]
impl CpalSink {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }
}

#[cfg(feature = "audio")]
impl AudioSink for CpalSink {
    fn play(&self, chunk: &AudioChunk) -> Result<(), VoiceError> {
        cpal_backend::play_blocking(self.device_name.as_deref(), chunk)
    }
}

#[cfg(feature = "audio")]
mod cpal_backend {
    use super::audio_convert;
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::sync::Arc;
    use std::time::Duration;

    fn mic_err(message: impl std::fmt::Display) -> VoiceError {
        VoiceError::MicUnavailable {
            message: message.to_string(),
        }
    }

    fn backend_err(message: impl std::fmt::Display) -> VoiceError {
        VoiceError::BackendUnavailable {
            message: message.to_string(),
        }
    }

    fn find_input_device(name: Option<&str>) -> Result<cpal::Device, VoiceError> {
        let host = cpal::default_host();
        match name {
            Some(wanted) => host
                .input_devices()
                .map_err(mic_err)?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| mic_err(format!("input device not found: {wanted}"))),
            None => host
                .default_input_device()
                .ok_or_else(|| mic_err("no default input device")),
        }
    }

    fn find_output_device(name: Option<&str>) -> Result<cpal::Device, VoiceError> {
        let host = cpal::default_host();
        match name {
            Some(wanted) => host
                .output_devices()
                .map_err(backend_err)?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| backend_err(format!("output device not found: {wanted}"))),
            None => host
                .default_output_device()
                .ok_or_else(|| backend_err("no default output device")),
        }
    }

    pub fn capture_blocking(
        device_name: Option<String>,
        target_rate: u32,
        max_secs: f32,
    ) -> Result<AudioChunk, VoiceError> {
        let device = find_input_device(device_name.as_deref())?;
        let supported = device.default_input_config().map_err(mic_err)?;
        let device_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let config: cpal::StreamConfig = supported.config();

        let buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let err_cb = |e: cpal::StreamError| {
            tracing::warn!(error = %e, "input stream error");
        };

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                let buf = buffer.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        buf.lock().unwrap().extend_from_slice(data);
                    },
                    err_cb,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let buf = buffer.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        buf.lock()
                            .unwrap()
                            .extend(audio_convert::i16_to_f32(data));
                    },
                    err_cb,
                    None,
                )
            }
            other => {
                return Err(VoiceError::UnsupportedFormat {
                    format: format!("{other:?}"),
                })
            }
        }
        .map_err(mic_err)?;

        stream.play().map_err(mic_err)?;
        std::thread::sleep(Duration::from_secs_f32(max_secs.max(0.0)));
        // Dropping the stream releases the input device.
        drop(stream);

        let raw = std::mem::take(&mut *buffer.lock().unwrap());
        let mono = audio_convert::downmix_mono(&raw, channels);
        let samples = audio_convert::resample(&mono, device_rate, target_rate);
        Ok(AudioChunk::new(samples, target_rate, 1))
    }

    pub fn play_blocking(device_name: Option<&str>, chunk: &AudioChunk) -> Result<(), VoiceError> {
        if chunk.is_empty() {
            return Ok(());
        }
        let device = find_output_device(device_name)?;
        let supported = device.default_output_config().map_err(backend_err)?;
        let device_rate = supported.sample_rate().0;
        let out_channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.config();

        let mono = audio_convert::downmix_mono(&chunk.samples, chunk.channels);
        let samples = Arc::new(audio_convert::resample(&mono, chunk.sample_rate, device_rate));
        let duration_secs = samples.len() as f32 / device_rate as f32;
        let position = Arc::new(Mutex::new(0usize));

        let stream = {
            let samples = samples.clone();
            let position = position.clone();
            device
                .build_output_stream(
                    &config,
                    move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let mut pos = position.lock().unwrap();
                        for frame in out.chunks_mut(out_channels) {
                            let value = samples.get(*pos).copied().unwrap_or(0.0);
                            for slot in frame.iter_mut() {
                                *slot = value;
                            }
                            *pos += 1;
                        }
                    },
                    |e: cpal::StreamError| {
                        tracing::warn!(error = %e, "output stream error");
                    },
                    None,
                )
                .map_err(backend_err)?
        };

        stream.play().map_err(backend_err)?;
        std::thread::sleep(Duration::from_secs_f32(duration_secs + 0.1));
        drop(stream);
        Ok(())
    }
}
