//! Assistant configuration.
//!
//! Uses `figment` for layered configuration: defaults -> config file ->
//! `OMIFI_` environment variables. The default config file lives next to
//! the artifact store at `~/.omifi/config.toml`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration for the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Wake phrase that switches the loop into command capture.
    pub wake_phrase: String,
    pub voice: VoiceConfig,
    pub storage: StorageConfig,
    pub dashboard: DashboardConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            wake_phrase: "hey omifi".to_string(),
            voice: VoiceConfig::default(),
            storage: StorageConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

/// Configuration for the voice session and speech output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Whether the voice session is started at all.
    pub enabled: bool,
    /// STT provider: "openai" or "mock".
    pub stt_provider: String,
    /// Language hint for STT (e.g. "en").
    pub stt_language: String,
    /// TTS provider: "openai" or "mock".
    pub tts_provider: String,
    /// TTS voice name.
    pub tts_voice: String,
    /// TTS speech speed multiplier.
    pub tts_speed: f32,
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Maximum length of one wake-listen capture in seconds.
    pub wake_listen_secs: u64,
    /// Maximum length of the command sub-listen in seconds.
    pub command_listen_secs: u64,
    /// Backoff after a transient capture/transcription failure, in ms.
    pub retry_backoff_ms: u64,
    /// Poll interval while paused, in ms.
    pub paused_poll_ms: u64,
    /// Audio input device name (None = system default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
    /// Audio output device name (None = system default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stt_provider: "openai".to_string(),
            stt_language: "en".to_string(),
            tts_provider: "openai".to_string(),
            tts_voice: "nova".to_string(),
            tts_speed: 1.0,
            sample_rate: 16_000,
            wake_listen_secs: 5,
            command_listen_secs: 10,
            retry_backoff_ms: 1_000,
            paused_poll_ms: 500,
            input_device: None,
            output_device: None,
        }
    }
}

/// Configuration for artifact storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for screenshots, clipboard snippets, and metadata.
    /// Defaults to `~/.omifi`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { base_dir: None }
    }
}

/// Configuration for the companion web dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub enabled: bool,
    /// Address the dashboard listens on.
    pub bind_addr: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: "127.0.0.1:5000".to_string(),
        }
    }
}

impl AssistantConfig {
    /// Resolve the storage base directory, falling back to `~/.omifi`.
    pub fn storage_dir(&self) -> std::result::Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.storage.base_dir {
            return Ok(dir.clone());
        }
        directories::UserDirs::new()
            .map(|d| d.home_dir().join(".omifi"))
            .ok_or(ConfigError::NoHomeDir)
    }
}

/// Load configuration: defaults -> config file -> `OMIFI_` env vars.
///
/// When `path` is given the file must exist; otherwise `~/.omifi/config.toml`
/// is merged only if present.
pub fn load_config(path: Option<&Path>) -> std::result::Result<AssistantConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AssistantConfig::default()));

    match path {
        Some(explicit) => {
            if !explicit.exists() {
                return Err(ConfigError::FileNotFound {
                    path: explicit.to_path_buf(),
                });
            }
            figment = figment.merge(Toml::file(explicit));
        }
        None => {
            if let Some(dirs) = directories::UserDirs::new() {
                let default_file = dirs.home_dir().join(".omifi").join("config.toml");
                if default_file.exists() {
                    figment = figment.merge(Toml::file(default_file));
                }
            }
        }
    }

    figment = figment.merge(Env::prefixed("OMIFI_").split("__"));

    figment.extract().map_err(|e| ConfigError::Invalid {
        message: e.to_string(),
    })
}
