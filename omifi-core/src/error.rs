//! Error types for the OMIFI core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering the voice, storage, configuration, and capability domains.

use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OmifiError>;

/// Top-level error type for the OMIFI core library.
#[derive(Debug, thiserror::Error)]
pub enum OmifiError {
    #[error("voice error: {0}")]
    Voice(#[from] VoiceError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from audio capture, transcription, and speech synthesis.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// Audio was captured but could not be turned into text.
    #[error("speech was unintelligible")]
    Unintelligible,

    /// The transcription service could not be reached.
    #[error("transcription service unreachable: {message}")]
    ServiceUnreachable { message: String },

    /// The transcription service answered but the request failed.
    #[error("transcription failed: {message}")]
    TranscriptionFailed { message: String },

    /// The microphone or input backend could not be acquired.
    #[error("microphone unavailable: {message}")]
    MicUnavailable { message: String },

    /// A listen window elapsed without producing a command.
    #[error("listening timed out after {timeout_secs}s")]
    ListenTimeout { timeout_secs: u64 },

    #[error("speech synthesis failed: {message}")]
    SynthesisFailed { message: String },

    /// The playback backend is missing or could not be opened.
    #[error("audio backend unavailable: {message}")]
    BackendUnavailable { message: String },

    #[error("unsupported audio format: {format}")]
    UnsupportedFormat { format: String },
}

impl VoiceError {
    /// Whether the voice session loop should retry after this error
    /// instead of treating it as fatal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VoiceError::Unintelligible
                | VoiceError::ServiceUnreachable { .. }
                | VoiceError::MicUnavailable { .. }
                | VoiceError::ListenTimeout { .. }
        )
    }
}

/// Errors from the artifact storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage directory could not be created: {path}")]
    DirectoryCreate { path: PathBuf },

    #[error("metadata read failed at {path}: {message}")]
    MetadataRead { path: PathBuf, message: String },

    #[error("metadata write failed at {path}: {message}")]
    MetadataWrite { path: PathBuf, message: String },

    #[error("artifact write failed at {path}: {message}")]
    ArtifactWrite { path: PathBuf, message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },

    #[error("home directory could not be determined")]
    NoHomeDir,
}

/// Errors from the screenshot and clipboard capabilities.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// The capability was not registered at construction time.
    #[error("capability not available: {name}")]
    Unavailable { name: String },

    #[error("screenshot capture failed: {message}")]
    CaptureFailed { message: String },

    #[error("clipboard access failed: {message}")]
    ClipboardFailed { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(VoiceError::Unintelligible.is_transient());
        assert!(VoiceError::ServiceUnreachable {
            message: "dns".into()
        }
        .is_transient());
        assert!(VoiceError::MicUnavailable {
            message: "busy".into()
        }
        .is_transient());
        assert!(VoiceError::ListenTimeout { timeout_secs: 5 }.is_transient());
        assert!(!VoiceError::SynthesisFailed {
            message: "bad voice".into()
        }
        .is_transient());
    }

    #[test]
    fn test_error_conversion_chain() {
        fn inner() -> std::result::Result<(), VoiceError> {
            Err(VoiceError::Unintelligible)
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        let err = outer().unwrap_err();
        assert!(matches!(err, OmifiError::Voice(VoiceError::Unintelligible)));
    }

    #[test]
    fn test_error_display() {
        let err = CapabilityError::Unavailable {
            name: "screenshot".into(),
        };
        assert_eq!(err.to_string(), "capability not available: screenshot");
    }
}
