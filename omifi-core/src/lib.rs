//! Core library for the OMIFI voice assistant.
//!
//! OMIFI listens for a wake phrase ("hey omifi"), captures the command
//! spoken after it, and acts on the desktop: taking screenshots, sensing
//! the clipboard, reading stored clipboard content aloud, and opening the
//! most recent screenshot. Artifacts are persisted under `~/.omifi` and
//! exposed through a small JSON dashboard.
//!
//! The main pieces:
//!
//! - [`voice`]: audio capture, wake detection, transcription, speech
//!   output, and the session state machine.
//! - [`intent`]: tiered matching from utterances to commands.
//! - [`dispatch`]: the single-worker command queue and its handlers.
//! - [`capability`]: screenshot and clipboard backends, with null
//!   implementations for headless setups.
//! - [`storage`]: artifact files plus an atomic `metadata.json` index.
//! - [`assistant`]: wiring of all of the above.
//! - [`dashboard`]: the HTTP API.

pub mod assistant;
pub mod capability;
pub mod config;
pub mod dashboard;
pub mod dispatch;
pub mod error;
pub mod intent;
pub mod storage;
pub mod voice;

pub use assistant::Assistant;
pub use config::{load_config, AssistantConfig};
pub use error::{OmifiError, Result};
pub use intent::{Intent, IntentTable};
pub use storage::Storage;
