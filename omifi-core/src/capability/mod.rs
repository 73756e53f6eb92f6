//! Desktop capabilities: screenshot capture and clipboard access.
//!
//! Capabilities are injected as trait objects. When a platform backend is
//! missing, the null implementations stand in so the rest of the assistant
//! never has to special-case absence.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CapabilityError;

pub mod clipboard;
pub mod screenshot;

pub use clipboard::{detect_kind, ArboardClipboard};
pub use screenshot::CommandScreenshot;

/// Classification of sensed clipboard content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipKind {
    Text,
    Url,
    Json,
    Code,
    Image,
}

/// Screen capture and viewing.
pub trait ScreenshotCapability: Send + Sync {
    fn is_available(&self) -> bool;

    /// Capture the screen, persist it, and return the stored path.
    fn take_screenshot(&self) -> Result<PathBuf, CapabilityError>;

    /// Open the most recent screenshot in the platform viewer. Returns
    /// `Ok(false)` when no screenshot exists yet.
    fn open_last_screenshot(&self) -> Result<bool, CapabilityError>;
}

/// Clipboard sensing.
pub trait ClipboardCapability: Send + Sync {
    fn is_available(&self) -> bool;

    /// Read the current clipboard. `Ok(None)` when it is empty. Image
    /// content is returned base64-encoded as PNG.
    fn sense_clipboard(&self) -> Result<Option<(ClipKind, String)>, CapabilityError>;
}

/// Screenshot null object: reports unavailable, errors on use.
pub struct NullScreenshot;

impl ScreenshotCapability for NullScreenshot {
    fn is_available(&self) -> bool {
        false
    }

    fn take_screenshot(&self) -> Result<PathBuf, CapabilityError> {
        Err(CapabilityError::Unavailable {
            name: "screenshot".to_string(),
        })
    }

    fn open_last_screenshot(&self) -> Result<bool, CapabilityError> {
        Err(CapabilityError::Unavailable {
            name: "screenshot".to_string(),
        })
    }
}

/// Clipboard null object.
pub struct NullClipboard;

impl ClipboardCapability for NullClipboard {
    fn is_available(&self) -> bool {
        false
    }

    fn sense_clipboard(&self) -> Result<Option<(ClipKind, String)>, CapabilityError> {
        Err(CapabilityError::Unavailable {
            name: "clipboard".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_screenshot() {
        let screenshot = NullScreenshot;
        assert!(!screenshot.is_available());
        assert!(matches!(
            screenshot.take_screenshot(),
            Err(CapabilityError::Unavailable { .. })
        ));
        assert!(matches!(
            screenshot.open_last_screenshot(),
            Err(CapabilityError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_null_clipboard() {
        let clipboard = NullClipboard;
        assert!(!clipboard.is_available());
        assert!(matches!(
            clipboard.sense_clipboard(),
            Err(CapabilityError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_clip_kind_serde_names() {
        assert_eq!(serde_json::to_string(&ClipKind::Url).unwrap(), "\"url\"");
        assert_eq!(
            serde_json::from_str::<ClipKind>("\"image\"").unwrap(),
            ClipKind::Image
        );
    }
}
