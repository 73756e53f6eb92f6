//! Clipboard sensing backed by the system clipboard.

use base64::Engine as _;
use tracing::debug;

use super::{ClipKind, ClipboardCapability};
use crate::error::CapabilityError;

/// Classify clipboard text. Checks go from most to least specific; plain
/// text is the catch-all.
pub fn detect_kind(content: &str) -> ClipKind {
    let trimmed = content.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return ClipKind::Url;
    }
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
    {
        return ClipKind::Json;
    }
    const CODE_MARKERS: &[&str] = &[
        "fn ", "def ", "class ", "function ", "import ", "#include", "=> {", "};",
    ];
    if CODE_MARKERS.iter().any(|m| trimmed.contains(m)) {
        return ClipKind::Code;
    }
    ClipKind::Text
}

/// System clipboard capability. A clipboard handle is opened per call and
/// dropped immediately, so the assistant never holds the clipboard open.
pub struct ArboardClipboard;

impl ArboardClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ArboardClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardCapability for ArboardClipboard {
    fn is_available(&self) -> bool {
        arboard::Clipboard::new().is_ok()
    }

    fn sense_clipboard(&self) -> Result<Option<(ClipKind, String)>, CapabilityError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| CapabilityError::ClipboardFailed {
                message: e.to_string(),
            })?;

        if let Ok(text) = clipboard.get_text() {
            if !text.trim().is_empty() {
                let kind = detect_kind(&text);
                debug!(?kind, chars = text.len(), "clipboard text sensed");
                return Ok(Some((kind, text)));
            }
        }

        match clipboard.get_image() {
            Ok(img) => {
                let encoded = encode_image_png(&img)?;
                debug!(
                    width = img.width,
                    height = img.height,
                    "clipboard image sensed"
                );
                Ok(Some((ClipKind::Image, encoded)))
            }
            Err(_) => Ok(None),
        }
    }
}

/// Encode raw RGBA clipboard pixels as base64 PNG.
fn encode_image_png(img: &arboard::ImageData<'_>) -> Result<String, CapabilityError> {
    let buffer = image::RgbaImage::from_raw(
        img.width as u32,
        img.height as u32,
        img.bytes.clone().into_owned(),
    )
    .ok_or_else(|| CapabilityError::ClipboardFailed {
        message: "clipboard image dimensions do not match its pixel data".to_string(),
    })?;

    let mut png = Vec::new();
    buffer
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| CapabilityError::ClipboardFailed {
            message: format!("PNG encoding failed: {e}"),
        })?;
    Ok(base64::engine::general_purpose::STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_url() {
        assert_eq!(detect_kind("https://example.com/page"), ClipKind::Url);
        assert_eq!(detect_kind("  http://localhost:5000 "), ClipKind::Url);
    }

    #[test]
    fn test_detect_json() {
        assert_eq!(detect_kind(r#"{"name": "omifi"}"#), ClipKind::Json);
        assert_eq!(detect_kind("[1, 2, 3]"), ClipKind::Json);
        // Looks like JSON but does not parse.
        assert_eq!(detect_kind("{not json"), ClipKind::Text);
    }

    #[test]
    fn test_detect_code() {
        assert_eq!(detect_kind("fn main() {}"), ClipKind::Code);
        assert_eq!(detect_kind("def handler(event):"), ClipKind::Code);
        assert_eq!(detect_kind("#include <stdio.h>"), ClipKind::Code);
    }

    #[test]
    fn test_detect_plain_text() {
        assert_eq!(detect_kind("pick up milk on the way home"), ClipKind::Text);
    }

    #[test]
    fn test_encode_image_png_roundtrips_dimensions() {
        let img = arboard::ImageData {
            width: 2,
            height: 2,
            bytes: vec![255u8; 2 * 2 * 4].into(),
        };
        let encoded = encode_image_png(&img).unwrap();
        let png = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), 2);
        assert_eq!(decoded.height(), 2);
    }

    #[test]
    fn test_encode_image_rejects_mismatched_buffer() {
        let img = arboard::ImageData {
            width: 10,
            height: 10,
            bytes: vec![0u8; 4].into(),
        };
        assert!(encode_image_png(&img).is_err());
    }
}
