//! On-disk artifact storage.
//!
//! Layout under the base directory (default `~/.omifi`):
//!
//! ```text
//! .omifi/
//!   metadata.json
//!   screenshots/screenshot_20260827_153012_042.png
//!   clipboard/clipboard_20260827_153104_513.txt
//! ```
//!
//! `metadata.json` indexes every artifact. It is rewritten atomically
//! (temp file then rename) on each save, so a crash never leaves a
//! half-written index.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::capability::ClipKind;
use crate::error::StorageError;

const METADATA_FILE: &str = "metadata.json";
const SCREENSHOTS_DIR: &str = "screenshots";
const CLIPBOARD_DIR: &str = "clipboard";

/// One stored artifact. `filepath` is relative to the base directory so
/// the store survives being moved or synced between machines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtifactRecord {
    pub filename: String,
    pub filepath: String,
    pub timestamp: DateTime<Utc>,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ClipKind>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Metadata {
    screenshots: Vec<ArtifactRecord>,
    clipboard: Vec<ArtifactRecord>,
}

/// Artifact store. Cheap to share behind an `Arc`; the metadata index is
/// guarded by a mutex so concurrent saves serialize.
pub struct Storage {
    base_dir: PathBuf,
    metadata: Mutex<Metadata>,
}

impl Storage {
    /// Open (creating if needed) the store at `base_dir`. A corrupt
    /// metadata file is logged and replaced with an empty index rather
    /// than refusing to start.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        for dir in [
            base_dir.clone(),
            base_dir.join(SCREENSHOTS_DIR),
            base_dir.join(CLIPBOARD_DIR),
        ] {
            fs::create_dir_all(&dir).map_err(|_| StorageError::DirectoryCreate { path: dir })?;
        }

        let metadata_path = base_dir.join(METADATA_FILE);
        let metadata = if metadata_path.exists() {
            match fs::read_to_string(&metadata_path) {
                Ok(raw) => match serde_json::from_str(&raw) {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!(path = %metadata_path.display(), error = %e,
                            "metadata file corrupt, starting with an empty index");
                        Metadata::default()
                    }
                },
                Err(e) => {
                    return Err(StorageError::MetadataRead {
                        path: metadata_path,
                        message: e.to_string(),
                    })
                }
            }
        } else {
            Metadata::default()
        };

        info!(base = %base_dir.display(), "storage ready");
        Ok(Self {
            base_dir,
            metadata: Mutex::new(metadata),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Store PNG bytes as a new screenshot and return its absolute path.
    pub fn save_screenshot(&self, png_bytes: &[u8]) -> Result<PathBuf, StorageError> {
        let now = Utc::now();
        let filename = format!("screenshot_{}.png", now.format("%Y%m%d_%H%M%S_%3f"));
        let relative = format!("{SCREENSHOTS_DIR}/{filename}");
        let path = self.base_dir.join(&relative);

        fs::write(&path, png_bytes).map_err(|e| StorageError::ArtifactWrite {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let record = ArtifactRecord {
            filename,
            filepath: relative,
            timestamp: now,
            size: png_bytes.len() as u64,
            kind: None,
        };
        {
            let mut metadata = self.metadata.lock().unwrap();
            metadata.screenshots.push(record);
            self.persist(&metadata)?;
        }
        debug!(path = %path.display(), "screenshot saved");
        Ok(path)
    }

    /// Store clipboard content. Image content arrives base64-encoded and
    /// is written back out as PNG; everything else is written as text.
    pub fn save_clipboard_content(
        &self,
        content: &str,
        kind: ClipKind,
    ) -> Result<PathBuf, StorageError> {
        let now = Utc::now();
        let ext = if kind == ClipKind::Image { "png" } else { "txt" };
        let filename = format!("clipboard_{}.{ext}", now.format("%Y%m%d_%H%M%S_%3f"));
        let relative = format!("{CLIPBOARD_DIR}/{filename}");
        let path = self.base_dir.join(&relative);

        let bytes: Vec<u8> = if kind == ClipKind::Image {
            base64::engine::general_purpose::STANDARD
                .decode(content)
                .map_err(|e| StorageError::ArtifactWrite {
                    path: path.clone(),
                    message: format!("image content was not valid base64: {e}"),
                })?
        } else {
            content.as_bytes().to_vec()
        };
        fs::write(&path, &bytes).map_err(|e| StorageError::ArtifactWrite {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let record = ArtifactRecord {
            filename,
            filepath: relative,
            timestamp: now,
            size: bytes.len() as u64,
            kind: Some(kind),
        };
        {
            let mut metadata = self.metadata.lock().unwrap();
            metadata.clipboard.push(record);
            self.persist(&metadata)?;
        }
        debug!(path = %path.display(), ?kind, "clipboard content saved");
        Ok(path)
    }

    /// Absolute path of the most recent screenshot, if any exists on disk.
    pub fn get_last_screenshot(&self) -> Option<PathBuf> {
        let metadata = self.metadata.lock().unwrap();
        metadata
            .screenshots
            .iter()
            .rev()
            .map(|r| self.base_dir.join(&r.filepath))
            .find(|p| p.exists())
    }

    /// Text of the most recent non-image clipboard artifact.
    pub fn get_last_clipboard_content(&self) -> Result<Option<String>, StorageError> {
        let path = {
            let metadata = self.metadata.lock().unwrap();
            metadata
                .clipboard
                .iter()
                .rev()
                .find(|r| r.kind != Some(ClipKind::Image))
                .map(|r| self.base_dir.join(&r.filepath))
        };
        let Some(path) = path else {
            return Ok(None);
        };
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) => Err(StorageError::MetadataRead {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Newest-first screenshot records.
    pub fn recent_screenshots(&self, limit: usize) -> Vec<ArtifactRecord> {
        let metadata = self.metadata.lock().unwrap();
        metadata
            .screenshots
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Newest-first clipboard records.
    pub fn recent_clipboard(&self, limit: usize) -> Vec<ArtifactRecord> {
        let metadata = self.metadata.lock().unwrap();
        metadata
            .clipboard
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    fn persist(&self, metadata: &Metadata) -> Result<(), StorageError> {
        let path = self.base_dir.join(METADATA_FILE);
        let write_err = |message: String| StorageError::MetadataWrite {
            path: path.clone(),
            message,
        };

        let json =
            serde_json::to_string_pretty(metadata).map_err(|e| write_err(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| write_err(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| write_err(e.to_string()))
    }
}
