//! Screenshot capture via the platform's native capture tool.
//!
//! The tool writes PNG to a temp file, the bytes are handed to storage,
//! and the temp file is removed. No persistent hold on any display API.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info};

use super::ScreenshotCapability;
use crate::error::CapabilityError;
use crate::storage::Storage;

pub struct CommandScreenshot {
    storage: Arc<Storage>,
}

impl CommandScreenshot {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    fn capture_png(&self) -> Result<Vec<u8>, CapabilityError> {
        let tmp = std::env::temp_dir().join(format!(
            "omifi-capture-{}-{}.png",
            std::process::id(),
            chrono::Utc::now().timestamp_millis()
        ));
        let result = run_capture_tool(&tmp);
        let bytes = result.and_then(|()| {
            fs::read(&tmp).map_err(|e| CapabilityError::CaptureFailed {
                message: format!("capture produced no readable file: {e}"),
            })
        });
        let _ = fs::remove_file(&tmp);
        bytes
    }
}

impl ScreenshotCapability for CommandScreenshot {
    fn is_available(&self) -> bool {
        capture_tool_present()
    }

    fn take_screenshot(&self) -> Result<PathBuf, CapabilityError> {
        let png = self.capture_png()?;
        let path = self
            .storage
            .save_screenshot(&png)
            .map_err(|e| CapabilityError::CaptureFailed {
                message: format!("could not persist screenshot: {e}"),
            })?;
        info!(path = %path.display(), bytes = png.len(), "screenshot captured");
        Ok(path)
    }

    fn open_last_screenshot(&self) -> Result<bool, CapabilityError> {
        match self.storage.get_last_screenshot() {
            Some(path) => {
                debug!(path = %path.display(), "opening screenshot");
                open::that(&path).map_err(|e| CapabilityError::CaptureFailed {
                    message: format!("viewer launch failed: {e}"),
                })?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(target_os = "macos")]
fn run_capture_tool(out: &std::path::Path) -> Result<(), CapabilityError> {
    run_tool("screencapture", &["-x".as_ref(), out.as_os_str()])
}

#[cfg(target_os = "macos")]
fn capture_tool_present() -> bool {
    true
}

#[cfg(target_os = "linux")]
fn run_capture_tool(out: &std::path::Path) -> Result<(), CapabilityError> {
    // Prefer gnome-screenshot, fall back to scrot.
    if tool_on_path("gnome-screenshot") {
        run_tool("gnome-screenshot", &["-f".as_ref(), out.as_os_str()])
    } else {
        run_tool("scrot", &[out.as_os_str()])
    }
}

#[cfg(target_os = "linux")]
fn capture_tool_present() -> bool {
    tool_on_path("gnome-screenshot") || tool_on_path("scrot")
}

#[cfg(target_os = "windows")]
fn run_capture_tool(out: &std::path::Path) -> Result<(), CapabilityError> {
    let script = format!(
        "Add-Type -AssemblyName System.Windows.Forms,System.Drawing; \
         $b = [System.Windows.Forms.SystemInformation]::VirtualScreen; \
         $bmp = New-Object System.Drawing.Bitmap $b.Width, $b.Height; \
         $g = [System.Drawing.Graphics]::FromImage($bmp); \
         $g.CopyFromScreen($b.Left, $b.Top, 0, 0, $bmp.Size); \
         $bmp.Save('{}', [System.Drawing.Imaging.ImageFormat]::Png)",
        out.display()
    );
    run_tool(
        "powershell",
        &["-NoProfile".as_ref(), "-Command".as_ref(), script.as_ref()],
    )
}

#[cfg(target_os = "windows")]
fn capture_tool_present() -> bool {
    true
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn run_capture_tool(_out: &std::path::Path) -> Result<(), CapabilityError> {
    Err(CapabilityError::CaptureFailed {
        message: "no screen capture tool for this platform".to_string(),
    })
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn capture_tool_present() -> bool {
    false
}

fn run_tool(program: &str, args: &[&std::ffi::OsStr]) -> Result<(), CapabilityError> {
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| CapabilityError::CaptureFailed {
            message: format!("{program} failed to start: {e}"),
        })?;
    if !status.success() {
        return Err(CapabilityError::CaptureFailed {
            message: format!("{program} exited with {status}"),
        });
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn tool_on_path(name: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| dir.join(name).is_file())
        })
        .unwrap_or(false)
}
