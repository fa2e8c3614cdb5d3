//! Clipboard writes for the preview window's copy action.

#[cfg(target_os = "linux")]
mod linux;

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to set clipboard text: {0}")]
    Write(String),
}

/// Destination for copied text. The system clipboard in the app, a recorder in tests.
pub trait ClipboardWriter {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// System clipboard through `arboard`.
#[derive(Default)]
pub struct SystemClipboard {
    #[cfg(target_os = "linux")]
    owner: linux::ClipboardOwner,
}

impl ClipboardWriter for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        #[cfg(target_os = "linux")]
        self.owner.set_text(text)?;

        #[cfg(not(target_os = "linux"))]
        arboard::Clipboard::new()
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))?
            .set_text(text.to_owned())
            .map_err(|e| ClipboardError::Write(e.to_string()))?;

        // Length only: copied content may be sensitive.
        debug!(len = text.len(), "Copied text to clipboard");
        Ok(())
    }
}
