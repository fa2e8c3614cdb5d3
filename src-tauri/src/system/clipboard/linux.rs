//! Linux clipboard ownership.
//!
//! On X11 and Wayland the process that set the clipboard serves its contents. The `arboard`
//! handle is therefore created once and kept for the life of the app; dropping it right after
//! `set_text` loses the text unless a clipboard manager picked it up.

use std::sync::Mutex;

use arboard::{Clipboard, LinuxClipboardKind, SetExtLinux};

use super::ClipboardError;

#[derive(Default)]
pub(super) struct ClipboardOwner {
    handle: Mutex<Option<Clipboard>>,
}

impl ClipboardOwner {
    pub(super) fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut guard = self
            .handle
            .lock()
            .map_err(|_| ClipboardError::Unavailable("clipboard lock poisoned".to_string()))?;

        if guard.is_none() {
            let clipboard =
                Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            *guard = Some(clipboard);
        }
        let Some(clipboard) = guard.as_mut() else {
            return Err(ClipboardError::Unavailable("no clipboard handle".to_string()));
        };

        clipboard
            .set()
            .clipboard(LinuxClipboardKind::Clipboard)
            .text(text.to_owned())
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}
