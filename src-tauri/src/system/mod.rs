//! System interactions (clipboard, screenshot)

mod clipboard;
mod screenshot;

pub use clipboard::{ClipboardError, ClipboardWriter, SystemClipboard};
pub use screenshot::{capture_screenshot, CaptureError, CapturedImage};
