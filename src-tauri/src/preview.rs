//! Preview windows: one per finished capture (or per "Show Last Output").
//!
//! Each window gets a unique `preview-<id>` label and its `CaptureOutcome` is stored in
//! `PreviewRegistry` under that label before the window is built. The page (`ui/preview.html`)
//! pulls its own payload with `get_preview` and copies with `copy_markdown`; both commands resolve
//! the payload from the calling window's label. The entry is dropped when the window is destroyed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tauri::{State, WebviewUrl, WebviewWindowBuilder};
use tracing::{debug, info, warn};

use crate::controller::CaptureOutcome;
use crate::inference::image_data_url;
use crate::system::{ClipboardWriter, SystemClipboard};

pub const PREVIEW_LABEL_PREFIX: &str = "preview-";
const PREVIEW_PAGE: &str = "preview.html";
const PREVIEW_TITLE: &str = "LaTeX Preview";

pub const MATHJAX_SCRIPT_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.7/MathJax.js?config=TeX-MML-AM_CHTML";

/// Used when the screenshot's dimensions cannot be read.
const DEFAULT_WINDOW_SIZE: (f64, f64) = (1200.0, 800.0);
const MIN_WINDOW_SIZE: (f64, f64) = (600.0, 500.0);
const MAX_WINDOW_SIZE: (f64, f64) = (1600.0, 1000.0);
/// Horizontal and vertical room around the image, plus space for the rendered document.
const IMAGE_PADDING: (f64, f64) = (50.0, 100.0);
const DOCUMENT_MIN_HEIGHT: f64 = 200.0;

// --- Registry ---

#[derive(Debug, Default)]
pub struct PreviewRegistry {
    windows: Mutex<HashMap<String, CaptureOutcome>>,
}

impl PreviewRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CaptureOutcome>> {
        self.windows.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, label: String, outcome: CaptureOutcome) {
        self.lock().insert(label, outcome);
    }

    pub fn get(&self, label: &str) -> Option<CaptureOutcome> {
        self.lock().get(label).cloned()
    }

    pub fn remove(&self, label: &str) -> Option<CaptureOutcome> {
        self.lock().remove(label)
    }

    /// Copies the Markdown payload of `label`'s window, verbatim. Returns the copied length.
    pub fn copy_markdown_with(
        &self,
        label: &str,
        clipboard: &impl ClipboardWriter,
    ) -> Result<usize, String> {
        let outcome = self
            .get(label)
            .ok_or_else(|| format!("No preview content for window {}", label))?;
        let markdown = outcome.extraction.markdown;
        clipboard
            .write_text(&markdown)
            .map_err(|e| e.to_string())?;
        Ok(markdown.len())
    }
}

// --- Rendering ---

/// Wraps the HTML payload in a standalone document that typesets `\(..\)` and `\[..\]` with
/// MathJax.
pub fn render_document(html_payload: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <script type="text/javascript" async
        src="{MATHJAX_SCRIPT_URL}">
    </script>
    <style>
        body {{
            font-family: Arial, sans-serif;
            font-size: 16px;
            padding: 20px;
            line-height: 1.6;
        }}
    </style>
</head>
<body>
{html_payload}
</body>
</html>
"#
    )
}

/// What the preview page receives from `get_preview`.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewView {
    /// `None` when the screenshot can no longer be read; the page hides the image then.
    pub image_data_url: Option<String>,
    pub document: String,
    pub markdown: String,
}

impl PreviewView {
    pub fn from_outcome(outcome: &CaptureOutcome) -> Self {
        let image_data_url = match std::fs::read(&outcome.image_path) {
            Ok(bytes) => Some(image_data_url(&bytes)),
            Err(e) => {
                warn!(error = %e, path = %outcome.image_path.display(), "Screenshot unreadable");
                None
            }
        };
        Self {
            image_data_url,
            document: render_document(&outcome.extraction.html),
            markdown: outcome.extraction.markdown.clone(),
        }
    }
}

/// Logical window size for a screenshot of `dimensions` pixels.
pub fn window_size(dimensions: Option<(u32, u32)>) -> (f64, f64) {
    let Some((w, h)) = dimensions else {
        return DEFAULT_WINDOW_SIZE;
    };
    let width = (w as f64 + IMAGE_PADDING.0).clamp(MIN_WINDOW_SIZE.0, MAX_WINDOW_SIZE.0);
    let height = (h as f64 + IMAGE_PADDING.1 + DOCUMENT_MIN_HEIGHT)
        .clamp(MIN_WINDOW_SIZE.1, MAX_WINDOW_SIZE.1);
    (width, height)
}

// --- Window lifecycle ---

/// Registers `outcome` under a fresh label and opens a preview window for it.
pub fn open_preview_window<R: tauri::Runtime>(
    app: &tauri::AppHandle<R>,
    registry: &PreviewRegistry,
    outcome: CaptureOutcome,
) -> Result<(), String> {
    let label = format!("{}{}", PREVIEW_LABEL_PREFIX, nanoid::nanoid!(10, &nanoid::alphabet::SAFE));
    let dimensions = image::image_dimensions(&outcome.image_path)
        .map_err(|e| debug!(error = %e, "Could not read screenshot dimensions"))
        .ok();
    let (width, height) = window_size(dimensions);

    registry.insert(label.clone(), outcome);

    let built = WebviewWindowBuilder::new(app, &label, WebviewUrl::App(PREVIEW_PAGE.into()))
        .title(PREVIEW_TITLE)
        .inner_size(width, height)
        .min_inner_size(MIN_WINDOW_SIZE.0, MIN_WINDOW_SIZE.1)
        .resizable(true)
        .focused(true)
        .center()
        .build();

    match built {
        Ok(window) => {
            let _ = window.set_focus();
            info!(label = %label, width, height, "Opened preview window");
            Ok(())
        }
        Err(e) => {
            registry.remove(&label);
            Err(e.to_string())
        }
    }
}

// --- Commands ---

/// Returns the calling preview window's content.
#[tauri::command]
pub fn get_preview(
    window: tauri::WebviewWindow,
    registry: State<PreviewRegistry>,
) -> Result<PreviewView, String> {
    let outcome = registry
        .get(window.label())
        .ok_or_else(|| format!("No preview content for window {}", window.label()))?;
    Ok(PreviewView::from_outcome(&outcome))
}

/// Copies the calling preview window's Markdown payload to the system clipboard.
#[tauri::command]
pub fn copy_markdown(
    window: tauri::WebviewWindow,
    registry: State<PreviewRegistry>,
    clipboard: State<SystemClipboard>,
) -> Result<(), String> {
    let len = registry.copy_markdown_with(window.label(), clipboard.inner())?;
    info!(len, "Markdown copied to clipboard");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::ExtractionResult;
    use crate::system::ClipboardError;
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[derive(Default)]
    struct RecordingClipboard {
        writes: RefCell<Vec<String>>,
    }

    impl ClipboardWriter for RecordingClipboard {
        fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            self.writes.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl ClipboardWriter for BrokenClipboard {
        fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError::Unavailable("no display".to_string()))
        }
    }

    fn outcome(image_path: PathBuf, response: &str) -> CaptureOutcome {
        CaptureOutcome {
            image_path,
            extraction: ExtractionResult::from_response_text(response),
        }
    }

    #[test]
    fn test_copy_places_markdown_verbatim() {
        let registry = PreviewRegistry::default();
        let markdown = "Euler: $e^{i\\pi} + 1 = 0$\n\n$$\\int_0^1 x\\,dx = \\tfrac12$$";
        registry.insert(
            "preview-a".to_string(),
            outcome(
                PathBuf::from("/tmp/a.png"),
                &format!("<p>\\(e^{{i\\pi}}\\)</p>\n---\n{markdown}"),
            ),
        );
        let clipboard = RecordingClipboard::default();

        let len = registry.copy_markdown_with("preview-a", &clipboard).unwrap();

        assert_eq!(*clipboard.writes.borrow(), vec![markdown.to_string()]);
        assert_eq!(len, markdown.len());
    }

    #[test]
    fn test_each_window_copies_its_own_payload() {
        let registry = PreviewRegistry::default();
        registry.insert("preview-a".into(), outcome("/tmp/a.png".into(), "<p>A</p>\n---\n*A*"));
        registry.insert("preview-b".into(), outcome("/tmp/b.png".into(), "<p>B</p>\n---\n*B*"));
        let clipboard = RecordingClipboard::default();

        registry.copy_markdown_with("preview-b", &clipboard).unwrap();
        registry.copy_markdown_with("preview-a", &clipboard).unwrap();

        assert_eq!(*clipboard.writes.borrow(), vec!["*B*", "*A*"]);
    }

    #[test]
    fn test_copy_for_unknown_window_fails() {
        let registry = PreviewRegistry::default();
        let clipboard = RecordingClipboard::default();
        assert!(registry.copy_markdown_with("preview-x", &clipboard).is_err());
        assert!(clipboard.writes.borrow().is_empty());
    }

    #[test]
    fn test_clipboard_failure_is_reported() {
        let registry = PreviewRegistry::default();
        registry.insert("preview-a".into(), outcome("/tmp/a.png".into(), "x"));
        let err = registry
            .copy_markdown_with("preview-a", &BrokenClipboard)
            .unwrap_err();
        assert!(err.contains("no display"));
    }

    #[test]
    fn test_removed_window_forgets_payload() {
        let registry = PreviewRegistry::default();
        registry.insert("preview-a".into(), outcome("/tmp/a.png".into(), "x"));
        assert!(registry.get("preview-a").is_some());
        assert!(registry.remove("preview-a").is_some());
        assert!(registry.get("preview-a").is_none());
        assert!(registry.remove("preview-a").is_none());
    }

    #[test]
    fn test_document_embeds_payload_and_mathjax() {
        let doc = render_document("<p>\\(x^2\\)</p>");
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains(MATHJAX_SCRIPT_URL));
        assert!(doc.contains("<body>\n<p>\\(x^2\\)</p>\n</body>"));
    }

    #[test]
    fn test_view_carries_image_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();

        let view = PreviewView::from_outcome(&outcome(path, "<p>A</p>\n---\n*A*"));
        assert!(view
            .image_data_url
            .as_deref()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert!(view.document.contains("<p>A</p>"));
        assert_eq!(view.markdown, "*A*");
    }

    #[test]
    fn test_view_without_image_still_renders() {
        let view = PreviewView::from_outcome(&outcome("/nonexistent/shot.png".into(), "<p>A</p>"));
        assert!(view.image_data_url.is_none());
        assert_eq!(view.markdown, "<p>A</p>");
    }

    #[test]
    fn test_preview_page_is_in_frontend_dist() {
        let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
        let conf: serde_json::Value =
            serde_json::from_str(include_str!("../tauri.conf.json")).unwrap();
        let dist = conf["build"]["frontendDist"].as_str().unwrap();

        let page = manifest_dir.join(dist).join(PREVIEW_PAGE);
        assert!(page.is_file(), "{} missing", page.display());
        let html = std::fs::read_to_string(page).unwrap();
        assert!(html.contains("get_preview"));
        assert!(html.contains("copy_markdown"));
    }

    #[test]
    fn test_window_size_follows_image() {
        assert_eq!(window_size(Some((800, 300))), (850.0, 600.0));
        assert_eq!(window_size(Some((10, 10))), MIN_WINDOW_SIZE);
        assert_eq!(window_size(Some((5000, 5000))), MAX_WINDOW_SIZE);
        assert_eq!(window_size(None), DEFAULT_WINDOW_SIZE);
    }
}
