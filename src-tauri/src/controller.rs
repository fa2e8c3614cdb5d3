//! Capture flow state: Idle → Capturing → Extracting → Idle, plus the last finished output.
//!
//! One capture at a time. A request that arrives while a capture is in flight is rejected with
//! `FlowError::Busy`, not queued. Inference failures do not abort the flow: the caller-side
//! fallback text stands in for both payloads so a preview still appears. Capture failures do
//! abort it, and the extractor is never called.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::{info, warn};

use crate::extraction::ExtractionResult;
use crate::inference::ImageExtractor;
use crate::system::{CaptureError, CapturedImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Capturing,
    Extracting,
}

impl Phase {
    pub fn is_busy(self) -> bool {
        self != Phase::Idle
    }
}

/// Everything a preview window needs: the screenshot and what was extracted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutcome {
    pub image_path: PathBuf,
    pub extraction: ExtractionResult,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("A capture is already in progress")]
    Busy,
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[derive(Debug, Default)]
struct Inner {
    phase: Phase,
    last: Option<CaptureOutcome>,
}

/// Managed as Tauri state; shared by the tray, the hotkey and the capture worker.
#[derive(Debug, Default)]
pub struct CaptureController {
    inner: Mutex<Inner>,
}

impl CaptureController {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn last_output(&self) -> Option<CaptureOutcome> {
        self.lock().last.clone()
    }

    pub fn has_last_output(&self) -> bool {
        self.lock().last.is_some()
    }

    fn begin(&self) -> Result<(), FlowError> {
        let mut inner = self.lock();
        if inner.phase.is_busy() {
            return Err(FlowError::Busy);
        }
        inner.phase = Phase::Capturing;
        Ok(())
    }

    fn set_phase(&self, phase: Phase) {
        self.lock().phase = phase;
    }

    fn finish(&self, outcome: Option<&CaptureOutcome>) {
        let mut inner = self.lock();
        inner.phase = Phase::Idle;
        if let Some(outcome) = outcome {
            inner.last = Some(outcome.clone());
        }
    }

    /// Runs one capture → extract cycle. `capture` blocks until the screenshot exists or fails;
    /// `on_phase` is told about every transition (including the final return to Idle) so the UI
    /// can show a busy indicator.
    pub async fn run_capture<C, E, P>(
        &self,
        capture: C,
        extractor: &E,
        mut on_phase: P,
    ) -> Result<CaptureOutcome, FlowError>
    where
        C: FnOnce() -> Result<CapturedImage, CaptureError>,
        E: ImageExtractor,
        P: FnMut(Phase),
    {
        self.begin()?;
        on_phase(Phase::Capturing);

        let captured = match capture() {
            Ok(captured) => captured,
            Err(e) => {
                self.finish(None);
                on_phase(Phase::Idle);
                return Err(e.into());
            }
        };

        self.set_phase(Phase::Extracting);
        on_phase(Phase::Extracting);

        let extraction = match extractor.extract(&captured.path).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(error = %e, "Extraction failed, showing placeholder");
                ExtractionResult::fallback(&e)
            }
        };
        info!(
            html_len = extraction.html.len(),
            markdown_len = extraction.markdown.len(),
            "Extraction finished"
        );

        let outcome = CaptureOutcome {
            image_path: captured.path,
            extraction,
        };
        self.finish(Some(&outcome));
        on_phase(Phase::Idle);
        Ok(outcome)
    }
}
