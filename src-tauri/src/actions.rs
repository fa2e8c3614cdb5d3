//! High-level execution of user-triggered actions: capture a region, show the last output.
//!
//! Invoked by the tray menu and the global hotkey. Capture runs on a background thread with a
//! dedicated tokio runtime so the event loop stays responsive while the screenshot tool and the
//! inference request are in flight; the tray menu shows the phase meanwhile.

use tauri::Manager;
use tracing::{error, info, warn};

use crate::config;
use crate::controller::{CaptureController, CaptureOutcome, FlowError};
use crate::inference::ConfiguredClient;
use crate::preview::{self, PreviewRegistry};
use crate::system;
use crate::tray;

/// Action that can be triggered by the tray or a hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Capture,
    ShowLastOutput,
}

/// Runs the given action on a background thread; never blocks the caller.
pub fn execute_action<R: tauri::Runtime>(
    app: &tauri::AppHandle<R>,
    action: AppAction,
    source: &'static str,
) {
    match action {
        AppAction::Capture => {
            if app
                .try_state::<CaptureController>()
                .is_some_and(|c| c.phase().is_busy())
            {
                warn!(source, "Capture: already in progress, ignoring request");
                return;
            }
            let app = app.clone();
            std::thread::spawn(move || run_capture(&app, source));
        }
        AppAction::ShowLastOutput => {
            // Window creation from a menu handler can deadlock on Windows; open it off-thread.
            let app = app.clone();
            std::thread::spawn(move || show_last_output(&app, source));
        }
    }
}

fn run_capture<R: tauri::Runtime>(app: &tauri::AppHandle<R>, source: &'static str) {
    let Some(controller) = app.try_state::<CaptureController>() else {
        warn!(source, "Capture: CaptureController state not found");
        return;
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(r) => r,
        Err(e) => {
            error!(source, error = %e, "Failed to create tokio runtime for capture");
            return;
        }
    };

    let cfg = config::load_full_config();
    let capture_command = cfg.capture_command().map(<[String]>::to_vec);
    let extractor = ConfiguredClient::new(cfg);

    let result = rt.block_on(controller.run_capture(
        || system::capture_screenshot(capture_command.as_deref()),
        &extractor,
        |phase| tray::refresh_tray_menu(app, phase),
    ));

    match result {
        Ok(outcome) => open_preview(app, outcome, source),
        Err(FlowError::Busy) => {
            warn!(source, "Capture: already in progress, ignoring request");
        }
        Err(FlowError::Capture(e)) => {
            warn!(source, error = %e, "Capture aborted");
        }
    }
}

fn show_last_output<R: tauri::Runtime>(app: &tauri::AppHandle<R>, source: &'static str) {
    let last = app
        .try_state::<CaptureController>()
        .and_then(|c| c.last_output());
    match last {
        Some(outcome) => open_preview(app, outcome, source),
        None => info!(source, "Show Last Output: nothing captured yet"),
    }
}

fn open_preview<R: tauri::Runtime>(
    app: &tauri::AppHandle<R>,
    outcome: CaptureOutcome,
    source: &'static str,
) {
    let Some(registry) = app.try_state::<PreviewRegistry>() else {
        warn!(source, "Preview: PreviewRegistry state not found");
        return;
    };
    if let Err(e) = preview::open_preview_window(app, &registry, outcome) {
        warn!(source, error = %e, "Preview: failed to open window");
    }
}
