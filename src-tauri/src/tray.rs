//! System tray icon and menu.
//!
//! Builds the tray menu (Capture Screen, Show Last Output, Quit) and rebuilds it whenever the
//! capture phase changes: while a capture is in flight the Capture item is replaced by a disabled
//! status line. Menu event handling lives in `tray_actions`.

use tauri::image::Image;
use tauri::menu::{Menu, MenuItem, PredefinedMenuItem};
use tauri::tray::TrayIconBuilder;
use tauri::Manager;
use tracing::warn;

use crate::controller::{CaptureController, Phase};
use crate::tray_actions;

pub const TRAY_ID: &str = "main";

/// Tray icon: app logo at 32x32 (icons/logo.png).
pub const TRAY_ICON_PNG: &[u8] = include_bytes!("../icons/logo.png");

fn capture_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "Capture Screen",
        Phase::Capturing => "Capturing…",
        Phase::Extracting => "Extracting…",
    }
}

/// Builds the tray menu. Capture is enabled only when idle; Show Last Output only once there is
/// something to show.
pub fn build_tray_menu<R: tauri::Runtime>(
    app: &impl tauri::Manager<R>,
    phase: Phase,
    has_last_output: bool,
) -> Result<Menu<R>, tauri::Error> {
    let capture = MenuItem::with_id(
        app,
        "capture",
        capture_label(phase),
        !phase.is_busy(),
        None::<&str>,
    )?;
    let show_last = MenuItem::with_id(
        app,
        "show_last",
        "Show Last Output",
        has_last_output,
        None::<&str>,
    )?;
    let sep = PredefinedMenuItem::separator(app)?;
    let quit = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
    Menu::with_items(app, &[&capture, &show_last, &sep, &quit])
}

/// Creates the tray icon. Call once from setup.
pub fn create_tray<R: tauri::Runtime>(app: &tauri::AppHandle<R>) -> Result<(), tauri::Error> {
    let menu = build_tray_menu(app, Phase::Idle, false)?;
    let mut builder = TrayIconBuilder::with_id(TRAY_ID)
        .menu(&menu)
        .tooltip("Snap Math")
        .on_menu_event(|app, event| tray_actions::handle_tray_menu_event(app, event));

    match Image::from_bytes(TRAY_ICON_PNG) {
        Ok(icon) => builder = builder.icon(icon),
        Err(e) => warn!(error = %e, "Failed to load tray icon"),
    }

    builder.build(app)?;
    Ok(())
}

/// Rebuilds the tray menu from the controller's current phase and cached output.
pub fn refresh_tray_menu<R: tauri::Runtime>(app: &tauri::AppHandle<R>, phase: Phase) {
    let has_last_output = app
        .try_state::<CaptureController>()
        .map(|c| c.has_last_output())
        .unwrap_or(false);

    if let Some(tray) = app.tray_by_id(TRAY_ID) {
        if let Err(e) =
            build_tray_menu(app, phase, has_last_output).and_then(|m| tray.set_menu(Some(m)))
        {
            warn!(error = %e, "Failed to update tray menu");
        }
        let tooltip = if phase.is_busy() {
            capture_label(phase)
        } else {
            "Snap Math"
        };
        let _ = tray.set_tooltip(Some(tooltip));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_label_reflects_phase() {
        assert_eq!(capture_label(Phase::Idle), "Capture Screen");
        assert_eq!(capture_label(Phase::Capturing), "Capturing…");
        assert_eq!(capture_label(Phase::Extracting), "Extracting…");
    }

    #[test]
    fn test_tray_icon_is_png() {
        assert!(TRAY_ICON_PNG.starts_with(b"\x89PNG\r\n\x1a\n"));
    }
}
