//! Tray menu action handling.

use tauri::menu::MenuEvent;

use crate::actions::{self, AppAction};

/// Handles a tray menu click. Registered on the tray icon in `tray::create_tray`.
pub fn handle_tray_menu_event<R: tauri::Runtime>(app: &tauri::AppHandle<R>, event: MenuEvent) {
    match event.id().0.as_str() {
        "capture" => actions::execute_action(app, AppAction::Capture, "tray"),
        "show_last" => actions::execute_action(app, AppAction::ShowLastOutput, "tray"),
        "quit" => app.exit(0),
        _ => {}
    }
}
