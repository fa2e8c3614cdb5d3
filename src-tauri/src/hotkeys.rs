//! Optional global keyboard shortcut for Capture.
//!
//! Disabled unless `hotkey_enabled` is true in config. Modifiers and key come from
//! `hotkey_modifiers` / `hotkey_key`, defaulting to Cmd+Shift+L on macOS and Ctrl+Shift+L
//! elsewhere. On Wayland native global hotkeys are not supported, so nothing is registered there.
//! The registered shortcut is kept in `CaptureHotkeyState` so presses can be matched against it.

use std::sync::Mutex;

use tauri::Manager;
use tauri_plugin_global_shortcut::{Code, GlobalShortcutExt, Modifiers, Shortcut, ShortcutState};
use tracing::{info, warn};

use crate::actions::{self, AppAction};
use crate::config::FullConfig;

/// Shortcut currently registered for Capture, if any.
#[derive(Debug, Default)]
pub struct CaptureHotkeyState(Mutex<Option<Shortcut>>);

// --- Platform defaults and session detection ---

fn default_modifiers() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "command+shift"
    }
    #[cfg(not(target_os = "macos"))]
    {
        "control+shift"
    }
}

const DEFAULT_KEY: &str = "l";

fn is_wayland_session() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_SESSION_TYPE")
            .map(|s| s.eq_ignore_ascii_case("wayland"))
            .unwrap_or(false)
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

// --- Parsing and building shortcuts ---

/// Parses a modifier list such as `"Ctrl + Shift"` or `"cmd,alt"`. An empty list means no
/// modifiers.
fn parse_modifiers(raw: &str) -> Result<Option<Modifiers>, String> {
    let modifiers = raw
        .split(['+', ','])
        .flat_map(str::split_whitespace)
        .try_fold(Modifiers::empty(), |acc, token| {
            let flag = match token.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => Modifiers::CONTROL,
                "shift" => Modifiers::SHIFT,
                "alt" | "option" => Modifiers::ALT,
                "cmd" | "command" | "super" | "meta" => Modifiers::SUPER,
                _ => return Err(format!("Unknown hotkey modifier '{token}'")),
            };
            Ok(acc | flag)
        })?;
    Ok((!modifiers.is_empty()).then_some(modifiers))
}

fn parse_key_code(raw: &str) -> Result<Code, String> {
    let upper = raw.trim().to_uppercase();
    let code = match upper.as_str() {
        "A" => Code::KeyA,
        "B" => Code::KeyB,
        "C" => Code::KeyC,
        "D" => Code::KeyD,
        "E" => Code::KeyE,
        "F" => Code::KeyF,
        "G" => Code::KeyG,
        "H" => Code::KeyH,
        "I" => Code::KeyI,
        "J" => Code::KeyJ,
        "K" => Code::KeyK,
        "L" => Code::KeyL,
        "M" => Code::KeyM,
        "N" => Code::KeyN,
        "O" => Code::KeyO,
        "P" => Code::KeyP,
        "Q" => Code::KeyQ,
        "R" => Code::KeyR,
        "S" => Code::KeyS,
        "T" => Code::KeyT,
        "U" => Code::KeyU,
        "V" => Code::KeyV,
        "W" => Code::KeyW,
        "X" => Code::KeyX,
        "Y" => Code::KeyY,
        "Z" => Code::KeyZ,
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,
        other => return Err(format!("Unsupported hotkey key: {other}")),
    };
    Ok(code)
}

/// Shortcut configured for Capture, or `None` when the hotkey is disabled.
fn configured_shortcut(cfg: &FullConfig) -> Result<Option<Shortcut>, String> {
    if !cfg.hotkey_enabled.unwrap_or(false) {
        return Ok(None);
    }
    let modifiers = cfg
        .hotkey_modifiers
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_modifiers());
    let key = cfg
        .hotkey_key
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_KEY);
    Ok(Some(Shortcut::new(
        parse_modifiers(modifiers)?,
        parse_key_code(key)?,
    )))
}

// --- Registration and event handling ---

/// Registers the Capture shortcut from config. Called once from setup.
pub fn register_capture_hotkey<R: tauri::Runtime>(app: &tauri::AppHandle<R>, cfg: &FullConfig) {
    let shortcut = match configured_shortcut(cfg) {
        Ok(Some(shortcut)) => shortcut,
        Ok(None) => return,
        Err(e) => {
            warn!(error = %e, "Invalid capture hotkey in config");
            return;
        }
    };

    if is_wayland_session() {
        warn!("Global hotkeys are not supported on Wayland; use the tray menu");
        return;
    }

    if let Err(e) = app.global_shortcut().register(shortcut) {
        warn!(error = %e, shortcut = ?shortcut, "Failed to register capture hotkey");
        return;
    }
    info!(shortcut = ?shortcut, "Registered capture hotkey");

    if let Some(state) = app.try_state::<CaptureHotkeyState>() {
        if let Ok(mut registered) = state.0.lock() {
            *registered = Some(shortcut);
        }
    }
}

/// Called by the global shortcut plugin for every key event.
pub fn handle_global_shortcut_event<R: tauri::Runtime>(
    app: &tauri::AppHandle<R>,
    shortcut: &Shortcut,
    event_state: ShortcutState,
) {
    if event_state != ShortcutState::Pressed {
        return;
    }

    let Some(state) = app.try_state::<CaptureHotkeyState>() else {
        return;
    };
    let matches = state
        .0
        .lock()
        .map(|registered| registered.as_ref() == Some(shortcut))
        .unwrap_or(false);

    if matches {
        actions::execute_action(app, AppAction::Capture, "hotkey");
    }
}
