//! Snap Math: capture a screen region, extract its text and math with a multimodal model, and
//! preview the HTML/LaTeX rendering with a one-click copy of the Markdown.

mod actions;
mod config;
mod controller;
mod extraction;
mod hotkeys;
mod inference;
mod preview;
mod system;
mod tray;
mod tray_actions;

use tauri::{Manager, RunEvent, WindowEvent};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use controller::CaptureController;
use preview::PreviewRegistry;
use system::SystemClipboard;

/// `RUST_LOG` wins; otherwise the configured level.
fn init_tracing(level: config::LogLevel) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter())),
        )
        .init();
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let cfg = config::load_full_config();
    init_tracing(cfg.log_level());

    let app = tauri::Builder::default()
        .plugin(
            tauri_plugin_global_shortcut::Builder::new()
                .with_handler(|app, shortcut, event| {
                    hotkeys::handle_global_shortcut_event(app, shortcut, event.state())
                })
                .build(),
        )
        .manage(CaptureController::default())
        .manage(PreviewRegistry::default())
        .manage(SystemClipboard::default())
        .manage(hotkeys::CaptureHotkeyState::default())
        .invoke_handler(tauri::generate_handler![
            preview::get_preview,
            preview::copy_markdown
        ])
        .on_window_event(|window, event| {
            if let WindowEvent::Destroyed = event {
                if let Some(registry) = window.try_state::<PreviewRegistry>() {
                    registry.remove(window.label());
                }
            }
        })
        .setup(move |app| {
            // Tray-only app: no Dock icon.
            #[cfg(target_os = "macos")]
            app.set_activation_policy(tauri::ActivationPolicy::Accessory);

            tray::create_tray(app.handle())?;
            hotkeys::register_capture_hotkey(app.handle(), &cfg);
            info!("Snap Math ready in the system tray");
            Ok(())
        })
        .build(tauri::generate_context!());

    let app = match app {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Error while building Tauri application");
            std::process::exit(1);
        }
    };

    app.run(|_app, event| {
        // Closing the last preview window must not quit; only the tray's Quit does (code is set).
        if let RunEvent::ExitRequested { code: None, api, .. } = event {
            api.prevent_exit();
        }
    });
}
