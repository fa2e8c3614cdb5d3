//! Optional configuration for Snap Math.
//!
//! Read from a JSON file at `~/.config/snap-math/config.json`. Every field is optional; a missing
//! or unreadable file means built-in defaults (gpt-4o-mini, 500 output tokens, the platform's
//! interactive capture tool, no global hotkey). The file is never written by the app.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const APP_CONFIG_DIR_NAME: &str = "snap-math";
const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ERROR" => Some(Self::Error),
            "WARN" | "WARNING" => Some(Self::Warn),
            "INFO" => Some(Self::Info),
            "DEBUG" => Some(Self::Debug),
            "TRACE" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// On-disk shape. Unknown keys are ignored so older files keep loading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FullConfig {
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Program followed by its arguments; `{path}` is replaced by the output file.
    #[serde(default)]
    pub capture_command: Option<Vec<String>>,
    #[serde(default)]
    pub hotkey_enabled: Option<bool>,
    #[serde(default)]
    pub hotkey_modifiers: Option<String>,
    #[serde(default)]
    pub hotkey_key: Option<String>,
}

impl FullConfig {
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(LogLevel::from_str)
            .unwrap_or_default()
    }

    pub fn model(&self) -> String {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_MODEL)
            .to_string()
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_TOKENS)
    }

    /// Base URL precedence: `OPENAI_BASE_URL` env, then config, then the public endpoint.
    pub fn api_base_url(&self) -> String {
        std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                self.api_base_url
                    .clone()
                    .filter(|s| !s.trim().is_empty())
            })
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    /// Configured capture command, if it names at least a program.
    pub fn capture_command(&self) -> Option<&[String]> {
        self.capture_command
            .as_deref()
            .filter(|argv| argv.first().is_some_and(|p| !p.trim().is_empty()))
    }
}

fn config_path() -> Option<PathBuf> {
    Some(config_dir()?.join(APP_CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn load_from_path(path: &Path) -> Result<FullConfig, ConfigError> {
    if !path.exists() {
        debug!(?path, "Config file does not exist, using defaults");
        return Ok(FullConfig::default());
    }

    let data = fs::read_to_string(path)?;
    let cfg = serde_json::from_str(&data)?;
    debug!(?path, "Config loaded");
    Ok(cfg)
}

/// Loads the config file, falling back to defaults on any error.
pub fn load_full_config() -> FullConfig {
    let Some(path) = config_path() else {
        debug!("No config_dir available, using defaults only");
        return FullConfig::default();
    };

    match load_from_path(&path) {
        Ok(cfg) => cfg,
        Err(err) => {
            // Logging may not be initialised yet when this runs at startup.
            eprintln!("Config: failed to load {}: {err}", path.display());
            warn!(error = %err, ?path, "Failed to load config, using defaults");
            FullConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_from_path(&dir.path().join("config.json")).unwrap();
        assert_eq!(cfg.model(), DEFAULT_MODEL);
        assert_eq!(cfg.max_tokens(), DEFAULT_MAX_TOKENS);
        assert_eq!(cfg.log_level(), LogLevel::Info);
        assert!(cfg.capture_command().is_none());
    }

    #[test]
    fn test_partial_file_overrides_only_given_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"model": "gpt-4o", "log_level": "debug", "capture_command": ["flameshot", "gui", "-p", "{{path}}"], "unknown": 1}}"#
        )
        .unwrap();

        let cfg = load_from_path(file.path()).unwrap();
        assert_eq!(cfg.model(), "gpt-4o");
        assert_eq!(cfg.max_tokens(), DEFAULT_MAX_TOKENS);
        assert_eq!(cfg.log_level(), LogLevel::Debug);
        assert_eq!(
            cfg.capture_command().unwrap(),
            ["flameshot", "gui", "-p", "{path}"]
        );
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            load_from_path(file.path()),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_blank_values_fall_back() {
        let cfg = FullConfig {
            model: Some("  ".to_string()),
            max_tokens: Some(0),
            capture_command: Some(vec![" ".to_string()]),
            ..Default::default()
        };
        assert_eq!(cfg.model(), DEFAULT_MODEL);
        assert_eq!(cfg.max_tokens(), DEFAULT_MAX_TOKENS);
        assert!(cfg.capture_command().is_none());
    }
}
