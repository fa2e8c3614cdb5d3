//! Interactive region capture through the platform's screenshot tool.
//!
//! The tool is launched with an output path under the temp directory and is expected to write a
//! PNG there once the user has selected a region. The tool's exit status is not trusted (some
//! report success on Escape, some failure); instead the path is polled a bounded number of times.
//! Defaults: `screencapture -i` on macOS, `gnome-screenshot -a -f` on Linux. The `capture_command`
//! config entry overrides the tool on any platform. The screenshot file is left in place.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Placeholder in a configured capture command that is replaced by the output path.
pub const PATH_PLACEHOLDER: &str = "{path}";

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No screenshot tool available on this platform; set capture_command in config")]
    Unsupported,
    #[error("Failed to execute screenshot tool: {0}")]
    CommandExecution(String),
    #[error("Screenshot file {} was not produced after {polls} polls", .path.display())]
    FileNotProduced { path: PathBuf, polls: u32 },
}

/// A screenshot that exists on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub path: PathBuf,
}

/// How long to wait for the tool's output file to appear.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_millis(500),
        }
    }
}

/// `<dir>/screenshot_<YYYY-MM-DD_HH-MM-SS>.png`
pub fn screenshot_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("screenshot_{}.png", now.format("%Y-%m-%d_%H-%M-%S")))
}

fn default_command() -> Option<Vec<String>> {
    #[cfg(target_os = "macos")]
    {
        Some(vec!["screencapture".to_string(), "-i".to_string()])
    }
    #[cfg(target_os = "linux")]
    {
        Some(vec![
            "gnome-screenshot".to_string(),
            "-a".to_string(),
            "-f".to_string(),
        ])
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

/// Full argv for one capture. Substitutes `{path}` in the configured command, or appends the
/// path when no placeholder is present.
pub fn build_capture_argv(
    configured: Option<&[String]>,
    output: &Path,
) -> Result<Vec<String>, CaptureError> {
    let template = match configured {
        Some(argv) => argv.to_vec(),
        None => default_command().ok_or(CaptureError::Unsupported)?,
    };
    let output = output.to_string_lossy();

    if template.iter().any(|a| a.contains(PATH_PLACEHOLDER)) {
        Ok(template
            .into_iter()
            .map(|a| a.replace(PATH_PLACEHOLDER, &output))
            .collect())
    } else {
        let mut argv = template;
        argv.push(output.into_owned());
        Ok(argv)
    }
}

/// Checks for `path` once, then up to `policy.attempts` more times with `policy.interval` sleeps
/// in between. Returns the number of sleeps taken before the file appeared, or
/// `FileNotProduced` once they are exhausted.
pub fn wait_for_file(path: &Path, policy: PollPolicy) -> Result<u32, CaptureError> {
    let mut polls = 0;
    loop {
        if path.exists() {
            return Ok(polls);
        }
        if polls == policy.attempts {
            return Err(CaptureError::FileNotProduced {
                path: path.to_path_buf(),
                polls,
            });
        }
        std::thread::sleep(policy.interval);
        polls += 1;
    }
}

/// Runs `argv` (blocking until the tool exits) and waits for `output` to appear.
pub fn capture_with(
    argv: &[String],
    output: &Path,
    policy: PollPolicy,
) -> Result<CapturedImage, CaptureError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| CaptureError::CommandExecution("empty capture command".to_string()))?;

    debug!(program = %program, path = %output.display(), "Starting interactive screenshot");

    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| CaptureError::CommandExecution(format!("{}: {}", program, e)))?;

    if !status.success() {
        debug!(code = ?status.code(), "Screenshot tool exited with failure status");
    }

    match wait_for_file(output, policy) {
        Ok(polls) => {
            info!(path = %output.display(), polls, "Screenshot captured");
            Ok(CapturedImage {
                path: output.to_path_buf(),
            })
        }
        Err(e) => {
            warn!(error = %e, "Screenshot file not found");
            Err(e)
        }
    }
}

/// Captures a user-selected screen region into a timestamped PNG in the temp directory.
pub fn capture_screenshot(
    configured: Option<&[String]>,
) -> Result<CapturedImage, CaptureError> {
    let output = screenshot_path(&std::env::temp_dir(), Local::now());
    let argv = build_capture_argv(configured, &output)?;
    capture_with(&argv, &output, PollPolicy::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Instant;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_screenshot_path_format() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let path = screenshot_path(Path::new("/tmp"), now);
        assert_eq!(path, PathBuf::from("/tmp/screenshot_2024-03-09_07-05-01.png"));
    }

    #[test]
    fn test_placeholder_is_substituted() {
        let configured = argv(&["flameshot", "gui", "--path={path}"]);
        let built = build_capture_argv(Some(&configured), Path::new("/tmp/a.png")).unwrap();
        assert_eq!(built, argv(&["flameshot", "gui", "--path=/tmp/a.png"]));
    }

    #[test]
    fn test_path_is_appended_without_placeholder() {
        let configured = argv(&["spectacle", "-r", "-b", "-n", "-o"]);
        let built = build_capture_argv(Some(&configured), Path::new("/tmp/a.png")).unwrap();
        assert_eq!(built.last().unwrap(), "/tmp/a.png");
        assert_eq!(built.len(), 6);
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn test_default_tool_on_macos() {
        let built = build_capture_argv(None, Path::new("/tmp/a.png")).unwrap();
        assert_eq!(built, argv(&["screencapture", "-i", "/tmp/a.png"]));
    }

    #[test]
    fn test_existing_file_needs_no_polls() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(wait_for_file(file.path(), PollPolicy::default()).unwrap(), 0);
    }

    #[test]
    fn test_missing_file_polls_five_times_half_a_second_apart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.png");

        let started = Instant::now();
        let err = wait_for_file(&path, PollPolicy::default()).unwrap_err();
        let elapsed = started.elapsed();

        match err {
            CaptureError::FileNotProduced { polls, path: p } => {
                assert_eq!(polls, 5);
                assert_eq!(p, path);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(elapsed >= Duration::from_millis(2500));
        assert!(elapsed < Duration::from_millis(4000));
    }

    #[test]
    fn test_file_appearing_late_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.png");
        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            std::fs::write(writer_path, b"png").unwrap();
        });

        let policy = PollPolicy {
            attempts: 50,
            interval: Duration::from_millis(20),
        };
        let polls = wait_for_file(&path, policy).unwrap();
        writer.join().unwrap();
        assert!(polls >= 1 && polls < 50);
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_with_tool_that_writes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("shot.png");
        let configured = argv(&["sh", "-c", "printf png > \"$0\"", "{path}"]);
        let built = build_capture_argv(Some(&configured), &output).unwrap();

        let captured = capture_with(&built, &output, PollPolicy::default()).unwrap();
        assert_eq!(captured.path, output);
        assert_eq!(std::fs::read(&output).unwrap(), b"png");
    }

    #[cfg(unix)]
    #[test]
    fn test_cancelled_capture_reports_file_not_produced() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cancelled.png");
        let policy = PollPolicy {
            attempts: 2,
            interval: Duration::from_millis(10),
        };

        let err = capture_with(&argv(&["false"]), &output, policy).unwrap_err();
        assert!(matches!(err, CaptureError::FileNotProduced { polls: 2, .. }));
    }

    #[test]
    fn test_missing_program_is_command_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("x.png");
        let err = capture_with(
            &argv(&["snap-math-no-such-capture-tool"]),
            &output,
            PollPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CaptureError::CommandExecution(_)));
    }
}
