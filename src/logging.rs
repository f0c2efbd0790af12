//! Tracing subscriber setup.
//!
//! # Filter priority (highest to lowest)
//!
//! 1. `KIM_LOG` env var (directives, e.g. `kim=debug,rdkafka=warn`)
//! 2. `RUST_LOG` env var
//! 3. `--debug` flag or `KIM_DEBUG=true` (debug for kim crates)
//! 4. Default level: `warn`
//!
//! Interactive mode owns the terminal, so its logs go to a file instead of
//! stderr.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Append to a file (created if missing).
    File(PathBuf),
}

/// `~/.kim/kim.log`
pub fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".kim"))
        .unwrap_or_else(|| PathBuf::from(".kim"))
        .join("kim.log")
}

/// Whether `KIM_DEBUG` asks for debug logging.
pub fn debug_from_env() -> bool {
    std::env::var("KIM_DEBUG")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Install the global subscriber. Call once, early in `main`.
pub fn init(target: LogTarget, debug: bool) -> Result<()> {
    let debug = debug || debug_from_env();
    let filter = build_env_filter(debug);

    match target {
        LogTarget::Stderr => {
            let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr());
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(use_ansi)
                .with_target(debug);
            if debug {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.with_timer(fmt::time::uptime()))
                    .try_init()
                    .context("failed to install tracing subscriber")?;
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.without_time().compact())
                    .try_init()
                    .context("failed to install tracing subscriber")?;
            }
        }
        LogTarget::File(path) => {
            let file = open_log_file(&path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(true),
                )
                .try_init()
                .context("failed to install tracing subscriber")?;
        }
    }
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}

fn build_env_filter(debug: bool) -> EnvFilter {
    if let Ok(directives) = std::env::var("KIM_LOG") {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let directive = if debug {
        "warn,kim=debug,kim_adapters=debug"
    } else {
        "warn"
    };
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_path_is_under_kim_dir() {
        let path = default_log_path();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("kim.log"));
        assert!(path.parent().is_some_and(|p| p.ends_with(".kim")));
    }

    #[test]
    fn log_file_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("kim.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
