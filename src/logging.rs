//! Log file setup.
//!
//! The terminal belongs to the UI, so `tracing` output goes to a file in the
//! platform data directory (or `log.file` from the config). Logging is
//! optional: if the file cannot be opened the app runs without it.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("apod-gallery").join("apod-gallery.log"))
}

/// Installs the global subscriber. Returns the log path when one is active.
pub fn init(cfg: &LogConfig) -> Option<PathBuf> {
    let path = cfg.file.clone().or_else(default_log_path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok()?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .ok()?;

    let filter = EnvFilter::try_new(cfg.level.trim()).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .ok()?;

    Some(path)
}
