use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Send diagnostic events to `log_file`, appending. `RUST_LOG` overrides
/// the configured level.
pub fn init(log_file: &Path, level: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open {}", log_file.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_log_file_and_rejects_second_init() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buddy.log");
        init(&path, "debug").unwrap();
        assert!(path.exists());

        tracing::info!(probe = 1, "logging online");
        assert!(init(&path, "debug").is_err());
    }

    #[test]
    fn unwritable_location_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("buddy.log");
        assert!(init(&path, "info").is_err());
    }
}
