use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".cf-tunnel-buddy";

/// Filesystem locations used by the tool, all under one config directory.
#[derive(Debug, Clone)]
pub struct Paths {
    pub config_dir: PathBuf,
    pub tunnels_file: PathBuf,
    pub settings_file: PathBuf,
    pub log_file: PathBuf,
}

impl Paths {
    /// Resolve `~/.cf-tunnel-buddy`.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Ok(Self::rooted_at(home.join(APP_DIR)))
    }

    pub fn rooted_at(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            tunnels_file: config_dir.join("tunnels.json"),
            settings_file: config_dir.join("config.toml"),
            log_file: config_dir.join("buddy.log"),
            config_dir,
        }
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir)
            .with_context(|| format!("failed to create {}", self.config_dir.display()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// cloudflared binary name or absolute path
    pub cloudflared: String,
    /// Log filter for ~/.cf-tunnel-buddy/buddy.log (error, warn, info, debug, trace)
    pub log_level: String,
    /// Shell for completions (bash, zsh, fish)
    pub shell: Option<String>,
    /// Seconds to wait after SIGTERM before killing a tunnel
    pub stop_grace_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cloudflared: "cloudflared".to_string(),
            log_level: "info".to_string(),
            shell: None,
            stop_grace_secs: 5,
        }
    }
}

impl Config {
    /// Load settings from `path`, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Write a default settings file if none exists. Returns the path.
    pub fn init(path: &Path) -> Result<PathBuf> {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let default = Self::default();
        let content = toml::to_string_pretty(&default)
            .context("failed to serialize default config")?;
        fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("config.toml"));
        assert_eq!(cfg.cloudflared, "cloudflared");
        assert_eq!(cfg.stop_grace_secs, 5);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "cloudflared = \"/opt/bin/cloudflared\"\n").unwrap();
        let cfg = Config::load(&path);
        assert_eq!(cfg.cloudflared, "/opt/bin/cloudflared");
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn garbage_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is = = not toml").unwrap();
        assert_eq!(Config::load(&path).cloudflared, "cloudflared");
    }

    #[test]
    fn init_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::init(&path).unwrap();
        fs::write(&path, "log_level = \"debug\"\n").unwrap();
        Config::init(&path).unwrap();
        assert_eq!(Config::load(&path).log_level, "debug");
    }

    #[test]
    fn paths_share_one_directory() {
        let paths = Paths::rooted_at("/tmp/buddy");
        assert_eq!(paths.tunnels_file, PathBuf::from("/tmp/buddy/tunnels.json"));
        assert_eq!(paths.settings_file.parent(), Some(paths.config_dir.as_path()));
    }
}
