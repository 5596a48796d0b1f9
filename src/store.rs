use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, TunnelError};
use crate::tunnel::{TunnelPatch, TunnelRecord};

/// The local record file: one pretty-printed JSON array, rewritten whole
/// on every mutation. Single writer assumed.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records. A missing or unreadable file reads as empty.
    pub fn load(&self) -> Vec<TunnelRecord> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable tunnel file");
                return Vec::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring malformed tunnel file");
                Vec::new()
            }
        }
    }

    /// Replace the file contents. Writes a sibling temp file and renames it
    /// over the original.
    pub fn save(&self, records: &[TunnelRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(records)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), count = records.len(), "saved tunnel records");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<TunnelRecord> {
        self.load().into_iter().find(|r| r.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.load().into_iter().map(|r| r.name).collect()
    }

    pub fn add(&self, record: TunnelRecord) -> Result<()> {
        let mut records = self.load();
        if records.iter().any(|r| r.name == record.name) {
            return Err(TunnelError::DuplicateName(record.name));
        }
        debug!(name = %record.name, "adding tunnel record");
        records.push(record);
        self.save(&records)
    }

    /// Shallow-merge `patch` into the named record.
    pub fn update(&self, name: &str, patch: &TunnelPatch) -> Result<TunnelRecord> {
        let mut records = self.load();
        let record = records
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| TunnelError::NotFound(name.to_string()))?;
        patch.apply(record);
        let updated = record.clone();
        debug!(name, ?patch, "updating tunnel record");
        self.save(&records)?;
        Ok(updated)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut records = self.load();
        let before = records.len();
        records.retain(|r| r.name != name);
        if records.len() == before {
            return Err(TunnelError::NotFound(name.to_string()));
        }
        debug!(name, "removing tunnel record");
        self.save(&records)
    }
}
