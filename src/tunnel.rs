use std::collections::BTreeMap;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A locally persisted tunnel, one element of `tunnels.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TunnelRecord {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<String>,
}

impl TunnelRecord {
    pub fn new(name: &str, id: Option<String>, url: Option<String>, hostname: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            id,
            url,
            hostname,
            created_at: now_timestamp(),
            imported: None,
            imported_at: None,
        }
    }

    /// Record for a tunnel that exists externally but was never configured here.
    pub fn imported(external: &ExternalTunnel) -> Self {
        Self {
            name: external.name.clone(),
            id: Some(external.id.clone()),
            url: None,
            hostname: None,
            created_at: external.created.clone(),
            imported: Some(true),
            imported_at: Some(now_timestamp()),
        }
    }

    /// One-line label used in pickers: `name (url) → hostname`.
    pub fn label(&self) -> String {
        let mut s = format!("{} ({})", self.name, self.url.as_deref().unwrap_or("no url"));
        if let Some(ref h) = self.hostname {
            s.push_str(&format!(" → {}", h));
        }
        s
    }
}

/// Field changes for [`crate::store::Store::update`]. `None` leaves a field
/// untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TunnelPatch {
    pub url: Option<Option<String>>,
    pub hostname: Option<Option<String>>,
}

impl TunnelPatch {
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.hostname.is_none()
    }

    pub fn apply(&self, record: &mut TunnelRecord) {
        if let Some(ref url) = self.url {
            record.url = url.clone();
        }
        if let Some(ref hostname) = self.hostname {
            record.hostname = hostname.clone();
        }
    }
}

/// A tunnel as reported by `cloudflared tunnel list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTunnel {
    pub id: String,
    pub name: String,
    pub created: String,
    pub connections: String,
    pub is_connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Local,
    External,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Local => write!(f, "local"),
            Source::External => write!(f, "external"),
        }
    }
}

/// Combined display row for a tunnel known locally, externally, or both.
#[derive(Debug, Clone, PartialEq)]
pub struct TunnelView {
    pub name: String,
    pub id: Option<String>,
    pub url: Option<String>,
    pub hostname: Option<String>,
    pub created: String,
    pub source: Source,
}

impl TunnelView {
    pub fn label(&self) -> String {
        let mut s = format!("{} ({})", self.name, self.url.as_deref().unwrap_or("no url"));
        if let Some(ref h) = self.hostname {
            s.push_str(&format!(" → {}", h));
        }
        s.push_str(&format!(" [{}]", self.source));
        s
    }
}

/// Merge local and external tunnels by name. Local records win since they
/// carry url and hostname. Output is sorted by name.
pub fn merge_views(local: &[TunnelRecord], external: &[ExternalTunnel]) -> Vec<TunnelView> {
    let mut by_name: BTreeMap<String, TunnelView> = BTreeMap::new();

    for t in external {
        by_name.insert(
            t.name.clone(),
            TunnelView {
                name: t.name.clone(),
                id: Some(t.id.clone()),
                url: None,
                hostname: None,
                created: t.created.clone(),
                source: Source::External,
            },
        );
    }

    for r in local {
        by_name.insert(
            r.name.clone(),
            TunnelView {
                name: r.name.clone(),
                id: r.id.clone(),
                url: r.url.clone(),
                hostname: r.hostname.clone(),
                created: r.created_at.clone(),
                source: Source::Local,
            },
        );
    }

    by_name.into_values().collect()
}

/// External tunnels with no local record of the same name.
pub fn external_only<'a>(local: &[TunnelRecord], external: &'a [ExternalTunnel]) -> Vec<&'a ExternalTunnel> {
    external
        .iter()
        .filter(|e| !local.iter().any(|r| r.name == e.name))
        .collect()
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render a stored timestamp in local time, or return it verbatim if it
/// is not RFC 3339.
pub fn format_timestamp(ts: &str) -> String {
    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => ts.to_string(),
    }
}
