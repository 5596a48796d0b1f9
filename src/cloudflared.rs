//! Thin wrapper around the `cloudflared` binary.
//!
//! Every operation is one invocation with a fixed argument shape. Output of
//! `tunnel list` is not a committed format, so [`parse_list`] treats anything
//! it doesn't recognize as "no tunnels" rather than an error.

use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Output, Stdio};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{Result, TunnelError};
use crate::supervisor::{Launcher, RunMode};
use crate::tunnel::{ExternalTunnel, TunnelRecord};

/// Substring cloudflared prints when no origin certificate is present.
pub const LOGIN_MARKER: &str = "please login";

static TUNNEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-f0-9-]{36})").expect("valid tunnel id regex"));

// Connector summaries look like "2xdac" or "1xLAX, 1xSJC".
static CONNECTION_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d+x[0-9a-z]+").expect("valid connection regex"));

#[derive(Debug, Clone)]
pub struct Cloudflared {
    binary: String,
}

impl Cloudflared {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn command(&self) -> Command {
        Command::new(&self.binary)
    }

    /// Run to completion, capturing output. Non-zero exit becomes
    /// `ExternalTool` carrying the tool's own message.
    fn run_captured(&self, args: &[&str]) -> Result<String> {
        debug!(binary = %self.binary, ?args, "invoking cloudflared");
        let output = self.command().args(args).output().map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            let msg = failure_message(&output);
            warn!(?args, status = %output.status, %msg, "cloudflared failed");
            return Err(TunnelError::ExternalTool(msg));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn spawn_error(&self, e: std::io::Error) -> TunnelError {
        if e.kind() == std::io::ErrorKind::NotFound {
            TunnelError::NotInstalled(self.binary.clone())
        } else {
            TunnelError::ExternalTool(format!("failed to run {}: {}", self.binary, e))
        }
    }

    pub fn is_installed(&self) -> bool {
        self.version().is_some()
    }

    /// First line of `cloudflared --version`, if the probe succeeds.
    pub fn version(&self) -> Option<String> {
        let out = self.run_captured(&["--version"]).ok()?;
        Some(out.lines().next().unwrap_or("").trim().to_string())
    }

    /// Fails closed: any invocation problem counts as not authenticated.
    pub fn is_authenticated(&self) -> bool {
        let output = match self.command().args(["tunnel", "list"]).output() {
            Ok(o) => o,
            Err(e) => {
                debug!(error = %e, "auth probe could not run");
                return false;
            }
        };
        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if combined.to_lowercase().contains(LOGIN_MARKER) {
            return false;
        }
        output.status.success()
    }

    /// Interactive login; inherits the terminal so the browser prompt is visible.
    pub fn login(&self) -> Result<()> {
        info!("starting cloudflared login");
        let status = self
            .command()
            .args(["tunnel", "login"])
            .status()
            .map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            return Err(TunnelError::Auth(format!("cloudflared login exited with {}", status)));
        }
        Ok(())
    }

    /// Check installation, then log in if needed.
    pub fn ensure_authenticated(&self) -> Result<()> {
        if !self.is_installed() {
            return Err(TunnelError::NotInstalled(self.binary.clone()));
        }
        if !self.is_authenticated() {
            println!("You need to authenticate with Cloudflare first.");
            self.login()?;
        }
        Ok(())
    }

    /// Create a named tunnel. The id is `None` if the output carries no
    /// UUID-shaped token.
    pub fn create(&self, name: &str) -> Result<Option<String>> {
        let out = self.run_captured(&["tunnel", "create", name])?;
        let id = extract_tunnel_id(&out);
        info!(name, id = id.as_deref().unwrap_or("-"), "created tunnel");
        Ok(id)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        self.run_captured(&["tunnel", "delete", name])?;
        info!(name, "deleted tunnel");
        Ok(())
    }

    pub fn route_dns(&self, name: &str, hostname: &str) -> Result<()> {
        self.run_captured(&["tunnel", "route", "dns", name, hostname])?;
        info!(name, hostname, "routed dns");
        Ok(())
    }

    /// Raw `tunnel list` output for display.
    pub fn list(&self) -> Result<String> {
        self.run_captured(&["tunnel", "list"])
    }

    /// Raw `tunnel info` output, or `None` if the tool has nothing to say.
    pub fn info(&self, name: &str) -> Option<String> {
        self.run_captured(&["tunnel", "info", name]).ok()
    }

    /// Parsed tunnel list. Any failure yields an empty list.
    pub fn tunnels(&self) -> Vec<ExternalTunnel> {
        match self.list() {
            Ok(out) => parse_list(&out),
            Err(e) => {
                debug!(error = %e, "could not list external tunnels");
                Vec::new()
            }
        }
    }

    /// Spawn `tunnel run` for a record. Background children get their own
    /// process group and no stdio so they outlive this process and ignore
    /// terminal interrupts.
    pub fn spawn_run(&self, record: &TunnelRecord, mode: RunMode) -> Result<Child> {
        let args = run_args(record);
        let mut cmd = self.command();
        cmd.args(&args);
        match mode {
            RunMode::Background => {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .process_group(0);
            }
            RunMode::Foreground => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }
        let child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        info!(name = %record.name, pid = child.id(), ?mode, ?args, "spawned tunnel");
        Ok(child)
    }
}

impl Launcher for Cloudflared {
    fn ensure_authenticated(&self) -> Result<()> {
        Cloudflared::ensure_authenticated(self)
    }

    fn launch(&self, record: &TunnelRecord, mode: RunMode) -> Result<Child> {
        self.spawn_run(record, mode)
    }
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !stdout.is_empty() {
        return stdout;
    }
    format!("cloudflared exited with {}", output.status)
}

/// `tunnel run [--url <url> [--no-tls-verify]] <name>`.
///
/// HTTPS origins skip certificate verification so self-signed local
/// servers work. This weakens origin verification.
pub fn run_args(record: &TunnelRecord) -> Vec<String> {
    let mut args = vec!["tunnel".to_string(), "run".to_string()];
    if let Some(ref url) = record.url {
        args.push("--url".to_string());
        args.push(url.clone());
        if url.to_ascii_lowercase().starts_with("https://") {
            args.push("--no-tls-verify".to_string());
        }
    }
    args.push(record.name.clone());
    args
}

pub fn extract_tunnel_id(output: &str) -> Option<String> {
    TUNNEL_ID
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Best-effort; only as good as the connector summary format.
pub fn is_connected(connections: &str) -> bool {
    CONNECTION_COUNT.is_match(connections)
}

/// Parse `cloudflared tunnel list` output.
///
/// Rows before the `ID NAME CREATED` header are ignored. Each later
/// non-blank row is split on whitespace into id, name, created and the
/// rest joined as connections. Rows with fewer than three fields are skipped.
pub fn parse_list(output: &str) -> Vec<ExternalTunnel> {
    let mut tunnels = Vec::new();
    let mut in_table = false;

    for line in output.lines() {
        if !in_table {
            if line.contains("ID") && line.contains("NAME") && line.contains("CREATED") {
                in_table = true;
            }
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }
        let connections = parts[3..].join(" ");
        tunnels.push(ExternalTunnel {
            id: parts[0].to_string(),
            name: parts[1].to_string(),
            created: parts[2].to_string(),
            is_connected: is_connected(&connections),
            connections,
        });
    }

    tunnels
}
