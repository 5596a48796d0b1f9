use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::ValidationError;

static TUNNEL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid tunnel name regex"));

// Dot-separated labels of 1-63 alphanumerics/hyphens, no leading or trailing hyphen.
static HOSTNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)*[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$",
    )
    .expect("valid hostname regex")
});

pub fn validate_tunnel_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new("Tunnel name is required"));
    }
    if name.chars().count() < 3 {
        return Err(ValidationError::new(
            "Tunnel name must be at least 3 characters long",
        ));
    }
    if !TUNNEL_NAME.is_match(name) {
        return Err(ValidationError::new(
            "Tunnel name can only contain letters, numbers, hyphens, and underscores",
        ));
    }
    Ok(())
}

/// Accepts http, https, tcp, ssh and rdp URLs with a host and an optional port.
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    let parsed = Url::parse(url.trim()).map_err(|_| ValidationError::new("Invalid URL format"))?;
    if !matches!(parsed.scheme(), "http" | "https" | "tcp" | "ssh" | "rdp") {
        return Err(ValidationError::new(
            "URL must use http, https, tcp, ssh, or rdp protocol",
        ));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ValidationError::new("Invalid URL format"));
    }
    if parsed.port() == Some(0) {
        return Err(ValidationError::new("Port must be between 1 and 65535"));
    }
    Ok(())
}

pub fn validate_hostname(hostname: &str) -> Result<(), ValidationError> {
    if hostname.is_empty() {
        return Err(ValidationError::new("Hostname is required"));
    }
    if !HOSTNAME.is_match(hostname) {
        return Err(ValidationError::new("Invalid hostname format"));
    }
    Ok(())
}

pub fn validate_port(port: &str) -> Result<(), ValidationError> {
    let port: u32 = port
        .trim()
        .parse()
        .map_err(|_| ValidationError::new("Port must be a number"))?;
    if !(1..=65535).contains(&port) {
        return Err(ValidationError::new("Port must be between 1 and 65535"));
    }
    Ok(())
}
