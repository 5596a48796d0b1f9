use std::time::Duration;

use colored::Colorize;
use console::Alignment;

use crate::supervisor::Supervisor;
use crate::tunnel::{ExternalTunnel, Source, TunnelRecord, TunnelView, format_timestamp};

pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

pub fn error(msg: &str) {
    println!("{} {}", "✗".red(), msg);
}

/// Print a merged local/external listing.
pub fn print_tunnel_list(views: &[TunnelView], sup: &Supervisor) {
    if views.is_empty() {
        println!("{}", "No tunnels found.".yellow());
        println!();
        println!("To create a tunnel:");
        println!("  {}", "cf-tunnel-buddy add".cyan());
        return;
    }

    let rows: Vec<Vec<String>> = views
        .iter()
        .map(|v| {
            let source = match v.source {
                Source::Local => "Local".to_string(),
                Source::External => "External".dimmed().to_string(),
            };
            vec![
                name_cell(&v.name, sup),
                v.url.clone().unwrap_or_else(|| "-".into()),
                v.hostname.clone().unwrap_or_else(|| "-".into()),
                status_cell(&v.name, sup),
                source,
                format_timestamp(&v.created),
            ]
        })
        .collect();
    print_table(&["Name", "URL", "Hostname", "Status", "Source", "Created"], &rows);

    let local = views.iter().filter(|v| v.source == Source::Local).count();
    println!();
    println!("Total: {}", plural(views.len(), "tunnel"));
    println!("Local: {}, External: {}", local, views.len() - local);
}

/// Local records with their running state.
pub fn print_status_table(records: &[TunnelRecord], sup: &Supervisor) {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                name_cell(&r.name, sup),
                status_cell(&r.name, sup),
                r.url.clone().unwrap_or_else(|| "-".into()),
                r.hostname.clone().unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    println!();
    print_table(&["Name", "Status", "URL", "Hostname"], &rows);

    let running = records.iter().filter(|r| sup.is_running(&r.name)).count();
    println!();
    println!("{}", format!("Total: {}", plural(records.len(), "tunnel")).dimmed());
    println!("{}", format!("Running: {}", running).dimmed());
}

/// Detail block for one record plus whatever cloudflared reports about it.
pub fn print_tunnel_detail(record: &TunnelRecord, sup: &Supervisor, remote: Option<&str>) {
    println!();
    println!("{}", format!("Tunnel: {}", record.name).bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{} {}", "Local Status:".dimmed(), status_cell(&record.name, sup));
    if let Some(pid) = sup.pid(&record.name) {
        println!("{} {}", "PID:".dimmed(), pid);
    }
    println!("{} {}", "Service URL:".dimmed(), record.url.as_deref().unwrap_or("-"));
    println!("{} {}", "Hostname:".dimmed(), record.hostname.as_deref().unwrap_or("-"));
    if let Some(ref id) = record.id {
        println!("{} {}", "Tunnel ID:".dimmed(), id);
    }
    println!("{} {}", "Created:".dimmed(), format_timestamp(&record.created_at));
    if record.imported == Some(true) {
        println!("{} {}", "Imported:".dimmed(), record.imported_at.as_deref().map(format_timestamp).unwrap_or_default());
    }

    match remote {
        Some(info) => {
            println!();
            println!("{}", "Cloudflare Status:".dimmed());
            println!("{}", info.trim_end().dimmed());
        }
        None => println!("{} {}", "Cloudflare Status:".dimmed(), "Not found in Cloudflare".yellow()),
    }
    println!();
}

/// Tunnels as cloudflared lists them.
pub fn print_external_table(tunnels: &[ExternalTunnel]) {
    let rows: Vec<Vec<String>> = tunnels
        .iter()
        .map(|t| {
            let status = if t.is_connected {
                "● Connected".green().to_string()
            } else {
                "○ Disconnected".dimmed().to_string()
            };
            let connections = if t.connections.is_empty() { "-".to_string() } else { t.connections.clone() };
            vec![t.name.clone(), status, connections, t.created.clone()]
        })
        .collect();
    print_table(&["Name", "Status", "Connections", "Created"], &rows);

    let connected = tunnels.iter().filter(|t| t.is_connected).count();
    println!();
    println!("{}", format!("Connected: {}/{}", connected, tunnels.len()).dimmed());
}

fn name_cell(name: &str, sup: &Supervisor) -> String {
    if sup.is_running(name) {
        name.green().bold().to_string()
    } else {
        name.to_string()
    }
}

fn status_cell(name: &str, sup: &Supervisor) -> String {
    match sup.uptime(name) {
        Some(up) => format!("{} {}", "● Running".green(), format!("up {}", format_uptime(up)).dimmed()),
        None => "○ Stopped".dimmed().to_string(),
    }
}

fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(console::measure_text_width(cell));
        }
    }

    let header: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(&h.cyan().to_string(), *w))
        .collect();
    println!("  {}", header.join("  "));

    for row in rows {
        let cells: Vec<String> = row.iter().zip(&widths).map(|(c, w)| pad(c, *w)).collect();
        println!("  {}", cells.join("  ").trim_end());
    }
}

/// Pad an ANSI-colored string to a visible width using console's awareness of escape codes.
fn pad(s: &str, width: usize) -> String {
    console::pad_str(s, width, Alignment::Left, None).to_string()
}

fn plural(n: usize, noun: &str) -> String {
    format!("{} {}{}", n, noun, if n == 1 { "" } else { "s" })
}

/// Format a duration as a human-readable string like "2h 14m" or "3d 1h".
pub fn format_uptime(elapsed: Duration) -> String {
    let elapsed = elapsed.as_secs();
    let days = elapsed / 86400;
    let hours = (elapsed % 86400) / 3600;
    let minutes = (elapsed % 3600) / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_uptime_minutes() {
        assert_eq!(format_uptime(Duration::from_secs(120)), "2m");
        assert_eq!(format_uptime(Duration::from_secs(5)), "1m");
    }

    #[test]
    fn format_uptime_hours() {
        assert_eq!(format_uptime(Duration::from_secs(7200)), "2h 0m");
    }

    #[test]
    fn format_uptime_days() {
        assert_eq!(format_uptime(Duration::from_secs(90000)), "1d 1h");
    }

    #[test]
    fn pad_ignores_color_codes() {
        colored::control::set_override(true);
        let padded = pad(&"abc".green().to_string(), 6);
        assert_eq!(console::measure_text_width(&padded), 6);
        assert!(padded.ends_with("   "));
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "tunnel"), "1 tunnel");
        assert_eq!(plural(0, "tunnel"), "0 tunnels");
    }
}
