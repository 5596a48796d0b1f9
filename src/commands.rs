use std::fs;
use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::{info, warn};

use crate::cloudflared::Cloudflared;
use crate::config::{Config, Paths};
use crate::display;
use crate::error::{TunnelError, ValidationError};
use crate::interrupt::Interrupts;
use crate::prompt::{Nav, Prompter, any_text, proceed};
use crate::store::Store;
use crate::supervisor::{RunMode, Supervisor};
use crate::tunnel::{
    ExternalTunnel, Source, TunnelPatch, TunnelRecord, TunnelView, external_only, merge_views,
};
use crate::validation::{validate_hostname, validate_url};
use crate::wizard::{self, AddAnswers};

pub const GOODBYE: &str = "Thanks for using Cloudflare Tunnel Buddy!";

/// Everything a handler needs, built once per run.
pub struct App {
    pub paths: Paths,
    pub config: Config,
    pub store: Store,
    pub tool: Cloudflared,
    pub supervisor: Supervisor,
    pub interrupts: Interrupts,
}

impl App {
    pub fn new(paths: Paths, config: Config) -> Self {
        Self {
            store: Store::new(paths.tunnels_file.clone()),
            tool: Cloudflared::new(config.cloudflared.clone()),
            supervisor: Supervisor::new(Duration::from_secs(config.stop_grace_secs)),
            interrupts: Interrupts::new(),
            paths,
            config,
        }
    }

    fn local_and_external(&self) -> (Vec<TunnelRecord>, Vec<ExternalTunnel>) {
        (self.store.load(), self.tool.tunnels())
    }
}

type Outcome = Result<Nav<()>>;

fn done() -> Outcome {
    Ok(Nav::Proceed(()))
}

// ─── Menu ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Add,
    List,
    Start,
    Stop,
    Status,
    Edit,
    Remove,
    Sync,
    Reset,
    Exit,
}

pub const MENU: [(MenuItem, &str); 10] = [
    (MenuItem::Add, "Create a new tunnel"),
    (MenuItem::List, "List all tunnels"),
    (MenuItem::Start, "Start a tunnel"),
    (MenuItem::Stop, "Stop a tunnel"),
    (MenuItem::Status, "Check tunnel status"),
    (MenuItem::Edit, "Edit a tunnel"),
    (MenuItem::Remove, "Remove a tunnel"),
    (MenuItem::Sync, "Import external tunnels"),
    (MenuItem::Reset, "Reset configuration"),
    (MenuItem::Exit, "Exit"),
];

fn clear_screen() {
    let _ = console::Term::stdout().clear_screen();
}

fn banner() {
    println!("{}", "Cloudflare Tunnel Buddy".bold().cyan());
    println!("{}", "Interactive CLI for managing Cloudflare tunnels".dimmed());
    println!();
}

fn is_prompt_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|c| matches!(c.downcast_ref::<TunnelError>(), Some(TunnelError::Prompt(_))))
}

/// The interactive loop. Handler errors are shown and the loop goes on; a
/// broken prompt (closed terminal, Ctrl-C inside a prompt) ends the session.
pub fn run_menu(app: &mut App, p: &mut dyn Prompter) -> Result<()> {
    let labels: Vec<String> = MENU.iter().map(|(_, l)| l.to_string()).collect();

    loop {
        app.supervisor.reap();
        clear_screen();
        banner();

        let choice = match p.select("What would you like to do?", &labels, 0) {
            Ok(idx) => MENU[idx].0,
            Err(e) => {
                info!(error = %e, "menu prompt closed");
                break;
            }
        };

        if choice == MenuItem::Exit {
            if let Err(e) = offer_stop_on_exit(app, p) {
                warn!(error = %e, "exit prompt failed");
            }
            break;
        }

        clear_screen();
        let outcome = dispatch(app, p, choice);
        let pause = match outcome {
            Ok(Nav::Proceed(())) => true,
            Ok(Nav::Back) => false,
            Ok(Nav::Cancel) => {
                display::info("Operation cancelled");
                true
            }
            Err(ref e) if is_prompt_failure(e) => {
                info!(error = %e, "prompt closed during {:?}", choice);
                break;
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "{:?} failed", choice);
                display::error(&format!("{:#}", e));
                true
            }
        };

        if pause && p.wait_for_key().is_err() {
            break;
        }
    }

    println!();
    println!("{}", GOODBYE);
    Ok(())
}

fn dispatch(app: &mut App, p: &mut dyn Prompter, item: MenuItem) -> Outcome {
    match item {
        MenuItem::Add => cmd_add(app, p),
        MenuItem::List => cmd_list(app),
        MenuItem::Start => cmd_start(app, p, None, RunMode::Background),
        MenuItem::Stop => cmd_stop(app, p, None),
        MenuItem::Status => cmd_status(app, p, None),
        MenuItem::Edit => cmd_edit(app, p, None),
        MenuItem::Remove => cmd_remove(app, p, None),
        MenuItem::Sync => cmd_sync(app, p),
        MenuItem::Reset => cmd_reset(app, p, None),
        MenuItem::Exit => done(),
    }
}

/// Leaving the menu: background tunnels survive unless the operator says otherwise.
fn offer_stop_on_exit(app: &mut App, p: &mut dyn Prompter) -> Result<()> {
    app.supervisor.reap();
    let running = app.supervisor.list_running();
    if running.is_empty() {
        return Ok(());
    }

    println!();
    display::warning(&format!(
        "{} tunnel(s) still running: {}",
        running.len(),
        running.join(", ")
    ));
    if p.confirm("Stop them before exiting?", false)? {
        stop_all(app);
    } else {
        display::info("Tunnels will keep running in the background.");
    }
    Ok(())
}

fn stop_all(app: &mut App) {
    for (name, res) in app.supervisor.stop_all() {
        match res {
            Ok(()) => display::success(&format!("Stopped tunnel '{}'", name)),
            Err(e) => display::error(&format!("Failed to stop tunnel '{}': {}", name, e)),
        }
    }
}

// ─── Add ────────────────────────────────────────────────────

pub fn cmd_add(app: &mut App, p: &mut dyn Prompter) -> Outcome {
    let answers = proceed!(wizard::add_wizard(p, &app.store.names())?);
    let record = create_tunnel(app, &answers)
        .with_context(|| format!("failed to create tunnel '{}'", answers.name))?;

    println!();
    display::success(&format!("Tunnel '{}' created successfully!", record.name));
    if let Some(ref id) = record.id {
        println!("  {} {}", "ID:".dimmed(), id);
    }
    println!();
    println!("To start the tunnel, run:");
    println!("  {}", format!("cf-tunnel-buddy start {}", record.name).cyan());
    done()
}

/// Create externally, route DNS, then persist. A failed route leaves the
/// tunnel usable, so it is reported and the record is still saved.
fn create_tunnel(app: &App, answers: &AddAnswers) -> Result<TunnelRecord> {
    if app.store.get(&answers.name).is_some() {
        return Err(TunnelError::DuplicateName(answers.name.clone()).into());
    }
    app.tool.ensure_authenticated()?;

    println!("Creating tunnel '{}'...", answers.name);
    let id = app.tool.create(&answers.name)?;
    if id.is_none() {
        display::warning("cloudflared did not report a tunnel ID");
    }

    if let Some(ref hostname) = answers.hostname {
        match app.tool.route_dns(&answers.name, hostname) {
            Ok(()) => display::success(&format!("DNS route {} → {}", hostname, answers.name)),
            Err(e) => {
                warn!(name = %answers.name, %hostname, error = %e, "dns route failed");
                display::warning(&format!("Could not route DNS for {}: {}", hostname, e));
            }
        }
    }

    let record = TunnelRecord::new(
        &answers.name,
        id,
        Some(answers.url.clone()),
        answers.hostname.clone(),
    );
    app.store.add(record.clone())?;
    Ok(record)
}

// ─── List / status ──────────────────────────────────────────

pub fn cmd_list(app: &mut App) -> Outcome {
    println!("{}", "Loading tunnels...".dimmed());
    let (local, external) = app.local_and_external();
    app.supervisor.reap();
    let views = merge_views(&local, &external);
    println!();
    display::print_tunnel_list(&views, &app.supervisor);
    done()
}

pub fn cmd_status(app: &mut App, p: &mut dyn Prompter, name: Option<String>) -> Outcome {
    app.supervisor.reap();
    let records = app.store.load();
    if records.is_empty() {
        display::info("No tunnels configured.");
        return done();
    }

    let name = match name {
        Some(n) => n,
        None if records.len() <= 5 => return show_all_status(app, &records),
        None => {
            let mut items = vec!["Show all tunnels".to_string()];
            items.extend(records.iter().map(|r| r.name.clone()));
            match proceed!(p.select_nav("Select tunnel to check status:", &items)?) {
                0 => return show_all_status(app, &records),
                i => records[i - 1].name.clone(),
            }
        }
    };

    let Some(record) = records.iter().find(|r| r.name == name) else {
        display::error(&format!("Tunnel '{}' not found", name));
        return done();
    };
    let remote = app.tool.info(&record.name);
    display::print_tunnel_detail(record, &app.supervisor, remote.as_deref());
    done()
}

fn show_all_status(app: &App, records: &[TunnelRecord]) -> Outcome {
    display::print_status_table(records, &app.supervisor);

    match app.tool.list() {
        Ok(out) => {
            println!();
            println!("{}", "Cloudflare Tunnels:".bold());
            println!("{}", out.trim_end().dimmed());
        }
        Err(e) => {
            println!();
            display::warning(&format!("Could not fetch Cloudflare tunnel list: {}", e));
        }
    }
    done()
}

// ─── Start / stop ───────────────────────────────────────────

pub fn cmd_start(app: &mut App, p: &mut dyn Prompter, name: Option<String>, mode: RunMode) -> Outcome {
    app.supervisor.reap();
    let (local, external) = app.local_and_external();

    if local.is_empty() {
        let pending = external_only(&local, &external);
        if pending.is_empty() {
            display::info("No tunnels configured.");
            println!();
            println!("{}", "To create a tunnel, run:".dimmed());
            println!("  {}", "cf-tunnel-buddy add".cyan());
        } else {
            display::info("No local tunnels configured to start.");
            print_pending_imports(&pending);
            println!("Use the \"sync\" command to import external tunnels, then edit them to add URL configuration.");
        }
        return done();
    }

    let name = match name {
        Some(n) => n,
        None => {
            let available: Vec<&TunnelRecord> = local
                .iter()
                .filter(|r| !app.supervisor.is_running(&r.name))
                .collect();
            if available.is_empty() {
                display::info("All local tunnels are already running.");
                return done();
            }
            let items: Vec<String> = available.iter().map(|r| r.label()).collect();
            let idx = proceed!(p.select_nav("Select tunnel to start:", &items)?);
            available[idx].name.clone()
        }
    };

    let Some(record) = local.iter().find(|r| r.name == name) else {
        display::error(&format!("Tunnel '{}' not found", name));
        return done();
    };
    if app.supervisor.is_running(&name) {
        display::warning(&format!("Tunnel '{}' is already running", name));
        return done();
    }

    println!("Starting tunnel '{}'...", name);
    let pid = app
        .supervisor
        .start(&app.store, &name, &app.tool, mode)
        .with_context(|| format!("failed to start tunnel '{}'", name))?;

    match mode {
        RunMode::Background => {
            display::success(&format!("Tunnel '{}' started (pid {})", name, pid));
            println!();
            if let Some(ref h) = record.hostname {
                println!("  {} {}", "Public URL:".green(), format!("https://{}", h).cyan());
            }
            println!("  {} {}", "Service:".dimmed(), record.url.as_deref().unwrap_or("-"));
            println!();
            println!("{}", "Tunnel is running in the background.".dimmed());
            println!("{}", "Use \"Stop a tunnel\" from the menu to stop it.".dimmed());
        }
        RunMode::Foreground => {
            display::info(&format!("Tunnel '{}' running in the foreground. Press Ctrl+C to stop.", name));
            let code = app.supervisor.wait_foreground(&name, &app.interrupts)?;
            match code {
                Some(0) | None => display::success(&format!("Tunnel '{}' stopped", name)),
                Some(c) => display::warning(&format!("Tunnel '{}' exited with code {}", name, c)),
            }
        }
    }
    done()
}

pub fn cmd_stop(app: &mut App, p: &mut dyn Prompter, name: Option<String>) -> Outcome {
    app.supervisor.reap();
    let running = app.supervisor.list_running();
    if running.is_empty() {
        display::info("No tunnels are currently running.");
        return done();
    }

    let name = match name {
        Some(n) => n,
        None if running.len() == 1 => running[0].clone(),
        None => {
            let idx = proceed!(p.select_nav("Select tunnel to stop:", &running)?);
            running[idx].clone()
        }
    };

    if !running.contains(&name) {
        display::error(&format!("Tunnel '{}' is not running", name));
        return done();
    }

    app.supervisor
        .stop(&name)
        .with_context(|| format!("failed to stop tunnel '{}'", name))?;
    display::success(&format!("Tunnel '{}' stopped", name));
    done()
}

// ─── Edit ───────────────────────────────────────────────────

/// Only fields that actually change end up in the patch. An empty hostname clears it.
pub fn edit_patch(record: &TunnelRecord, url: Option<String>, hostname: Option<String>) -> TunnelPatch {
    let mut patch = TunnelPatch::default();
    if let Some(url) = url {
        if record.url.as_deref() != Some(url.as_str()) {
            patch.url = Some(Some(url));
        }
    }
    if let Some(h) = hostname {
        let h = (!h.is_empty()).then_some(h);
        if record.hostname != h {
            patch.hostname = Some(h);
        }
    }
    patch
}

fn optional_hostname(value: &str) -> std::result::Result<(), ValidationError> {
    if value.is_empty() {
        Ok(())
    } else {
        validate_hostname(value)
    }
}

pub fn cmd_edit(app: &mut App, p: &mut dyn Prompter, name: Option<String>) -> Outcome {
    let (local, external) = app.local_and_external();
    let pending = external_only(&local, &external);

    if local.is_empty() {
        if pending.is_empty() {
            display::info("No tunnels to edit.");
        } else {
            display::info("No local tunnels to edit.");
            print_pending_imports(&pending);
            println!("Use the \"sync\" command to import external tunnels before editing.");
        }
        return done();
    }

    let name = match name {
        Some(n) => n,
        None => {
            let mut items: Vec<String> = local.iter().map(|r| r.label()).collect();
            if !pending.is_empty() {
                items.push(
                    format!("--- {} external tunnel(s) available via sync ---", pending.len())
                        .dimmed()
                        .to_string(),
                );
            }
            let idx = proceed!(p.select_nav("Select tunnel to edit:", &items)?);
            if idx >= local.len() {
                display::info("External tunnels need to be imported first using the sync command.");
                return done();
            }
            local[idx].name.clone()
        }
    };

    let Some(record) = local.iter().find(|r| r.name == name) else {
        display::error(&format!("Tunnel '{}' not found", name));
        return done();
    };

    println!();
    display::info("Current configuration:");
    println!("  {} {}", "Name:".dimmed(), record.name);
    println!("  {} {}", "URL:".dimmed(), record.url.as_deref().unwrap_or("-"));
    println!("  {} {}", "Hostname:".dimmed(), record.hostname.as_deref().unwrap_or("-"));
    println!();

    let items = ["Service URL", "Hostname", "Both URL and Hostname"].map(String::from);
    let choice = proceed!(p.select_nav("What would you like to edit?", &items)?);

    let new_url = if choice == 0 || choice == 2 {
        Some(p.input("New service URL:", record.url.as_deref(), &validate_url)?)
    } else {
        None
    };
    let new_hostname = if choice == 1 || choice == 2 {
        Some(p.edit_text(
            "New hostname (leave empty to remove):",
            record.hostname.as_deref().unwrap_or(""),
            &optional_hostname,
        )?)
    } else {
        None
    };

    let patch = edit_patch(record, new_url, new_hostname);
    if patch.is_empty() {
        display::info("No changes to apply.");
        return done();
    }

    println!();
    display::info("Changes to apply:");
    if let Some(Some(ref url)) = patch.url {
        println!(
            "  {} {} → {}",
            "URL:".dimmed(),
            record.url.as_deref().unwrap_or("(none)").red(),
            url.green()
        );
    }
    if let Some(ref h) = patch.hostname {
        println!(
            "  {} {} → {}",
            "Hostname:".dimmed(),
            record.hostname.as_deref().unwrap_or("(none)").red(),
            h.as_deref().unwrap_or("(none)").green()
        );
    }
    println!();

    if !p.confirm("Apply these changes?", true)? {
        display::info("Edit cancelled");
        return done();
    }

    app.store
        .update(&name, &patch)
        .with_context(|| format!("failed to update tunnel '{}'", name))?;

    if let Some(Some(ref hostname)) = patch.hostname {
        match app.tool.route_dns(&name, hostname) {
            Ok(()) => display::success("DNS route updated"),
            Err(e) => {
                warn!(%name, %hostname, error = %e, "dns route update failed");
                display::warning(&format!("Could not update DNS route: {}", e));
            }
        }
    }

    display::success(&format!("Tunnel '{}' updated successfully", name));
    done()
}

// ─── Remove ─────────────────────────────────────────────────

pub fn cmd_remove(app: &mut App, p: &mut dyn Prompter, name: Option<String>) -> Outcome {
    let (local, external) = app.local_and_external();
    let views = merge_views(&local, &external);
    if views.is_empty() {
        display::info("No tunnels to remove.");
        return done();
    }

    let name = match name {
        Some(n) => n,
        None => {
            let items: Vec<String> = views.iter().map(|v| v.label()).collect();
            let idx = proceed!(p.select_nav("Select tunnel to remove:", &items)?);
            views[idx].name.clone()
        }
    };

    let Some(view) = views.iter().find(|v| v.name == name) else {
        display::error(&format!("Tunnel '{}' not found", name));
        return done();
    };

    println!();
    display::warning("This will remove the following tunnel:");
    println!("  {} {}", "Name:".dimmed(), view.name);
    if let Some(ref id) = view.id {
        println!("  {} {}", "ID:".dimmed(), id);
    }
    println!("  {} {}", "URL:".dimmed(), view.url.as_deref().unwrap_or("-"));
    if let Some(ref h) = view.hostname {
        println!("  {} {}", "Hostname:".dimmed(), h);
    }
    println!("  {} {}", "Source:".dimmed(), view.source);
    if view.source == Source::External {
        println!("  {}", "Note: This will only remove from Cloudflare, not local config".yellow());
    }
    println!();

    if !p.confirm(&"Are you sure you want to remove this tunnel?".red().to_string(), false)? {
        display::info("Removal cancelled");
        return done();
    }

    remove_tunnel(app, view).with_context(|| format!("failed to remove tunnel '{}'", name))?;
    display::success(&format!("Tunnel '{}' removed successfully", name));
    done()
}

/// Stop, delete externally, then drop the local record. For a local record
/// the first two are best effort so local state always follows the request.
fn remove_tunnel(app: &mut App, view: &TunnelView) -> Result<()> {
    if view.source == Source::External {
        app.tool.delete(&view.name)?;
        return Ok(());
    }

    if app.supervisor.is_running(&view.name) {
        match app.supervisor.stop(&view.name) {
            Ok(()) => display::success(&format!("Stopped tunnel '{}'", view.name)),
            Err(e) => {
                warn!(name = %view.name, error = %e, "stop before remove failed");
                display::warning(&format!("Could not stop tunnel: {}", e));
            }
        }
    }

    if let Err(e) = app.tool.delete(&view.name) {
        warn!(name = %view.name, error = %e, "external delete failed");
        display::warning(&format!("Could not delete tunnel from Cloudflare: {}", e));
    }

    app.store.remove(&view.name)?;
    Ok(())
}

// ─── Sync ───────────────────────────────────────────────────

fn print_pending_imports(pending: &[&ExternalTunnel]) {
    println!();
    println!(
        "Found {} external tunnel(s) that need to be imported first:",
        pending.len()
    );
    for t in pending {
        println!("  • {}", t.name);
    }
    println!();
}

/// Copy external tunnels into the store. Returns how many were added.
pub fn import_tunnels(store: &Store, tunnels: &[&ExternalTunnel]) -> Result<usize> {
    let mut imported = 0;
    for t in tunnels {
        match store.add(TunnelRecord::imported(t)) {
            Ok(()) => {
                println!("Imported: {}", t.name);
                imported += 1;
            }
            Err(TunnelError::DuplicateName(n)) => {
                display::warning(&format!("Skipped '{}': already tracked locally", n));
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!(count = imported, "imported external tunnels");
    Ok(imported)
}

pub fn cmd_sync(app: &mut App, p: &mut dyn Prompter) -> Outcome {
    println!("Fetching tunnels from Cloudflare...");
    let (local, external) = app.local_and_external();
    let new = external_only(&local, &external);

    if new.is_empty() {
        println!("All Cloudflare tunnels are already tracked locally.");
        return done();
    }

    println!();
    println!("Found {} tunnel(s) in Cloudflare that are not tracked locally:", new.len());
    println!();
    for t in &new {
        println!("  • {} ({})", t.name, t.id.dimmed());
    }
    println!();

    if p.confirm("Import all external tunnels?", true)? {
        let count = import_tunnels(&app.store, &new)?;
        println!();
        display::success(&format!("Successfully imported {} tunnel(s)!", count));
        println!();
        println!("Note: Imported tunnels will show URL as \"-\" until you edit them.");
        println!("Use \"Edit a tunnel\" to add URL and hostname information.");
        return done();
    }

    let mut items: Vec<String> = new
        .iter()
        .map(|t| format!("{} (ID: {}...)", t.name, t.id.chars().take(8).collect::<String>()))
        .collect();
    items.push("None - cancel import".to_string());

    let idx = p.select("Select tunnel to import:", &items, 0)?;
    if idx >= new.len() {
        println!("Import cancelled.");
        return done();
    }
    import_tunnels(&app.store, &new[idx..=idx])?;
    done()
}

// ─── Reset ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    /// Only the record file.
    Tunnels,
    /// The whole config directory.
    All,
}

pub fn reset_token_matches(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("RESET")
}

/// Delete what `scope` covers. Already-missing files are fine.
pub fn apply_reset(paths: &Paths, scope: ResetScope) -> Result<()> {
    let res = match scope {
        ResetScope::Tunnels => fs::remove_file(&paths.tunnels_file),
        ResetScope::All => fs::remove_dir_all(&paths.config_dir),
    };
    match res {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e).context("failed to reset configuration"),
    }
    info!(?scope, "configuration reset");
    Ok(())
}

pub fn cmd_reset(app: &mut App, p: &mut dyn Prompter, scope: Option<ResetScope>) -> Outcome {
    if !app.paths.config_dir.exists() {
        display::info("No configuration found to reset.");
        return done();
    }

    app.supervisor.reap();
    let running = app.supervisor.list_running();
    if !running.is_empty() {
        display::warning(&format!("{} tunnel(s) are currently running.", running.len()));
        if !p.confirm("Stop all running tunnels before reset?", true)? {
            display::info("Reset cancelled. Please stop all tunnels before resetting.");
            return done();
        }
        stop_all(app);
    }

    let scope = match scope {
        Some(s) => s,
        None => {
            let items = ["Everything (complete reset)", "Tunnel configurations only"].map(String::from);
            match proceed!(p.select_nav("What would you like to reset?", &items)?) {
                0 => ResetScope::All,
                _ => ResetScope::Tunnels,
            }
        }
    };

    println!();
    display::warning("The following will be deleted:");
    match scope {
        ResetScope::All => {
            println!("  {} Configuration directory: {}", "•".red(), app.paths.config_dir.display());
            println!("  {} All tunnel configurations", "•".red());
            println!("  {} Settings and logs", "•".red());
        }
        ResetScope::Tunnels => {
            println!("  {} Tunnel configurations: {}", "•".red(), app.paths.tunnels_file.display());
        }
    }
    println!();

    let confirmed = match scope {
        ResetScope::All => {
            let typed = p.input("Type \"RESET\" to confirm complete reset:", None, &any_text)?;
            reset_token_matches(&typed)
        }
        ResetScope::Tunnels => p.confirm(&"Are you sure you want to continue?".red().to_string(), false)?,
    };
    if !confirmed {
        display::info("Reset cancelled");
        return done();
    }

    apply_reset(&app.paths, scope)?;
    display::success("Configuration reset successfully");
    println!();
    match scope {
        ResetScope::All => {
            display::info("All configuration has been removed.");
            println!("{} {} {}", "Run".dimmed(), "cf-tunnel-buddy add".cyan(), "to create a new tunnel.".dimmed());
        }
        ResetScope::Tunnels => display::info("Tunnel configurations have been removed."),
    }
    done()
}

// ─── Tool status / config ───────────────────────────────────

pub fn cmd_tool_status(app: &mut App) -> Outcome {
    println!();
    println!("{}", "Cloudflared Status".bold());
    println!("{}", "─".repeat(50).dimmed());
    println!();

    let Some(version) = app.tool.version() else {
        display::error(&format!("cloudflared is not installed ({})", app.tool.binary()));
        println!();
        println!("{}", "To install cloudflared:".yellow());
        println!("{}", "  brew install cloudflared".dimmed());
        println!(
            "{}",
            "  or visit: https://developers.cloudflare.com/cloudflare-one/connections/connect-apps/install-and-setup/installation"
                .dimmed()
        );
        return done();
    };
    display::success("cloudflared is installed");
    if !version.is_empty() {
        println!("  {} {}", "Version:".dimmed(), version);
    }
    println!();

    if !app.tool.is_authenticated() {
        display::error("Not authenticated with Cloudflare");
        println!();
        println!("{}", "To authenticate:".yellow());
        println!("{}", "  Run: cloudflared tunnel login".dimmed());
        println!("{}", "  Or use the \"Create a new tunnel\" option which will prompt for login".dimmed());
        return done();
    }
    display::success("Authenticated with Cloudflare");
    println!();

    let tunnels = app.tool.tunnels();
    if tunnels.is_empty() {
        println!("{}", "No tunnels found in your Cloudflare account".dimmed());
    } else {
        println!("{}", format!("Tunnels in Cloudflare Account ({}):", tunnels.len()).bold());
        println!();
        display::print_external_table(&tunnels);
    }
    println!();
    done()
}

pub fn cmd_config(app: &mut App) -> Outcome {
    let path = Config::init(&app.paths.settings_file)?;
    println!("{} {}", "Config file:".dimmed(), path.display());
    println!("{} {}", "Tunnels file:".dimmed(), app.store.path().display());
    println!("{} {}", "Log file:".dimmed(), app.paths.log_file.display());
    println!();
    let current = toml::to_string_pretty(&app.config).context("failed to serialize config")?;
    print!("{}", current);
    done()
}
