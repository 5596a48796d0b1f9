mod cli;
mod cloudflared;
mod commands;
mod config;
mod display;
mod error;
mod interrupt;
mod logging;
mod prompt;
mod store;
mod supervisor;
mod tunnel;
mod validation;
mod wizard;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing::info;

use cli::{Cli, Command};
use commands::{App, ResetScope};
use config::{Config, Paths};
use prompt::{DialoguerPrompter, Nav};
use supervisor::RunMode;

fn main() -> Result<()> {
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
        console::set_colors_enabled(false);
    }

    let paths = Paths::from_home()?;
    paths.ensure_config_dir()?;
    let cfg = Config::load(&paths.settings_file);

    if let Err(e) = logging::init(&paths.log_file, &cfg.log_level) {
        eprintln!("{} logging disabled: {:#}", "⚠".yellow(), e);
    }
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let mut app = App::new(paths, cfg);
    if let Err(e) = app.interrupts.install(on_interrupt) {
        eprintln!("{} {:#}", "⚠".yellow(), e);
    }
    let mut prompter = DialoguerPrompter::new();
    let p = &mut prompter;

    let outcome = match cli.command {
        None => return commands::run_menu(&mut app, p),
        Some(Command::Add) => commands::cmd_add(&mut app, p),
        Some(Command::List) => commands::cmd_list(&mut app),
        Some(Command::Start { name, foreground }) => {
            let mode = if foreground { RunMode::Foreground } else { RunMode::Background };
            commands::cmd_start(&mut app, p, name, mode)
        }
        Some(Command::Stop { name }) => commands::cmd_stop(&mut app, p, name),
        Some(Command::Status { name }) => commands::cmd_status(&mut app, p, name),
        Some(Command::Edit { name }) => commands::cmd_edit(&mut app, p, name),
        Some(Command::Remove { name }) => commands::cmd_remove(&mut app, p, name),
        Some(Command::Sync) => commands::cmd_sync(&mut app, p),
        Some(Command::Reset { all, tunnels_only }) => {
            let scope = match (all, tunnels_only) {
                (true, _) => Some(ResetScope::All),
                (_, true) => Some(ResetScope::Tunnels),
                _ => None,
            };
            commands::cmd_reset(&mut app, p, scope)
        }
        Some(Command::ToolStatus) => commands::cmd_tool_status(&mut app),
        Some(Command::Config) => commands::cmd_config(&mut app),
        Some(Command::Completions { shell }) => return cmd_completions(shell, &app.config),
    }?;

    if outcome == Nav::Cancel {
        display::info("Operation cancelled");
    }
    Ok(())
}

/// Ctrl+C outside a foreground tunnel ends the program.
fn on_interrupt() {
    let _ = console::Term::stdout().show_cursor();
    println!();
    println!("{}", commands::GOODBYE);
}

fn cmd_completions(shell: Option<clap_complete::Shell>, cfg: &Config) -> Result<()> {
    let shell = match shell {
        Some(s) => s,
        None => {
            let name = cfg.shell.as_deref().ok_or_else(|| {
                anyhow::anyhow!(
                    "no shell specified: use `cf-tunnel-buddy completions <shell>` or set `shell` in ~/.cf-tunnel-buddy/config.toml"
                )
            })?;
            name.parse::<clap_complete::Shell>()
                .map_err(|_| anyhow::anyhow!("unknown shell '{}' in config", name))?
        }
    };

    let shell_name = match shell {
        clap_complete::Shell::Bash => "bash",
        clap_complete::Shell::Zsh => "zsh",
        clap_complete::Shell::Fish => "fish",
        clap_complete::Shell::Elvish => "elvish",
        clap_complete::Shell::PowerShell => "powershell",
        _ => anyhow::bail!("unsupported shell"),
    };
    unsafe { std::env::set_var("COMPLETE", shell_name) };
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();
    Ok(())
}
