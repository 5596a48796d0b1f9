use clap::{Parser, Subcommand};
use clap_complete::engine::{ArgValueCompleter, CompletionCandidate};

use crate::config::Paths;
use crate::store::Store;

#[derive(Parser)]
#[command(
    name = "cf-tunnel-buddy",
    about = "Interactive CLI for managing Cloudflare tunnels",
    version
)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Runs the interactive menu when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

fn complete_tunnel_names(current: &std::ffi::OsStr) -> Vec<CompletionCandidate> {
    let prefix = current.to_str().unwrap_or("");
    let Ok(paths) = Paths::from_home() else {
        return Vec::new();
    };
    Store::new(paths.tunnels_file)
        .names()
        .into_iter()
        .filter(|n| n.starts_with(prefix))
        .map(CompletionCandidate::new)
        .collect()
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new tunnel interactively
    Add,
    /// List local and Cloudflare tunnels
    #[command(alias = "ls")]
    List,
    /// Start a tunnel
    Start {
        /// Tunnel name (interactive picker if omitted)
        #[arg(add = ArgValueCompleter::new(complete_tunnel_names))]
        name: Option<String>,
        /// Stay attached to the terminal; Ctrl+C stops the tunnel
        #[arg(long, short)]
        foreground: bool,
    },
    /// Stop a tunnel started by this session
    Stop {
        /// Tunnel name (interactive picker if omitted)
        #[arg(add = ArgValueCompleter::new(complete_tunnel_names))]
        name: Option<String>,
    },
    /// Show tunnel status
    Status {
        /// Tunnel name (all tunnels or a picker if omitted)
        #[arg(add = ArgValueCompleter::new(complete_tunnel_names))]
        name: Option<String>,
    },
    /// Change a tunnel's service URL or hostname
    Edit {
        /// Tunnel name (interactive picker if omitted)
        #[arg(add = ArgValueCompleter::new(complete_tunnel_names))]
        name: Option<String>,
    },
    /// Remove a tunnel locally and from Cloudflare
    #[command(alias = "rm")]
    Remove {
        /// Tunnel name (interactive picker if omitted)
        #[arg(add = ArgValueCompleter::new(complete_tunnel_names))]
        name: Option<String>,
    },
    /// Import tunnels that exist in Cloudflare but not locally
    Sync,
    /// Delete local configuration
    Reset {
        /// Remove the whole ~/.cf-tunnel-buddy directory
        #[arg(long, conflicts_with = "tunnels_only")]
        all: bool,
        /// Remove only the tunnel records
        #[arg(long)]
        tunnels_only: bool,
    },
    /// Check the cloudflared installation and login
    ToolStatus,
    /// Initialize and show ~/.cf-tunnel-buddy/config.toml
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (reads from config if omitted)
        shell: Option<clap_complete::Shell>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_menu() {
        let cli = Cli::try_parse_from(["cf-tunnel-buddy"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn start_accepts_name_and_foreground() {
        let cli = Cli::try_parse_from(["cf-tunnel-buddy", "start", "web", "--foreground"]).unwrap();
        match cli.command {
            Some(Command::Start { name, foreground }) => {
                assert_eq!(name.as_deref(), Some("web"));
                assert!(foreground);
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn reset_scopes_conflict() {
        assert!(Cli::try_parse_from(["cf-tunnel-buddy", "reset", "--all", "--tunnels-only"]).is_err());
    }

    #[test]
    fn aliases() {
        let cli = Cli::try_parse_from(["cf-tunnel-buddy", "rm", "web"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Remove { name: Some(_) })));
        let cli = Cli::try_parse_from(["cf-tunnel-buddy", "ls"]).unwrap();
        assert!(matches!(cli.command, Some(Command::List)));
    }
}
