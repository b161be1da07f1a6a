use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Keep a self-hosted game server on the right build and on schedule.
#[derive(Debug, Parser)]
#[command(name = "craftkeep", version)]
pub struct Cli {
    /// Server configuration file (defaults to the platform config directory).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase terminal log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replace the configuration with defaults.
    Generate,
    /// Build the configuration from a completed answers file.
    Build {
        /// JSON answers produced by an interview.
        #[arg(long, value_name = "FILE")]
        answers: PathBuf,
    },
    /// Show the installed version and check the maintenance policy.
    Status,
    /// Resolve the next build to install.
    Resolve {
        /// Record the resolved build as installed.
        #[arg(long)]
        record: bool,
    },
    /// List backups outside the retention window.
    Prune {
        /// Delete them instead of only listing.
        #[arg(long)]
        apply: bool,
    },
    /// Forget the recorded installation.
    Reset,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "craftkeep",
            "resolve",
            "--record",
            "-vv",
            "--config",
            "c.json",
        ])
        .expect("arguments parse");

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("c.json")));
        assert!(matches!(cli.command, Command::Resolve { record: true }));
    }

    #[test]
    fn build_requires_answers() {
        assert!(Cli::try_parse_from(["craftkeep", "build"]).is_err());
    }
}
