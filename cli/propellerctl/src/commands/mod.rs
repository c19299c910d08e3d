//! CLI commands.

mod shard;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// propellerctl - generate pod templates for a sharded propeller fleet.
#[derive(Debug, Parser)]
#[command(name = "propellerctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Log filter used when RUST_LOG is unset (e.g. warn, info, debug).
    #[arg(long, global = true, env = "PROPELLER_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Plan, render and inspect shard assignments.
    Shard(shard::ShardCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Run the CLI command.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Shard(cmd) => cmd.run(self.format),
            Commands::Version => {
                println!("propellerctl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "propellerctl",
            "shard",
            "plan",
            "--config",
            "shard.toml",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(Cli::try_parse_from(["propellerctl", "--format", "yaml", "version"]).is_err());
    }
}
