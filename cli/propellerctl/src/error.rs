//! Error handling and display for the CLI.

use std::path::PathBuf;

use colored::Colorize;
use propeller_shard::ShardError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Unsupported file format '{0}'. Use .toml or .json")]
    UnsupportedFormat(String),

    #[error("Refusing to overwrite {}. Pass --force to replace it", .0.display())]
    OutputExists(PathBuf),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let Some(shard_err) = err.chain().find_map(|e| e.downcast_ref::<ShardError>()) else {
        return;
    };

    if shard_err.is_configuration() {
        eprintln!(
            "\n{}",
            "Hint: Fix the shard configuration; no pod templates were generated.".yellow()
        );
    } else if let ShardError::TargetContainer { .. } = shard_err {
        eprintln!(
            "\n{}",
            "Hint: The pod template needs exactly one container whose command starts with `flytepropeller`."
                .yellow()
        );
    }
}
