//! AutoParts Kenya CLI - session store maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! ap-cli migrate
//!
//! # Delete expired sessions
//! ap-cli sessions prune
//!
//! # Report stored and live sessions
//! ap-cli sessions count
//! ```
//!
//! The storefront keeps no business data of its own, so the session table is
//! the only schema there is to manage.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ap-cli")]
#[command(author, version, about = "AutoParts Kenya storefront tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the session table
    Migrate,
    /// Maintain stored sessions
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Delete expired sessions
    Prune,
    /// Report how many sessions are stored
    Count,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Sessions { action } => match action {
            SessionAction::Prune => commands::sessions::prune().await,
            SessionAction::Count => commands::sessions::count().await,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_sessions_prune() {
        let cli = Cli::try_parse_from(["ap-cli", "sessions", "prune"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sessions {
                action: SessionAction::Prune
            }
        ));
    }
}
