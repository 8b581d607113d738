// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! zapkeep - keeps WhatsApp sessions alive and forwards their events.
//!
//! This is the binary entry point for the zapkeep server.

mod serve;
mod sessions;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use zapkeep_config::ZapkeepConfig;

/// zapkeep - WhatsApp session keeper and event notifier.
#[derive(Parser, Debug)]
#[command(name = "zapkeep", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the server (default).
    Serve,
    /// Validate the configuration and exit.
    CheckConfig,
    /// Manage persisted session tokens.
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
}

#[derive(Subcommand, Debug)]
enum SessionsAction {
    /// List persisted sessions.
    List,
    /// Create a session with a fresh credential.
    Create { name: String },
    /// Delete a persisted session.
    Revoke { name: String },
}

fn load_config(path: Option<&PathBuf>) -> ZapkeepConfig {
    let loaded = match path {
        Some(path) => zapkeep_config::load_and_validate_path(path),
        None => zapkeep_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            zapkeep_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::CheckConfig => {
            println!(
                "zapkeep: config OK (token_store={}, listening on {}:{})",
                config.session.token_store, config.server.host, config.server.port
            );
            Ok(())
        }
        Commands::Sessions { action } => match action {
            SessionsAction::List => sessions::list(&config).await,
            SessionsAction::Create { name } => sessions::create(&config, &name).await,
            SessionsAction::Revoke { name } => sessions::revoke(&config, &name).await,
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_sessions_create() {
        let cli = Cli::parse_from(["zapkeep", "--config", "z.toml", "sessions", "create", "A"]);
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("z.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Sessions {
                action: SessionsAction::Create { ref name }
            }) if name == "A"
        ));
    }

    #[test]
    fn default_config_is_valid() {
        let config = zapkeep_config::load_and_validate_str("").unwrap();
        assert_eq!(config.server.host, ZapkeepConfig::default().server.host);
    }
}
