pub mod commands;
pub mod output;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::ShellConfig;
use crate::route::{exception_routes, ComponentRegistry};
use crate::shell::Shell;
use crate::storage::FileStore;

#[derive(Parser)]
#[command(name = "admin-shell")]
#[command(about = "Admin Shell CLI - drive the auth and navigation core against a backend")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Print the materialized menu tree")]
    Menu,

    #[command(about = "Run one guarded navigation and print where it lands")]
    Nav {
        #[arg(help = "Target location, e.g. /manage/user")]
        path: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let shell = build_shell()?;

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(&shell, cmd, output_format).await,
        Commands::Menu => commands::menu::handle(&shell, output_format).await,
        Commands::Nav { path } => commands::nav::handle(&shell, &path, output_format).await,
    }
}

/// Shell wired for CLI use: env config, file-backed session storage so a
/// login survives across invocations, and the compiled candidate set.
fn build_shell() -> anyhow::Result<Shell> {
    let config = ShellConfig::from_env();
    let storage = Arc::new(FileStore::open_default()?);

    let shell = Shell::new(
        config,
        storage,
        vec![exception_routes()],
        ComponentRegistry::builtin(),
    )?;
    Ok(shell)
}
