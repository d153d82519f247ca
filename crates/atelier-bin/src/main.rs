//! Atelier client host: wires the session, liveness and focus layers
//! together and drives them from platform events.

mod app;
mod events;
mod host;

use std::path::PathBuf;

use anyhow::Context;
use atelier_config::{init_logging, Config};
use clap::{Parser, Subcommand};

/// Atelier client command-line interface.
#[derive(Parser)]
#[command(name = "atelier")]
#[command(about = "Session and connection resilience host for the Atelier client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file. Defaults to ~/.atelier/config.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the session and process platform events from stdin
    Run,
    /// Probe the backend once and print the connection state
    Pulse,
    /// Register a new account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ATELIER_PASSWORD")]
        password: String,
        #[arg(long)]
        name: String,
        /// CPF or CNPJ
        #[arg(long)]
        tax_id: String,
    },
    /// Request a password-reset email
    ResetPassword {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config.or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::from_env().context("failed to load configuration")?,
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level, config.log_format);

    let app = app::App::build(&config)?;

    match cli.command {
        Commands::Run => app.run().await?,
        Commands::Pulse => app.pulse().await?,
        Commands::SignUp {
            email,
            password,
            name,
            tax_id,
        } => app.sign_up(email, password, name, tax_id).await?,
        Commands::ResetPassword { email } => app.reset_password(&email).await?,
    }

    Ok(())
}
