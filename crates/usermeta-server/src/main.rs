//! Usermeta Server
//!
//! `serve` runs the HTTP API; `database migrate|seed` manages the schema and
//! test data.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use usermeta_server::commands;
use usermeta_server::config::{AppConfig, Overrides};

#[derive(Parser)]
#[command(name = "usermeta-server")]
#[command(author, version, about = "User metadata API server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file, or a directory of *config.yml files
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Database host
    #[arg(long, global = true)]
    db_host: Option<String>,

    /// Database port
    #[arg(long, global = true)]
    db_port: Option<u16>,

    /// Database name
    #[arg(long, global = true)]
    db_name: Option<String>,

    /// Database user (the password is prompted for)
    #[arg(long, global = true)]
    db_user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve,

    /// Manage the database
    Database {
        #[command(subcommand)]
        action: DatabaseAction,
    },
}

#[derive(Subcommand)]
enum DatabaseAction {
    /// Create tables if absent
    Migrate,

    /// Replace all rows with generated users
    Seed {
        /// Number of users
        #[arg(short = 'n', long, default_value_t = 3)]
        count: u32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    let default_filter = if cli.verbose {
        "usermeta_server=debug,usermeta_core=debug,tower_http=debug"
    } else {
        "usermeta_server=info,usermeta_core=info"
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        db_host: cli.db_host,
        db_port: cli.db_port,
        db_name: cli.db_name,
        db_user: cli.db_user,
    };
    let mut config = AppConfig::load(cli.config.as_deref(), &overrides)?;

    match cli.command {
        Commands::Serve => {
            info!(
                "Starting usermeta server v{} (pid {})",
                env!("CARGO_PKG_VERSION"),
                std::process::id()
            );
            commands::serve::run(config).await
        }
        Commands::Database { action } => {
            if !overrides.is_empty() {
                config.database.password = dialoguer::Password::new()
                    .with_prompt(format!("Password for {}", config.database.user))
                    .interact()?;
            }

            match action {
                DatabaseAction::Migrate => commands::database::migrate(&config).await,
                DatabaseAction::Seed { count } => commands::database::seed(&config, count).await,
            }
        }
    }
}
