//! Charitydesk - donors, inventory and monthly finances from the terminal.
//!
//! Reads and edits the charity's records in a realtime document database,
//! or in a local JSON export when run with `--seed`.

mod cli;
mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use charitydesk_core::profile::CurrentUserStore;
use charitydesk_core::{Config, Dashboard};

use cli::{Cli, Command};

/// Directory for a log file, in addition to stderr
const LOG_DIR_ENV: &str = "CHARITYDESK_LOG_DIR";

/// Initialize the tracing subscriber for logging.
///
/// RUST_LOG controls the level (default "warn"). The returned guard must be
/// held until exit so buffered file output is flushed.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, "charitydesk.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });
    if let Some(url) = cli.database_url {
        config.database_url = Some(url);
    }

    let data_dir = config.data_dir().unwrap_or_else(|e| {
        warn!(error = %e, "No data directory, using ./data");
        PathBuf::from("data")
    });
    let user_store = CurrentUserStore::new(data_dir);

    if let Command::Config { save } = cli.command {
        return commands::show_config(&config, save);
    }

    if let Command::Whoami {
        set,
        name,
        email,
        clear,
    } = cli.command
    {
        return commands::whoami(&user_store, set, name, email, clear);
    }

    let user = user_store.load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load current user");
        None
    });

    let dashboard = match &cli.seed {
        Some(path) => {
            info!(seed = %path.display(), "Using local export");
            commands::dashboard_from_seed(path, &config, user)?
        }
        None => Dashboard::connect(&config, user)?,
    };

    commands::run(cli.command, &dashboard).await
}
