use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "quicknoted",
    about = "quicknoted — self-destructing encrypted note server",
    version
)]
struct Cli {
    /// Log level: error, warn, info, debug, verbose (default: $QUICKNOTE_LOG_LEVEL or warn)
    #[arg(long, global = true, env = "QUICKNOTE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory holding quicknote.db (default: $QUICKNOTE_DATA_DIR or the platform data dir)
    #[arg(long, global = true, env = "QUICKNOTE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, env = "QUICKNOTE_PORT", default_value = "8080")]
        port: u16,
        /// Host to bind
        #[arg(long, env = "QUICKNOTE_HOST", default_value = "0.0.0.0")]
        host: String,
        /// How often the background sweep deletes dead notes (e.g. 30s, 5m)
        #[arg(long, default_value = "5m", value_parser = humantime::parse_duration)]
        sweep_interval: Duration,
        /// Skip the opportunistic sweep that runs before every read
        #[arg(long)]
        no_sweep_on_read: bool,
        /// Comma-separated list of allowed CORS origins (default: any)
        #[arg(long, env = "QUICKNOTE_CORS_ORIGINS")]
        cors_origins: Option<String>,
    },
    /// Delete every expired or exhausted note and exit
    Prune,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(effective_log_level(cli.log_level.as_deref())))
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            sweep_interval,
            no_sweep_on_read,
            cors_origins,
        } => {
            let cfg = quicknote_server::ServerConfig {
                host,
                port,
                data_dir: cli.data_dir,
                sweep_interval,
                sweep_on_read: !no_sweep_on_read,
                cors_origins,
            };
            quicknote_server::run(cfg).await
        }
        Commands::Prune => cmd_prune(cli.data_dir),
    }
}

/// `verbose` is accepted as an alias for `debug`.
fn effective_log_level(raw: Option<&str>) -> String {
    match raw {
        Some(level) if level.eq_ignore_ascii_case("verbose") => "debug".to_owned(),
        Some(level) => level.to_owned(),
        None => "warn".to_owned(),
    }
}

// ── Command implementations ───────────────────────────────────────────────────

fn cmd_prune(data_dir: Option<PathBuf>) -> Result<()> {
    let data_dir = quicknote_server::resolve_data_dir(data_dir.as_ref())?;
    let notes = quicknote_server::open_notes(&data_dir, false)?;
    let removed = notes.lifecycle().collect_garbage()?;
    println!("removed {removed} dead note(s) from {}", data_dir.display());
    Ok(())
}
