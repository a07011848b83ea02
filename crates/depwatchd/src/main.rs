//! depwatchd — the depwatch daemon.
//!
//! Single binary that assembles the monitor:
//! - State store (redb)
//! - HTTP probes built from `depwatch.toml`
//! - Status monitor loop
//! - REST API
//!
//! # Usage
//!
//! ```text
//! depwatchd run --config /etc/depwatch/depwatch.toml --data-dir /var/lib/depwatch
//! ```

mod daemon;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,depwatchd=debug,depwatch=debug";

#[derive(Parser)]
#[command(name = "depwatchd", about = "depwatch dependency status daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monitor loop and the REST API until Ctrl-C.
    Run {
        /// Path to depwatch.toml.
        #[arg(long, default_value = "depwatch.toml")]
        config: PathBuf,

        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/depwatch")]
        data_dir: PathBuf,

        /// Listen address; overrides `[api] listen` from the config.
        #[arg(long)]
        listen: Option<SocketAddr>,
    },

    /// Parse and validate a config file, then exit.
    CheckConfig {
        #[arg(long, default_value = "depwatch.toml")]
        config: PathBuf,
    },
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run {
            config,
            data_dir,
            listen,
        } => daemon::run(&config, data_dir, listen).await,
        Command::CheckConfig { config } => {
            let cfg = depwatch_core::DepwatchConfig::from_file(&config)?;
            println!("{}: {} checks, ok", config.display(), cfg.checks.len());
            Ok(())
        }
    }
}
