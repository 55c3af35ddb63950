//! cachenode CLI - Command-line interface for the CacheModel node
//!
//! Describes the node's registration entry, shows the effective device
//! configuration, and replays request scripts against a model cache the way a
//! graph host would drive it.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, describe, replay};

/// cachenode - keyed model cache with device placement
#[derive(Parser, Debug)]
#[command(
    name = "cachenode",
    author,
    version,
    about = "cachenode - keyed model cache with device placement"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    /// Config file (overrides .cachenode/config.toml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the node registration table
    Describe {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective device configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a JSON request script against one model cache
    ///
    /// The script is an array of requests:
    /// `{"cache_key": "m1", "model_id": "sd15", "device": "gpu", "offload": "cpu", "device_support": "none"}`.
    /// Every field is optional.
    Replay {
        /// Path to the request script
        script: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let node_config = config::load(args.config.as_deref())?;

    match args.command {
        Command::Describe { json } => describe::execute(json),
        Command::Config { json } => config::execute(&node_config, json),
        Command::Replay { script, json } => replay::execute(&node_config, &script, json),
    }
}
