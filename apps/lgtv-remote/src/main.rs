//! LG TV Remote - command-line remote control for LG webOS TVs.
//!
//! Locates the TV (or uses the configured address), then executes commands
//! in the adapter's text command language. With trailing arguments a single
//! command is executed; otherwise commands are read from stdin, one per line.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lgtv_core::{Capabilities, CommandOutcome, ConfigStore, JsonFileStore, LgTv, MemoryStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use crate::config::RemoteConfig;

/// LG TV Remote - control an LG webOS TV from the command line.
#[derive(Parser, Debug)]
#[command(name = "lgtv-remote")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "LGTV_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// TV IP address (skips SSDP discovery).
    #[arg(long, env = "LGTV_IP")]
    ip: Option<String>,

    /// TV hardware address, for power on (skips ARP resolution).
    #[arg(long, env = "LGTV_MAC")]
    mac: Option<String>,

    /// Data directory for persistent state (TV address, pairing key).
    #[arg(short = 'd', long, env = "LGTV_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Command to execute once, e.g. `volumeUp 3`. Reads stdin when omitted.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("LG TV Remote v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        RemoteConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(ip) = args.ip {
        config.adapter.ip = Some(ip);
    }
    if let Some(mac) = args.mac {
        config.adapter.mac = Some(mac);
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = Some(data_dir);
    }

    let store: Arc<dyn ConfigStore> = if let Some(ref data_dir) = config.data_dir {
        log::info!("Using data directory: {}", data_dir.display());
        Arc::new(JsonFileStore::new(data_dir))
    } else {
        log::info!("No data directory configured - TV address and pairing will not persist");
        Arc::new(MemoryStore::new())
    };
    config.merge_saved_descriptor(store.as_ref());

    let caps = Capabilities::system(&config.adapter, Arc::clone(&store));
    let tv = LgTv::init(config.adapter, caps)
        .await
        .context("Failed to locate the TV")?;

    if !args.command.is_empty() {
        run_line(&tv, &args.command.join(" ")).await;
        tv.settle().await;
        return Ok(());
    }

    tokio::select! {
        result = read_commands(&tv) => result?,
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received");
            return Ok(());
        }
    }

    // Let detached requests finish unless interrupted.
    tokio::select! {
        _ = tv.settle() => {},
        _ = shutdown_signal() => log::info!("Shutdown signal received"),
    }
    Ok(())
}

/// Executes commands from stdin until EOF.
async fn read_commands(tv: &LgTv) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        run_line(tv, &line).await;
    }
    Ok(())
}

/// Executes one command and reports its outcome.
async fn run_line(tv: &LgTv, line: &str) {
    match tv.execute(line).await {
        Ok(CommandOutcome::Reply(reply)) => match serde_json::to_string_pretty(&reply) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to encode reply: {}", e),
        },
        Ok(CommandOutcome::Unreachable(e)) => log::error!("TV unreachable: {}", e),
        Ok(CommandOutcome::Completed | CommandOutcome::Dispatched | CommandOutcome::Ignored(_)) => {}
        Err(e) => log::error!("{} ({})", e, e.code()),
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
