//! Braid document host.
//!
//! Serves any number of documents over TCP, persisting them to SQLite.
//! Clients speak the framed wire protocol from `braid-sync`.
//!
//! Usage:
//!   braid-node --port 4100 --database braid.db

use std::{path::PathBuf, sync::Arc, time::Duration};
use anyhow::{Context, Result};
use braid_node::serve;
use braid_storage::SqliteStore;
use braid_sync::{HostConfig, Hub, LocalBus};
use braid_types::SiteId;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "braid-node")]
#[command(about = "Braid collaborative document host")]
struct Args {
    /// Port to listen on (TCP)
    #[arg(short, long, default_value = "4100")]
    port: u16,

    /// Path to the SQLite database
    #[arg(short, long, default_value = "braid.db")]
    database: PathBuf,

    /// Seconds a disconnected client still holds back tombstone collection
    #[arg(long, default_value = "300")]
    grace_secs: u64,

    /// Seconds between collection passes
    #[arg(long, default_value = "30")]
    gc_secs: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let store = SqliteStore::open(&args.database)
        .with_context(|| format!("Failed to open database {:?}", args.database))?;

    let config = HostConfig {
        session_grace: Duration::from_secs(args.grace_secs),
        gc_interval: Duration::from_secs(args.gc_secs),
        ..HostConfig::default()
    };
    let bus = Arc::new(LocalBus::new(config.bus_capacity));
    let site = SiteId::new();
    let hub = Arc::new(Hub::new(site, config, Arc::new(store), bus));
    let _gc = hub.spawn_gc();

    let listener = TcpListener::bind(("0.0.0.0", args.port))
        .await
        .with_context(|| format!("Failed to bind port {}", args.port))?;
    info!(%site, port = args.port, database = ?args.database, "braid-node listening");

    tokio::select! {
        result = serve(listener, Arc::clone(&hub)) => {
            result.context("Listener failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    Ok(())
}
