//! # Nimbus Node Runtime
//!
//! The process entry point: parses CLI flags, loads and validates
//! [`node_runtime::config::NodeConfig`], wires the storage façade, and
//! serves it over HTTP (§6) while a background task sweeps pending
//! commissions (§4.8 "Reconciliation").

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

use node_runtime::config::NodeConfig;
use node_runtime::{genesis, handlers, reconciler, wiring};

/// Nimbus storage node.
#[derive(Parser, Debug)]
#[command(name = "nimbus-node")]
#[command(about = "Quota-accounted, content-addressed object storage node")]
struct Args {
    /// Path to a TOML config file. Missing values fall back to defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the HTTP bind address.
    #[arg(long)]
    bind_addr: Option<SocketAddr>,

    /// Override the Prometheus metrics bind address.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Use the RocksDB-backed store (requires the `rocksdb` feature).
    #[arg(long)]
    rocksdb: bool,
}

fn load_config(args: &Args) -> Result<NodeConfig> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(addr) = args.bind_addr {
        config.bind_addr = addr;
    }
    if let Some(addr) = args.metrics_addr {
        config.metrics_addr = addr;
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if args.rocksdb {
        config.use_rocksdb = true;
    }
    config.validate().context("validating configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    genesis::prepare(&config)?;

    PrometheusBuilder::new()
        .with_http_listener(config.metrics_addr)
        .install()
        .context("installing Prometheus metrics exporter")?;

    let bind_addr = config.bind_addr;
    let state = wiring::build_app_state(config)?;

    tokio::spawn(reconciler::run(state.clone()));

    let router = handlers::build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding HTTP listener on {bind_addr}"))?;

    info!(addr = %bind_addr, "nimbus node runtime listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("nimbus node runtime shut down");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received ctrl-c, shutting down");
}
