//! `imap-quota-exporter` - Prometheus exporter for IMAP storage quota.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use imap_quota_exporter::{
    DEFAULT_CONFIG_PATH, ExporterConfig, ImapProbe, METRICS_PORT, Metrics, Poller, server,
};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Polls IMAP accounts for quota usage and serves Prometheus metrics.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = ExporterConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    let metrics = Arc::new(Metrics::new().context("Failed to create metrics registry")?);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, METRICS_PORT));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics port {addr}"))?;

    let server_metrics = Arc::clone(&metrics);
    tokio::spawn(async move {
        if let Err(e) = server::serve(listener, server_metrics).await {
            error!("Metrics server stopped: {e}");
        }
    });

    info!("Starting IMAP quota exporter on port {METRICS_PORT}");
    info!("Monitoring {} account(s)", config.accounts.len());
    #[allow(clippy::cast_precision_loss)]
    let minutes = config.check_interval as f64 / 60.0;
    info!(
        "Check interval: {} seconds ({minutes:.1} minutes)",
        config.check_interval
    );

    Poller::new(config, ImapProbe, metrics)
        .run_until(shutdown_signal())
        .await;

    info!("Exporter stopped");
    Ok(())
}

/// Completes on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
