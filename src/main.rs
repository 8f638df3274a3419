//! Main entry point for the comtrade-downloader CLI

use clap::Parser;
use comtrade_downloader::cli::{Cli, Commands};
use comtrade_downloader::shutdown::ShutdownCoordinator;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("comtrade_downloader=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = comtrade_downloader::metrics::init_metrics(addr).await {
            warn!(error = %e, "Metrics exporter unavailable; continuing without it");
        }
    }

    // Ctrl+C interrupts the current pause and stops the running job
    let shutdown = ShutdownCoordinator::shared();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received - stopping after the current request...");
                shutdown.request_shutdown();
            }
        }
    });

    let result = match &cli.command {
        Commands::Download(args) => args
            .execute(&cli, shutdown.clone())
            .await
            .map_err(|e| anyhow::anyhow!(e)),
        Commands::Bulk(args) => args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Availability(args) => args.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
        Commands::Sources(cmd) => cmd.execute(&cli).await.map_err(|e| anyhow::anyhow!(e)),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}
