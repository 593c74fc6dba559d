use std::process::ExitCode;

use anyhow::Context;

use cf_npm_sync::config::{load_config, SyncMode};
use cf_npm_sync::service::{shutdown_signal, SyncService};
use cf_npm_sync::utils::{init_logging, init_metrics};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    init_logging();
    tracing::info!("Starting Cloudflare to NPM access list sync...");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Sync failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    // Load configuration
    let settings = load_config().context("failed to create config")?;
    tracing::info!(
        host = %settings.npm.host,
        access_list_id = settings.npm.access_list_id,
        mode = ?settings.sync.mode,
        dry_run = settings.sync.dry_run,
        "Configuration loaded"
    );

    if let Some(addr) = settings.metrics_addr {
        init_metrics(addr).context("failed to start metrics exporter")?;
    }

    let service = SyncService::from_settings(&settings).context("failed to create sync service")?;
    let shutdown = shutdown_signal().context("failed to listen for shutdown signals")?;

    let context = match settings.sync.mode {
        SyncMode::Once => "failed to update access list",
        SyncMode::Continuous { .. } => "sync loop aborted",
    };
    service.run(shutdown).await.context(context)?;

    tracing::info!("Sync finished");
    Ok(())
}
