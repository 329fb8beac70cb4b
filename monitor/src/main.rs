// Monitor daemon entry point

use anyhow::Context;
use common::config::Settings;
use common::dispatch::{Notifier, WebhookNotifier};
use common::persist::JobStore;
use common::registry::JobRegistry;
use common::source::{LiveValueSource, ValueSource};
use common::telemetry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;
    settings
        .validate()
        .map_err(|reason| anyhow::anyhow!("Invalid configuration: {}", reason))?;

    telemetry::init_logging(&settings.observability.log_level)?;
    telemetry::init_metrics(settings.observability.metrics_port)?;

    info!(
        source_base_url = %settings.source.base_url,
        store_path = %settings.persistence.path,
        "Starting grid monitor daemon"
    );

    let source = Arc::new(
        LiveValueSource::new(&settings.source).context("Failed to build value source client")?,
    ) as Arc<dyn ValueSource>;
    let notifier = Arc::new(
        WebhookNotifier::new(&settings.dispatch).context("Failed to build webhook notifier")?,
    ) as Arc<dyn Notifier>;
    let store = JobStore::new(&settings.persistence.path);

    // Load persisted jobs before the store moves into the registry.
    let records = store.load().await;
    let flush_interval = Duration::from_secs(settings.persistence.flush_interval_seconds);

    let registry = JobRegistry::new(settings, source, notifier, store);
    let restored = registry.restore(records).await;
    info!(restored_jobs = restored, "Restored persisted monitoring jobs");

    let flush_task = registry.spawn_flush_task(flush_interval);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received Ctrl+C, initiating graceful shutdown");

    flush_task.abort();
    registry.shutdown().await;
    info!("Monitor stopped");

    Ok(())
}
