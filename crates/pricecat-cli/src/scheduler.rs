//! Periodic ingestion for the `watch` command.
//!
//! A repeated [`Job`] runs one batch per interval. A tick that fires while
//! the previous batch is still running is skipped, so batches never overlap
//! within one process; the directory lock covers other processes.

use std::sync::Arc;
use std::time::Duration;

use pricecat_core::AppConfig;
use pricecat_db::PgCatalogStore;
use pricecat_ingest::BatchSettings;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::ingest;

/// Run batches every `interval_secs` until `cancel` fires. The first batch
/// starts immediately.
pub(crate) async fn run_watch(
    store: PgCatalogStore,
    config: AppConfig,
    interval_secs: u64,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let interval = Duration::from_secs(interval_secs.max(1));
    let store = Arc::new(store);
    let config = Arc::new(config);
    let running = Arc::new(Mutex::new(()));

    run_cycle(&store, &config, &running, &cancel).await;

    let mut scheduler = JobScheduler::new().await?;
    let job = {
        let store = Arc::clone(&store);
        let config = Arc::clone(&config);
        let running = Arc::clone(&running);
        let cancel = cancel.clone();
        Job::new_repeated_async(interval, move |_uuid, _lock| {
            let store = Arc::clone(&store);
            let config = Arc::clone(&config);
            let running = Arc::clone(&running);
            let cancel = cancel.clone();

            Box::pin(async move {
                run_cycle(&store, &config, &running, &cancel).await;
            })
        })?
    };
    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(interval_secs = interval.as_secs(), "watching source directory");

    cancel.cancelled().await;
    tracing::info!("stopping scheduler");
    scheduler.shutdown().await?;

    // Let an in-flight batch reach its cancellation point.
    let _idle = running.lock().await;
    Ok(())
}

async fn run_cycle(
    store: &PgCatalogStore,
    config: &AppConfig,
    running: &Mutex<()>,
    cancel: &CancellationToken,
) {
    if cancel.is_cancelled() {
        return;
    }
    let Ok(_guard) = running.try_lock() else {
        tracing::warn!("previous batch still running, skipping this tick");
        return;
    };

    let settings = BatchSettings::from_app_config(config);
    tracing::info!("scheduler: starting batch");
    match ingest::ingest_once(
        store,
        config,
        &settings,
        config.categorize_after_ingest,
        cancel,
    )
    .await
    {
        Ok(report) => tracing::info!(
            upload_id = report.upload_id,
            files = report.files.len(),
            "scheduler: batch complete"
        ),
        Err(e) => tracing::error!(error = %format!("{e:#}"), "scheduler: batch failed, retrying next cycle"),
    }
}
