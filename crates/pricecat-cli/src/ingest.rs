//! Command handlers for ingestion, categorization, and upload listings.
//!
//! Handlers are generic over the store so `ingest --dry-run` runs the same
//! pipeline against a [`MemoryStore`].

use std::path::PathBuf;

use pricecat_core::{
    AppConfig, CatalogStore, MemoryStore, Normalizer, UploadFileSummary, UploadRecord,
};
use pricecat_ingest::{
    categorize_uncategorized, load_match_table, run_batch, uncategorize, BatchReport,
    BatchSettings, CategorizeSummary,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::reference;

/// Run one batch, against Postgres or (with `dry_run`) a throwaway
/// in-memory catalog.
pub(crate) async fn run_ingest(
    config: &AppConfig,
    dir: Option<PathBuf>,
    dry_run: bool,
    categorize: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let mut settings = BatchSettings::from_app_config(config);
    if let Some(dir) = dir {
        settings.source_dir = dir;
    }

    if dry_run {
        settings.remove_processed = false;
        let store = MemoryStore::new();
        reference::seed_reference(&store, config).await?;
        ingest_once(&store, config, &settings, categorize, cancel).await?;

        let counts = store.counts();
        println!(
            "dry-run: would store {} brands, {} articuls, {} products, {} price rows",
            counts.brands, counts.articuls, counts.products, counts.prices_history
        );
        return Ok(());
    }

    let store = crate::connect_store(config).await?;
    ingest_once(&store, config, &settings, categorize, cancel).await?;
    Ok(())
}

/// Load reference data, run a batch, print its summary, and optionally
/// categorize what it added.
pub(crate) async fn ingest_once<S: CatalogStore>(
    store: &S,
    config: &AppConfig,
    settings: &BatchSettings,
    categorize: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<BatchReport> {
    let ctx = reference::load_context(store, config).await?;
    let report = run_batch(store, &ctx, settings, cancel).await?;
    print_report(&report);

    if categorize && report.upload_id.is_some() && !report.cancelled {
        categorize_pass(store, cancel).await?;
    }
    Ok(report)
}

pub(crate) async fn categorize_pass<S: CatalogStore>(
    store: &S,
    cancel: &CancellationToken,
) -> anyhow::Result<CategorizeSummary> {
    let normalizer = Normalizer::new();
    let table = load_match_table(store, &normalizer).await?;
    let summary = categorize_uncategorized(store, &table, &normalizer, cancel).await?;
    println!(
        "categorized {} of {} articuls ({} unmatched, {} failed)",
        summary.categorized, summary.examined, summary.unmatched, summary.failed
    );
    Ok(summary)
}

pub(crate) async fn run_uncategorize<S: CatalogStore>(
    store: &S,
    brand: &str,
    articul: &str,
) -> anyhow::Result<()> {
    let normalizer = Normalizer::new();
    if uncategorize(store, &normalizer, brand, articul).await? {
        println!("category cleared for {articul}");
    } else {
        println!("{articul} had no category");
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct UploadListing {
    #[serde(flatten)]
    upload: UploadRecord,
    files: Vec<UploadFileSummary>,
}

pub(crate) async fn run_uploads<S: CatalogStore>(
    store: &S,
    limit: i64,
    json: bool,
) -> anyhow::Result<()> {
    let mut listings = Vec::new();
    for upload in store.list_uploads(limit).await? {
        let files = store.list_upload_files(upload.id).await?;
        listings.push(UploadListing { upload, files });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    if listings.is_empty() {
        println!("no uploads recorded");
    }
    for listing in &listings {
        let created = listing.upload.created_at.with_timezone(&chrono::Local);
        println!(
            "upload {} at {}",
            listing.upload.id,
            created.format("%Y-%m-%d %H:%M:%S")
        );
        for file in &listing.files {
            println!("  {file}");
        }
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    let Some(upload_id) = report.upload_id else {
        println!("no price files found");
        return;
    };

    println!("upload {upload_id}:");
    for file in &report.files {
        println!("  {file}");
    }
    println!(
        "  total: {} of {} rows applied, {} products marked out of stock",
        report.rows_applied(),
        report.rows_total(),
        report.swept
    );
    if report.cancelled {
        println!("  batch cancelled before all files were processed");
    }
}
