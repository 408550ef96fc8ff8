//! One ingestion batch over the source directory.
//!
//! `lock → create upload → per file (dispatch, rows) → stale sweep → unlock`.
//! Row failures are logged and skipped, file failures are recorded in the
//! file's summary, and only an unreachable store or an unavailable lock
//! abandons the batch.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pricecat_core::{
    AliasTable, AppConfig, ArticulKey, CatalogError, CatalogResult, CatalogStore, FileStatus,
    Normalizer, SupplierDescriptor, SupplierTable, UploadFileSummary,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::brand::resolve_brand;
use crate::dedup::{get_or_create, ProductInput};
use crate::lock::{acquire_with_retry, LOCK_FILE_NAME};
use crate::parse::{parse_price, parse_quantity, parse_rest};
use crate::pricing::{self, apply_price, StaleSweep};
use crate::reader::{PriceFileReader, RawRow};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("source directory {} still locked after {attempts} attempts", dir.display())]
    Locked { dir: PathBuf, attempts: u32 },

    #[error("batch cancelled")]
    Cancelled,

    #[error("source directory {}: {source}", dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] CatalogError),
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub source_dir: PathBuf,
    pub lock_max_attempts: u32,
    pub lock_backoff: Duration,
    /// Delete files whose rows were applied. Failed and unrecognized files
    /// are always kept.
    pub remove_processed: bool,
}

impl BatchSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            source_dir: config.source_dir.clone(),
            lock_max_attempts: config.lock_max_attempts,
            lock_backoff: Duration::from_secs(config.lock_backoff_secs),
            remove_processed: config.remove_processed,
        }
    }
}

/// Reference data shared by every row of a batch.
#[derive(Debug)]
pub struct IngestContext {
    pub normalizer: Normalizer,
    pub suppliers: SupplierTable,
    pub aliases: AliasTable,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// `None` when the directory held no price files.
    pub upload_id: Option<i64>,
    pub files: Vec<UploadFileSummary>,
    /// Actual prices zeroed by the stale sweep.
    pub swept: u64,
    pub cancelled: bool,
}

impl BatchReport {
    #[must_use]
    pub fn rows_applied(&self) -> i64 {
        self.files.iter().map(|f| f.rows_applied).sum()
    }

    #[must_use]
    pub fn rows_total(&self) -> i64 {
        self.files.iter().map(|f| f.rows_total).sum()
    }
}

/// Run one batch over `settings.source_dir`.
///
/// # Errors
///
/// Returns [`BatchError::Locked`] when the directory lock cannot be taken,
/// [`BatchError::Io`] when the directory cannot be listed, and
/// [`BatchError::Store`] when the store becomes unavailable. Files already
/// processed keep their recorded summaries.
pub async fn run_batch<S: CatalogStore>(
    store: &S,
    ctx: &IngestContext,
    settings: &BatchSettings,
    cancel: &CancellationToken,
) -> Result<BatchReport, BatchError> {
    let dir = settings.source_dir.as_path();
    let lock = acquire_with_retry(
        dir,
        settings.lock_max_attempts,
        settings.lock_backoff,
        cancel,
    )
    .await?;

    let files = list_price_files(dir).map_err(|source| BatchError::Io {
        dir: dir.to_path_buf(),
        source,
    })?;
    let mut report = BatchReport::default();
    if files.is_empty() {
        tracing::info!(dir = %dir.display(), "no price files to ingest");
        release(lock);
        return Ok(report);
    }

    let upload = store.create_upload().await?;
    report.upload_id = Some(upload.id);
    tracing::info!(upload_id = upload.id, files = files.len(), "starting upload");

    let mut sweep = StaleSweep::default();
    for path in &files {
        if cancel.is_cancelled() {
            tracing::warn!(upload_id = upload.id, "batch cancelled between files");
            report.cancelled = true;
            break;
        }

        let summary = process_file(store, ctx, upload.id, path, &mut sweep).await?;
        tracing::info!(
            upload_id = upload.id,
            file = %summary.file_name,
            status = %summary.status,
            rows_applied = summary.rows_applied,
            rows_total = summary.rows_total,
            "{summary}"
        );
        store.record_upload_file(upload.id, &summary).await?;

        if settings.remove_processed && summary.status == FileStatus::Processed {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(file = %path.display(), error = %e, "failed to remove processed file");
            }
        }
        report.files.push(summary);
    }

    if report.cancelled {
        tracing::warn!(upload_id = upload.id, "stale sweep skipped for cancelled batch");
    } else {
        for supplier_id in sweep.suppliers() {
            report.swept += pricing::mark_out_of_stock(store, supplier_id, upload.id).await?;
        }
    }

    let failed_files = report
        .files
        .iter()
        .filter(|f| f.status != FileStatus::Processed)
        .count();
    if failed_files > 0 {
        tracing::warn!(
            failed_files,
            total_files = report.files.len(),
            "some files were not ingested"
        );
    }
    tracing::info!(
        upload_id = upload.id,
        rows_applied = report.rows_applied(),
        rows_total = report.rows_total(),
        swept = report.swept,
        "upload finished"
    );

    release(lock);
    Ok(report)
}

fn release(lock: crate::lock::DirLock) {
    let path = lock.path().to_path_buf();
    if let Err(e) = lock.unlock() {
        tracing::warn!(lock = %path.display(), error = %e, "failed to remove lock file");
    }
}

/// Regular `.csv` files in `dir`, sorted by name. The lock file is excluded.
fn list_price_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && entry.file_name() != LOCK_FILE_NAME {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_summary(file_name: &str, supplier_id: Option<i64>, status: FileStatus) -> UploadFileSummary {
    UploadFileSummary {
        file_name: file_name.to_string(),
        supplier_id,
        status,
        rows_total: 0,
        rows_applied: 0,
        error_message: None,
    }
}

/// Ingest every row of one file. Only `Unavailable` escapes; every other
/// failure is folded into the returned summary.
async fn process_file<S: CatalogStore>(
    store: &S,
    ctx: &IngestContext,
    upload_id: i64,
    path: &Path,
    sweep: &mut StaleSweep,
) -> CatalogResult<UploadFileSummary> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let Some(descriptor) = ctx.suppliers.match_file(&file_name) else {
        tracing::error!(file = %file_name, "no supplier descriptor matches file name");
        let mut summary = file_summary(&file_name, None, FileStatus::Unrecognized);
        summary.error_message = Some(CatalogError::Unrecognized(format!("supplier for {file_name}")).to_string());
        return Ok(summary);
    };

    let supplier_id = match store
        .upsert_supplier(&descriptor.name, descriptor.email.as_deref())
        .await
    {
        Ok(id) => id,
        Err(e) if e.is_unavailable() => return Err(e),
        Err(e) => {
            tracing::error!(file = %file_name, supplier = %descriptor.name, error = %e, "failed to register supplier");
            let mut summary = file_summary(&file_name, None, FileStatus::Failed);
            summary.error_message = Some(e.to_string());
            return Ok(summary);
        }
    };
    let mut summary = file_summary(&file_name, Some(supplier_id), FileStatus::Processed);

    if !descriptor.declares_utf8() {
        tracing::warn!(
            file = %file_name,
            charset = descriptor.charset.as_deref().unwrap_or_default(),
            "file declares a non-UTF-8 charset; rows that do not decode are skipped"
        );
    }

    let reader = match PriceFileReader::open(path, descriptor) {
        Ok(reader) => reader,
        Err(e) => {
            tracing::error!(file = %file_name, error = %e, "failed to open price file");
            summary.status = FileStatus::Failed;
            summary.error_message = Some(e.to_string());
            return Ok(summary);
        }
    };

    for row in reader {
        summary.rows_total += 1;
        let outcome = match row {
            Ok(raw) => apply_row(store, ctx, descriptor, supplier_id, upload_id, &raw)
                .await
                .map_err(|e| (raw.line, e)),
            Err(e) => Err((e.line, e.error)),
        };
        match outcome {
            Ok(()) => summary.rows_applied += 1,
            Err((_, e)) if e.is_unavailable() => return Err(e),
            Err((line, e)) => {
                tracing::warn!(file = %file_name, line, error = %e, "skipping row");
            }
        }
    }

    if summary.rows_applied > 0 {
        sweep.touch(supplier_id);
    }
    Ok(summary)
}

async fn apply_row<S: CatalogStore>(
    store: &S,
    ctx: &IngestContext,
    descriptor: &SupplierDescriptor,
    supplier_id: i64,
    upload_id: i64,
    raw: &RawRow,
) -> CatalogResult<()> {
    let n = &ctx.normalizer;
    let price = parse_price(&raw.price)?;
    let rest = parse_rest(&raw.rest)?;
    let quantity = raw
        .quantity
        .as_deref()
        .map(parse_quantity)
        .transpose()?
        .unwrap_or(0);

    let articul = n.key(&raw.articul);
    if articul.is_empty() {
        return Err(CatalogError::malformed("articul", raw.articul.as_str()));
    }
    if n.name(&raw.name).is_empty() {
        return Err(CatalogError::malformed("name", raw.name.as_str()));
    }

    let brand_id = resolve_brand(store, n, &raw.brand).await?;
    let (primary, aliases) = ctx.aliases.canonicalize(brand_id, &articul);
    store
        .upsert_articul(&ArticulKey::new(primary.as_str(), brand_id), &aliases)
        .await?;

    let product_id = get_or_create(
        store,
        n,
        &ProductInput {
            articul: &primary,
            supplier_id,
            brand_id,
            name: &raw.name,
            partnum: &raw.partnum,
            quantity,
        },
    )
    .await?;
    apply_price(store, product_id, upload_id, price, rest).await?;

    tracing::debug!(
        supplier = %descriptor.name,
        line = raw.line,
        product_id,
        articul = %primary,
        "applied row"
    );
    Ok(())
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;
