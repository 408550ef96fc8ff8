//! Database operations for `uploads` and `upload_files`.

use chrono::{DateTime, Utc};
use pricecat_core::{FileStatus, UploadFileSummary, UploadRecord};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `uploads` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UploadRow {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<UploadRow> for UploadRecord {
    fn from(row: UploadRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
        }
    }
}

/// A row from the `upload_files` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UploadFileRow {
    pub file_name: String,
    pub supplier_id: Option<i64>,
    pub status: String,
    pub rows_total: i64,
    pub rows_applied: i64,
    pub error_message: Option<String>,
}

impl TryFrom<UploadFileRow> for UploadFileSummary {
    type Error = DbError;

    fn try_from(row: UploadFileRow) -> Result<Self, Self::Error> {
        let status = FileStatus::parse(&row.status)
            .ok_or_else(|| DbError::Corrupt(format!("unknown file status '{}'", row.status)))?;
        Ok(Self {
            file_name: row.file_name,
            supplier_id: row.supplier_id,
            status,
            rows_total: row.rows_total,
            rows_applied: row.rows_applied,
            error_message: row.error_message,
        })
    }
}

/// Opens a new upload. Its id orders every price write it produces.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_upload(pool: &PgPool) -> Result<UploadRow, DbError> {
    let row = sqlx::query_as::<_, UploadRow>(
        "INSERT INTO uploads DEFAULT VALUES RETURNING id, created_at",
    )
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Most recent uploads first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_uploads(pool: &PgPool, limit: i64) -> Result<Vec<UploadRow>, DbError> {
    let rows = sqlx::query_as::<_, UploadRow>(
        "SELECT id, created_at FROM uploads ORDER BY id DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a unique
/// violation when the file was already recorded for this upload.
pub async fn record_upload_file(
    pool: &PgPool,
    upload_id: i64,
    summary: &UploadFileSummary,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO upload_files \
             (upload_id, file_name, supplier_id, status, rows_total, rows_applied, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(upload_id)
    .bind(&summary.file_name)
    .bind(summary.supplier_id)
    .bind(summary.status.as_str())
    .bind(summary.rows_total)
    .bind(summary.rows_applied)
    .bind(&summary.error_message)
    .execute(pool)
    .await?;
    Ok(())
}

/// Per-file summaries in the order they were recorded.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Corrupt`] if a
/// stored status is unknown.
pub async fn list_upload_files(
    pool: &PgPool,
    upload_id: i64,
) -> Result<Vec<UploadFileSummary>, DbError> {
    let rows = sqlx::query_as::<_, UploadFileRow>(
        "SELECT file_name, supplier_id, status, rows_total, rows_applied, error_message \
         FROM upload_files \
         WHERE upload_id = $1 \
         ORDER BY id",
    )
    .bind(upload_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(UploadFileSummary::try_from).collect()
}
