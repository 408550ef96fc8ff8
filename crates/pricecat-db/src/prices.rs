//! Database operations for `prices_actual` and `prices_history`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `prices_actual` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceActualRow {
    pub product_id: i64,
    pub upload_id: i64,
    pub price: Decimal,
    pub rest: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<PriceActualRow> for pricecat_core::PriceActual {
    fn from(row: PriceActualRow) -> Self {
        Self {
            product_id: row.product_id,
            upload_id: row.upload_id,
            price: row.price,
            rest: row.rest,
            updated_at: row.updated_at,
        }
    }
}

/// A row from the `prices_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceHistoryRow {
    pub id: i64,
    pub product_id: i64,
    pub upload_id: i64,
    pub price: Decimal,
    pub rest: i32,
    pub recorded_at: DateTime<Utc>,
}

impl From<PriceHistoryRow> for pricecat_core::PriceHistoryEntry {
    fn from(row: PriceHistoryRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            upload_id: row.upload_id,
            price: row.price,
            rest: row.rest,
            recorded_at: row.recorded_at,
        }
    }
}

/// Upserts the actual price and appends a history row in one transaction.
///
/// The actual row is left untouched when it already carries a newer upload
/// id, so replaying an old upload never rolls the current price back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails.
pub async fn record_price(
    pool: &PgPool,
    product_id: i64,
    upload_id: i64,
    price: Decimal,
    rest: i32,
) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO prices_actual (product_id, upload_id, price, rest) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (product_id) DO UPDATE SET \
             upload_id  = EXCLUDED.upload_id, \
             price      = EXCLUDED.price, \
             rest       = EXCLUDED.rest, \
             updated_at = NOW() \
         WHERE prices_actual.upload_id <= EXCLUDED.upload_id",
    )
    .bind(product_id)
    .bind(upload_id)
    .bind(price)
    .bind(rest)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO prices_history (product_id, upload_id, price, rest) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(product_id)
    .bind(upload_id)
    .bind(price)
    .bind(rest)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Zeroes the stock of every product of `supplier_id` whose actual price was
/// last written by an upload older than `upload_id`, stamping `upload_id`.
///
/// Returns the number of rows changed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_out_of_stock(
    pool: &PgPool,
    supplier_id: i64,
    upload_id: i64,
) -> Result<u64, DbError> {
    let affected = sqlx::query(
        "UPDATE prices_actual pa \
         SET rest = 0, upload_id = $2, updated_at = NOW() \
         FROM products p \
         WHERE p.id = pa.product_id \
           AND p.supplier_id = $1 \
           AND pa.upload_id < $2",
    )
    .bind(supplier_id)
    .bind(upload_id)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(affected)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_price_actual(
    pool: &PgPool,
    product_id: i64,
) -> Result<Option<PriceActualRow>, DbError> {
    let row = sqlx::query_as::<_, PriceActualRow>(
        "SELECT product_id, upload_id, price, rest, updated_at \
         FROM prices_actual \
         WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// History rows for a product, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_price_history(
    pool: &PgPool,
    product_id: i64,
) -> Result<Vec<PriceHistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, PriceHistoryRow>(
        "SELECT id, product_id, upload_id, price, rest, recorded_at \
         FROM prices_history \
         WHERE product_id = $1 \
         ORDER BY id",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
