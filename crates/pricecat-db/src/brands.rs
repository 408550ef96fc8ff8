//! Database operations for `brands` and `brand_aliases`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `brands` table with its aliases folded in.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BrandRow {
    pub id: i64,
    pub name: String,
    pub aliases: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<BrandRow> for pricecat_core::BrandRecord {
    fn from(row: BrandRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            aliases: row.aliases,
        }
    }
}

/// Returns the id of the brand that owns `alias`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_brand_by_alias(pool: &PgPool, alias: &str) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>("SELECT brand_id FROM brand_aliases WHERE alias = $1")
        .bind(alias)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// Creates a brand and all of its aliases in one transaction.
///
/// A unique violation on any alias rolls the whole insert back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn insert_brand(pool: &PgPool, name: &str, aliases: &[String]) -> Result<i64, DbError> {
    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar::<_, i64>("INSERT INTO brands (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

    let mut seen: Vec<&str> = Vec::with_capacity(aliases.len());
    for alias in aliases {
        if seen.contains(&alias.as_str()) {
            continue;
        }
        seen.push(alias.as_str());
        sqlx::query("INSERT INTO brand_aliases (alias, brand_id) VALUES ($1, $2)")
            .bind(alias)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(id)
}

/// Attaches `alias` to `brand_id` unless some brand already owns it.
///
/// Returns the id of the brand owning the alias afterwards, which differs
/// from `brand_id` when another brand got there first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a statement fails, including a foreign-key
/// violation for an unknown `brand_id`.
pub async fn add_brand_alias(pool: &PgPool, brand_id: i64, alias: &str) -> Result<i64, DbError> {
    let inserted = sqlx::query(
        "INSERT INTO brand_aliases (alias, brand_id) VALUES ($1, $2) \
         ON CONFLICT (alias) DO NOTHING",
    )
    .bind(alias)
    .bind(brand_id)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted == 1 {
        return Ok(brand_id);
    }

    find_brand_by_alias(pool, alias)
        .await?
        .ok_or(DbError::NotFound)
}

/// Returns a brand with its aliases, oldest alias first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_brand(pool: &PgPool, id: i64) -> Result<Option<BrandRow>, DbError> {
    let row = sqlx::query_as::<_, BrandRow>(
        "SELECT b.id, b.name, \
                ARRAY(SELECT a.alias FROM brand_aliases a \
                      WHERE a.brand_id = b.id ORDER BY a.created_at, a.alias) AS aliases, \
                b.created_at \
         FROM brands b \
         WHERE b.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
