//! Database operations for the `articuls` table.

use sqlx::PgPool;

use crate::DbError;

/// A row from the `articuls` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticulRow {
    pub articul: String,
    pub brand_id: i64,
    pub aliases: Vec<String>,
    pub category_id: Option<i64>,
}

impl From<ArticulRow> for pricecat_core::ArticulRecord {
    fn from(row: ArticulRow) -> Self {
        Self {
            key: pricecat_core::ArticulKey::new(row.articul, row.brand_id),
            aliases: row.aliases,
            category_id: row.category_id,
        }
    }
}

/// Inserts the articul, or replaces its alias set when the stored set is
/// different. `aliases` must already be sorted and de-duplicated so that the
/// array comparison is a set comparison.
///
/// Returns `true` if a row was inserted or updated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_articul(
    pool: &PgPool,
    articul: &str,
    brand_id: i64,
    aliases: &[String],
) -> Result<bool, DbError> {
    let affected = sqlx::query(
        "INSERT INTO articuls (articul, brand_id, aliases) VALUES ($1, $2, $3) \
         ON CONFLICT (articul, brand_id) DO UPDATE SET \
             aliases    = EXCLUDED.aliases, \
             updated_at = NOW() \
         WHERE articuls.aliases IS DISTINCT FROM EXCLUDED.aliases",
    )
    .bind(articul)
    .bind(brand_id)
    .bind(aliases)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(affected > 0)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_articul(
    pool: &PgPool,
    articul: &str,
    brand_id: i64,
) -> Result<Option<ArticulRow>, DbError> {
    let row = sqlx::query_as::<_, ArticulRow>(
        "SELECT articul, brand_id, aliases, category_id \
         FROM articuls \
         WHERE articul = $1 AND brand_id = $2",
    )
    .bind(articul)
    .bind(brand_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Keys of every articul without a category, ordered by articul then brand.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_uncategorized(pool: &PgPool) -> Result<Vec<(String, i64)>, DbError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT articul, brand_id FROM articuls \
         WHERE category_id IS NULL \
         ORDER BY articul, brand_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Assigns a category only where none is set.
///
/// Returns `true` if the category changed. Returns [`DbError::NotFound`] if
/// the articul does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a statement fails.
pub async fn set_category(
    pool: &PgPool,
    articul: &str,
    brand_id: i64,
    category_id: i64,
) -> Result<bool, DbError> {
    let affected = sqlx::query(
        "UPDATE articuls SET category_id = $3, updated_at = NOW() \
         WHERE articul = $1 AND brand_id = $2 AND category_id IS NULL",
    )
    .bind(articul)
    .bind(brand_id)
    .bind(category_id)
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        ensure_exists(pool, articul, brand_id).await?;
    }
    Ok(affected > 0)
}

/// Clears the category so the next categorization pass reconsiders the
/// articul.
///
/// Returns `true` if a category was cleared.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the articul does not exist, or
/// [`DbError::Sqlx`] if a statement fails.
pub async fn clear_category(pool: &PgPool, articul: &str, brand_id: i64) -> Result<bool, DbError> {
    let affected = sqlx::query(
        "UPDATE articuls SET category_id = NULL, updated_at = NOW() \
         WHERE articul = $1 AND brand_id = $2 AND category_id IS NOT NULL",
    )
    .bind(articul)
    .bind(brand_id)
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        ensure_exists(pool, articul, brand_id).await?;
    }
    Ok(affected > 0)
}

/// Distinct product names under an articul, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn product_names(
    pool: &PgPool,
    articul: &str,
    brand_id: i64,
) -> Result<Vec<String>, DbError> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT name FROM products \
         WHERE articul = $1 AND brand_id = $2 \
         GROUP BY name \
         ORDER BY MIN(id)",
    )
    .bind(articul)
    .bind(brand_id)
    .fetch_all(pool)
    .await?;
    Ok(names)
}

async fn ensure_exists(pool: &PgPool, articul: &str, brand_id: i64) -> Result<(), DbError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM articuls WHERE articul = $1 AND brand_id = $2)",
    )
    .bind(articul)
    .bind(brand_id)
    .fetch_one(pool)
    .await?;
    if exists {
        Ok(())
    } else {
        Err(DbError::NotFound)
    }
}
