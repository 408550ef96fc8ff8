//! Database operations for `categories` and `category_keyphrases`.

use sqlx::PgPool;

use crate::DbError;

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a unique
/// violation on `name` or `norm`.
pub async fn insert_category(pool: &PgPool, name: &str, norm: &str) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO categories (name, norm) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(norm)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_category_by_norm(pool: &PgPool, norm: &str) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE norm = $1")
        .bind(norm)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a unique
/// violation on `keyphrase`.
pub async fn insert_keyphrase(
    pool: &PgPool,
    category_id: i64,
    keyphrase: &str,
) -> Result<(), DbError> {
    sqlx::query("INSERT INTO category_keyphrases (keyphrase, category_id) VALUES ($1, $2)")
        .bind(keyphrase)
        .bind(category_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Every `(keyphrase, category_id)` pair in insertion order. Match priority
/// is applied by the caller.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_keyphrases(pool: &PgPool) -> Result<Vec<(String, i64)>, DbError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT keyphrase, category_id FROM category_keyphrases ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
