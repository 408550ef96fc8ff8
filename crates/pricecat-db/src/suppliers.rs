//! Database operations for the `suppliers` table.

use sqlx::PgPool;

use crate::DbError;

/// Inserts the supplier or refreshes its email. A `None` email keeps the
/// stored one.
///
/// Returns the supplier id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_supplier(
    pool: &PgPool,
    name: &str,
    email: Option<&str>,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO suppliers (name, email) VALUES ($1, $2) \
         ON CONFLICT (name) DO UPDATE SET \
             email      = COALESCE(EXCLUDED.email, suppliers.email), \
             updated_at = NOW() \
         RETURNING id",
    )
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
