//! Database operations for the `products` table.

use pricecat_core::{ContentHash, NewProduct};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub hash: String,
    pub supplier_id: i64,
    pub brand_id: i64,
    pub articul: String,
    pub name: String,
    pub partnum: String,
    pub quantity: i32,
}

impl From<ProductRow> for pricecat_core::ProductRecord {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            hash: ContentHash::from_stored(row.hash),
            supplier_id: row.supplier_id,
            brand_id: row.brand_id,
            articul: row.articul,
            name: row.name,
            partnum: row.partnum,
            quantity: row.quantity,
        }
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_by_hash(pool: &PgPool, hash: &str) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, hash::TEXT AS hash, supplier_id, brand_id, articul, name, partnum, quantity \
         FROM products \
         WHERE hash = $1",
    )
    .bind(hash)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Inserts a product keyed by its content hash.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a unique
/// violation when the hash already exists.
pub async fn insert_product(pool: &PgPool, product: &NewProduct) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (hash, supplier_id, brand_id, articul, name, partnum, quantity) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id",
    )
    .bind(product.hash.as_str())
    .bind(product.supplier_id)
    .bind(product.brand_id)
    .bind(&product.articul)
    .bind(&product.name)
    .bind(&product.partnum)
    .bind(product.quantity)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
