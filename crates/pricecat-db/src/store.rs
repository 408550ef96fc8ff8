use pricecat_core::{
    canonical_alias_set, ArticulKey, ArticulRecord, BrandRecord, CatalogError, CatalogResult,
    CatalogStore, ContentHash, NewProduct, PriceActual, PriceHistoryEntry, ProductRecord,
    UploadFileSummary, UploadRecord,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{articuls, brands, categories, prices, products, suppliers, uploads};

/// [`CatalogStore`] over a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl CatalogStore for PgCatalogStore {
    async fn find_brand_by_alias(&self, alias: &str) -> CatalogResult<Option<i64>> {
        brands::find_brand_by_alias(&self.pool, alias)
            .await
            .map_err(|e| e.into_catalog("brand alias", alias))
    }

    async fn insert_brand(&self, name: &str, aliases: &[String]) -> CatalogResult<i64> {
        brands::insert_brand(&self.pool, name, aliases)
            .await
            .map_err(|e| e.into_catalog("brand alias", &aliases.join(",")))
    }

    async fn add_brand_alias(&self, brand_id: i64, alias: &str) -> CatalogResult<()> {
        let owner = brands::add_brand_alias(&self.pool, brand_id, alias)
            .await
            .map_err(|e| e.into_catalog("brand", &brand_id.to_string()))?;
        if owner == brand_id {
            Ok(())
        } else {
            Err(CatalogError::duplicate("brand alias", alias))
        }
    }

    async fn get_brand(&self, id: i64) -> CatalogResult<Option<BrandRecord>> {
        brands::get_brand(&self.pool, id)
            .await
            .map(|row| row.map(BrandRecord::from))
            .map_err(|e| e.into_catalog("brand", &id.to_string()))
    }

    async fn insert_category(&self, name: &str, norm: &str) -> CatalogResult<i64> {
        categories::insert_category(&self.pool, name, norm)
            .await
            .map_err(|e| e.into_catalog("category", norm))
    }

    async fn find_category_by_norm(&self, norm: &str) -> CatalogResult<Option<i64>> {
        categories::find_category_by_norm(&self.pool, norm)
            .await
            .map_err(|e| e.into_catalog("category", norm))
    }

    async fn insert_keyphrase(&self, category_id: i64, keyphrase: &str) -> CatalogResult<()> {
        categories::insert_keyphrase(&self.pool, category_id, keyphrase)
            .await
            .map_err(|e| e.into_catalog("keyphrase", keyphrase))
    }

    async fn list_keyphrases(&self) -> CatalogResult<Vec<(String, i64)>> {
        categories::list_keyphrases(&self.pool)
            .await
            .map_err(|e| e.into_catalog("keyphrase", "*"))
    }

    async fn upsert_supplier(&self, name: &str, email: Option<&str>) -> CatalogResult<i64> {
        suppliers::upsert_supplier(&self.pool, name, email)
            .await
            .map_err(|e| e.into_catalog("supplier", name))
    }

    async fn upsert_articul(&self, key: &ArticulKey, aliases: &[String]) -> CatalogResult<bool> {
        let set = canonical_alias_set(&key.articul, aliases);
        articuls::upsert_articul(&self.pool, &key.articul, key.brand_id, &set)
            .await
            .map_err(|e| e.into_catalog("articul", &key.to_string()))
    }

    async fn get_articul(&self, key: &ArticulKey) -> CatalogResult<Option<ArticulRecord>> {
        articuls::get_articul(&self.pool, &key.articul, key.brand_id)
            .await
            .map(|row| row.map(ArticulRecord::from))
            .map_err(|e| e.into_catalog("articul", &key.to_string()))
    }

    async fn list_uncategorized_articuls(&self) -> CatalogResult<Vec<ArticulKey>> {
        let rows = articuls::list_uncategorized(&self.pool)
            .await
            .map_err(|e| e.into_catalog("articul", "*"))?;
        Ok(rows
            .into_iter()
            .map(|(articul, brand_id)| ArticulKey::new(articul, brand_id))
            .collect())
    }

    async fn set_articul_category(&self, key: &ArticulKey, category_id: i64) -> CatalogResult<bool> {
        articuls::set_category(&self.pool, &key.articul, key.brand_id, category_id)
            .await
            .map_err(|e| e.into_catalog("articul", &key.to_string()))
    }

    async fn clear_articul_category(&self, key: &ArticulKey) -> CatalogResult<bool> {
        articuls::clear_category(&self.pool, &key.articul, key.brand_id)
            .await
            .map_err(|e| e.into_catalog("articul", &key.to_string()))
    }

    async fn product_names_for_articul(&self, key: &ArticulKey) -> CatalogResult<Vec<String>> {
        articuls::product_names(&self.pool, &key.articul, key.brand_id)
            .await
            .map_err(|e| e.into_catalog("articul", &key.to_string()))
    }

    async fn find_product_by_hash(&self, hash: &ContentHash) -> CatalogResult<Option<ProductRecord>> {
        products::find_by_hash(&self.pool, hash.as_str())
            .await
            .map(|row| row.map(ProductRecord::from))
            .map_err(|e| e.into_catalog("product", hash.as_str()))
    }

    async fn insert_product(&self, product: &NewProduct) -> CatalogResult<i64> {
        products::insert_product(&self.pool, product)
            .await
            .map_err(|e| {
                if e.violates("products_articul_fkey") {
                    let key = ArticulKey::new(product.articul.clone(), product.brand_id);
                    return CatalogError::not_found("articul", key.to_string());
                }
                e.into_catalog("product", product.hash.as_str())
            })
    }

    async fn create_upload(&self) -> CatalogResult<UploadRecord> {
        uploads::create_upload(&self.pool)
            .await
            .map(UploadRecord::from)
            .map_err(|e| e.into_catalog("upload", "new"))
    }

    async fn record_price(
        &self,
        product_id: i64,
        upload_id: i64,
        price: Decimal,
        rest: i32,
    ) -> CatalogResult<()> {
        prices::record_price(&self.pool, product_id, upload_id, price, rest)
            .await
            .map_err(|e| e.into_catalog("product", &product_id.to_string()))
    }

    async fn mark_out_of_stock(&self, supplier_id: i64, upload_id: i64) -> CatalogResult<u64> {
        prices::mark_out_of_stock(&self.pool, supplier_id, upload_id)
            .await
            .map_err(|e| e.into_catalog("supplier", &supplier_id.to_string()))
    }

    async fn get_price_actual(&self, product_id: i64) -> CatalogResult<Option<PriceActual>> {
        prices::get_price_actual(&self.pool, product_id)
            .await
            .map(|row| row.map(PriceActual::from))
            .map_err(|e| e.into_catalog("product", &product_id.to_string()))
    }

    async fn list_price_history(&self, product_id: i64) -> CatalogResult<Vec<PriceHistoryEntry>> {
        prices::list_price_history(&self.pool, product_id)
            .await
            .map(|rows| rows.into_iter().map(PriceHistoryEntry::from).collect())
            .map_err(|e| e.into_catalog("product", &product_id.to_string()))
    }

    async fn record_upload_file(
        &self,
        upload_id: i64,
        summary: &UploadFileSummary,
    ) -> CatalogResult<()> {
        uploads::record_upload_file(&self.pool, upload_id, summary)
            .await
            .map_err(|e| e.into_catalog("upload file", &summary.file_name))
    }

    async fn list_upload_files(&self, upload_id: i64) -> CatalogResult<Vec<UploadFileSummary>> {
        uploads::list_upload_files(&self.pool, upload_id)
            .await
            .map_err(|e| e.into_catalog("upload", &upload_id.to_string()))
    }

    async fn list_uploads(&self, limit: i64) -> CatalogResult<Vec<UploadRecord>> {
        uploads::list_uploads(&self.pool, limit)
            .await
            .map(|rows| rows.into_iter().map(UploadRecord::from).collect())
            .map_err(|e| e.into_catalog("upload", "*"))
    }
}
