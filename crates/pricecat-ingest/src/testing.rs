//! Store wrapper that loses insert races, for exercising the
//! `Duplicate` fallbacks without a second process.

use std::sync::atomic::{AtomicBool, Ordering};

use pricecat_core::{
    ArticulKey, ArticulRecord, BrandRecord, CatalogError, CatalogResult, CatalogStore,
    ContentHash, MemoryStore, NewProduct, PriceActual, PriceHistoryEntry, ProductRecord,
    UploadFileSummary, UploadRecord,
};
use rust_decimal::Decimal;

/// The first `insert_brand` and `insert_product` calls let a competing
/// writer store the row first, then report `Duplicate` like a unique-key
/// violation would.
pub(crate) struct RacingStore {
    pub(crate) inner: MemoryStore,
    winner_brand_name: String,
    brand_raced: AtomicBool,
    product_raced: AtomicBool,
}

impl RacingStore {
    pub(crate) fn new(winner_brand_name: &str) -> Self {
        Self {
            inner: MemoryStore::new(),
            winner_brand_name: winner_brand_name.to_string(),
            brand_raced: AtomicBool::new(false),
            product_raced: AtomicBool::new(false),
        }
    }
}

impl CatalogStore for RacingStore {
    async fn find_brand_by_alias(&self, alias: &str) -> CatalogResult<Option<i64>> {
        self.inner.find_brand_by_alias(alias).await
    }

    async fn insert_brand(&self, name: &str, aliases: &[String]) -> CatalogResult<i64> {
        if self.brand_raced.swap(true, Ordering::SeqCst) {
            return self.inner.insert_brand(name, aliases).await;
        }
        self.inner
            .insert_brand(&self.winner_brand_name, aliases)
            .await?;
        Err(CatalogError::duplicate("brand", name))
    }

    async fn add_brand_alias(&self, brand_id: i64, alias: &str) -> CatalogResult<()> {
        self.inner.add_brand_alias(brand_id, alias).await
    }

    async fn get_brand(&self, id: i64) -> CatalogResult<Option<BrandRecord>> {
        self.inner.get_brand(id).await
    }

    async fn insert_category(&self, name: &str, norm: &str) -> CatalogResult<i64> {
        self.inner.insert_category(name, norm).await
    }

    async fn find_category_by_norm(&self, norm: &str) -> CatalogResult<Option<i64>> {
        self.inner.find_category_by_norm(norm).await
    }

    async fn insert_keyphrase(&self, category_id: i64, keyphrase: &str) -> CatalogResult<()> {
        self.inner.insert_keyphrase(category_id, keyphrase).await
    }

    async fn list_keyphrases(&self) -> CatalogResult<Vec<(String, i64)>> {
        self.inner.list_keyphrases().await
    }

    async fn upsert_supplier(&self, name: &str, email: Option<&str>) -> CatalogResult<i64> {
        self.inner.upsert_supplier(name, email).await
    }

    async fn upsert_articul(&self, key: &ArticulKey, aliases: &[String]) -> CatalogResult<bool> {
        self.inner.upsert_articul(key, aliases).await
    }

    async fn get_articul(&self, key: &ArticulKey) -> CatalogResult<Option<ArticulRecord>> {
        self.inner.get_articul(key).await
    }

    async fn list_uncategorized_articuls(&self) -> CatalogResult<Vec<ArticulKey>> {
        self.inner.list_uncategorized_articuls().await
    }

    async fn set_articul_category(&self, key: &ArticulKey, category_id: i64) -> CatalogResult<bool> {
        self.inner.set_articul_category(key, category_id).await
    }

    async fn clear_articul_category(&self, key: &ArticulKey) -> CatalogResult<bool> {
        self.inner.clear_articul_category(key).await
    }

    async fn product_names_for_articul(&self, key: &ArticulKey) -> CatalogResult<Vec<String>> {
        self.inner.product_names_for_articul(key).await
    }

    async fn find_product_by_hash(&self, hash: &ContentHash) -> CatalogResult<Option<ProductRecord>> {
        self.inner.find_product_by_hash(hash).await
    }

    async fn insert_product(&self, product: &NewProduct) -> CatalogResult<i64> {
        if self.product_raced.swap(true, Ordering::SeqCst) {
            return self.inner.insert_product(product).await;
        }
        self.inner.insert_product(product).await?;
        Err(CatalogError::duplicate("product", product.hash.as_str()))
    }

    async fn create_upload(&self) -> CatalogResult<UploadRecord> {
        self.inner.create_upload().await
    }

    async fn record_price(
        &self,
        product_id: i64,
        upload_id: i64,
        price: Decimal,
        rest: i32,
    ) -> CatalogResult<()> {
        self.inner.record_price(product_id, upload_id, price, rest).await
    }

    async fn mark_out_of_stock(&self, supplier_id: i64, upload_id: i64) -> CatalogResult<u64> {
        self.inner.mark_out_of_stock(supplier_id, upload_id).await
    }

    async fn get_price_actual(&self, product_id: i64) -> CatalogResult<Option<PriceActual>> {
        self.inner.get_price_actual(product_id).await
    }

    async fn list_price_history(&self, product_id: i64) -> CatalogResult<Vec<PriceHistoryEntry>> {
        self.inner.list_price_history(product_id).await
    }

    async fn record_upload_file(
        &self,
        upload_id: i64,
        summary: &UploadFileSummary,
    ) -> CatalogResult<()> {
        self.inner.record_upload_file(upload_id, summary).await
    }

    async fn list_upload_files(&self, upload_id: i64) -> CatalogResult<Vec<UploadFileSummary>> {
        self.inner.list_upload_files(upload_id).await
    }

    async fn list_uploads(&self, limit: i64) -> CatalogResult<Vec<UploadRecord>> {
        self.inner.list_uploads(limit).await
    }
}
