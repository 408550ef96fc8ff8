//! Persistence contract for the catalog.
//!
//! Every write is a single atomic statement from the caller's point of view.
//! Unique-key rejections surface as [`CatalogError::Duplicate`] so callers
//! can fall back to a lookup; an unreachable backend surfaces as
//! [`CatalogError::Unavailable`].
//!
//! [`CatalogError::Duplicate`]: crate::CatalogError::Duplicate
//! [`CatalogError::Unavailable`]: crate::CatalogError::Unavailable

use std::future::Future;

use rust_decimal::Decimal;

use crate::error::CatalogResult;
use crate::products::{
    ArticulKey, ArticulRecord, BrandRecord, ContentHash, NewProduct, PriceActual,
    PriceHistoryEntry, ProductRecord, UploadFileSummary, UploadRecord,
};

pub trait CatalogStore: Send + Sync {
    // --- brands ---

    /// Id of the brand owning `alias`, if any.
    fn find_brand_by_alias(
        &self,
        alias: &str,
    ) -> impl Future<Output = CatalogResult<Option<i64>>> + Send;

    /// Creates a brand owning every alias in `aliases`. `Duplicate` if any
    /// alias already belongs to a brand; nothing is written in that case.
    fn insert_brand(
        &self,
        name: &str,
        aliases: &[String],
    ) -> impl Future<Output = CatalogResult<i64>> + Send;

    /// Attaches `alias` to `brand_id`. A no-op if the brand already owns it,
    /// `Duplicate` if another brand does.
    fn add_brand_alias(
        &self,
        brand_id: i64,
        alias: &str,
    ) -> impl Future<Output = CatalogResult<()>> + Send;

    fn get_brand(&self, id: i64) -> impl Future<Output = CatalogResult<Option<BrandRecord>>> + Send;

    // --- categories ---

    /// `Duplicate` if the name or normalized name exists.
    fn insert_category(
        &self,
        name: &str,
        norm: &str,
    ) -> impl Future<Output = CatalogResult<i64>> + Send;

    fn find_category_by_norm(
        &self,
        norm: &str,
    ) -> impl Future<Output = CatalogResult<Option<i64>>> + Send;

    /// `Duplicate` if the keyphrase is already assigned to any category.
    fn insert_keyphrase(
        &self,
        category_id: i64,
        keyphrase: &str,
    ) -> impl Future<Output = CatalogResult<()>> + Send;

    /// Every `(keyphrase, category_id)` pair.
    fn list_keyphrases(&self) -> impl Future<Output = CatalogResult<Vec<(String, i64)>>> + Send;

    // --- suppliers ---

    fn upsert_supplier(
        &self,
        name: &str,
        email: Option<&str>,
    ) -> impl Future<Output = CatalogResult<i64>> + Send;

    // --- articuls ---

    /// Inserts the articul or replaces its alias set when the stored set
    /// differs. The set is stored sorted and without the key itself.
    /// Returns whether anything was written.
    fn upsert_articul(
        &self,
        key: &ArticulKey,
        aliases: &[String],
    ) -> impl Future<Output = CatalogResult<bool>> + Send;

    fn get_articul(
        &self,
        key: &ArticulKey,
    ) -> impl Future<Output = CatalogResult<Option<ArticulRecord>>> + Send;

    /// Articuls with no category, ordered by articul then brand.
    fn list_uncategorized_articuls(
        &self,
    ) -> impl Future<Output = CatalogResult<Vec<ArticulKey>>> + Send;

    /// Assigns a category only if none is set. Returns whether it changed.
    fn set_articul_category(
        &self,
        key: &ArticulKey,
        category_id: i64,
    ) -> impl Future<Output = CatalogResult<bool>> + Send;

    /// Returns whether a category was cleared.
    fn clear_articul_category(
        &self,
        key: &ArticulKey,
    ) -> impl Future<Output = CatalogResult<bool>> + Send;

    /// Distinct product names recorded under the articul, oldest first.
    fn product_names_for_articul(
        &self,
        key: &ArticulKey,
    ) -> impl Future<Output = CatalogResult<Vec<String>>> + Send;

    // --- products ---

    fn find_product_by_hash(
        &self,
        hash: &ContentHash,
    ) -> impl Future<Output = CatalogResult<Option<ProductRecord>>> + Send;

    /// `Duplicate` if the hash exists. The articul must already be stored.
    fn insert_product(
        &self,
        product: &NewProduct,
    ) -> impl Future<Output = CatalogResult<i64>> + Send;

    // --- uploads and prices ---

    fn create_upload(&self) -> impl Future<Output = CatalogResult<UploadRecord>> + Send;

    /// Appends a history row and upserts the actual price. The actual row is
    /// only overwritten when `upload_id` is not older than the stored one.
    fn record_price(
        &self,
        product_id: i64,
        upload_id: i64,
        price: Decimal,
        rest: i32,
    ) -> impl Future<Output = CatalogResult<()>> + Send;

    /// Zeroes `rest` and stamps `upload_id` on every actual price of the
    /// supplier's products last touched by an older upload. Returns the
    /// number of rows changed.
    fn mark_out_of_stock(
        &self,
        supplier_id: i64,
        upload_id: i64,
    ) -> impl Future<Output = CatalogResult<u64>> + Send;

    fn get_price_actual(
        &self,
        product_id: i64,
    ) -> impl Future<Output = CatalogResult<Option<PriceActual>>> + Send;

    /// History rows for a product, oldest first.
    fn list_price_history(
        &self,
        product_id: i64,
    ) -> impl Future<Output = CatalogResult<Vec<PriceHistoryEntry>>> + Send;

    fn record_upload_file(
        &self,
        upload_id: i64,
        summary: &UploadFileSummary,
    ) -> impl Future<Output = CatalogResult<()>> + Send;

    /// Per-file summaries of an upload in the order they were recorded.
    fn list_upload_files(
        &self,
        upload_id: i64,
    ) -> impl Future<Output = CatalogResult<Vec<UploadFileSummary>>> + Send;

    /// Most recent uploads first.
    fn list_uploads(&self, limit: i64)
        -> impl Future<Output = CatalogResult<Vec<UploadRecord>>> + Send;
}

/// Sorted, de-duplicated alias set without the owning articul.
#[must_use]
pub fn canonical_alias_set(articul: &str, aliases: &[String]) -> Vec<String> {
    let mut set: Vec<String> = aliases
        .iter()
        .filter(|a| !a.is_empty() && a.as_str() != articul)
        .cloned()
        .collect();
    set.sort();
    set.dedup();
    set
}
