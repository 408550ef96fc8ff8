//! In-process [`CatalogStore`] backed by plain collections.
//!
//! Used by the test suites and by `ingest --dry-run`. Semantics mirror the
//! Postgres store, including unique-key `Duplicate` rejections and the
//! foreign-key check between products and articuls.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;

use crate::brands::NO_BRAND;
use crate::error::{CatalogError, CatalogResult};
use crate::products::{
    ArticulKey, ArticulRecord, BrandRecord, ContentHash, NewProduct, PriceActual,
    PriceHistoryEntry, ProductRecord, UploadFileSummary, UploadRecord,
};
use crate::store::{canonical_alias_set, CatalogStore};

#[derive(Debug, Default)]
struct Inner {
    brands: Vec<BrandRecord>,
    brand_aliases: HashMap<String, i64>,
    /// `(name, norm)`, id = index + 1.
    categories: Vec<(String, String)>,
    keyphrases: Vec<(String, i64)>,
    /// `(name, email)`, id = index + 1.
    suppliers: Vec<(String, Option<String>)>,
    articuls: BTreeMap<ArticulKey, ArticulRecord>,
    products: Vec<ProductRecord>,
    products_by_hash: HashMap<ContentHash, usize>,
    uploads: Vec<UploadRecord>,
    prices_actual: HashMap<i64, PriceActual>,
    prices_history: Vec<PriceHistoryEntry>,
    upload_files: Vec<(i64, UploadFileSummary)>,
}

/// Row counts, for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryCounts {
    pub brands: usize,
    pub categories: usize,
    pub articuls: usize,
    pub products: usize,
    pub uploads: usize,
    pub prices_actual: usize,
    pub prices_history: usize,
}

#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty catalog holding only the reserved brand.
    #[must_use]
    pub fn new() -> Self {
        let mut inner = Inner::default();
        inner.brands.push(BrandRecord {
            id: 1,
            name: NO_BRAND.to_string(),
            aliases: vec![NO_BRAND.to_string()],
        });
        inner.brand_aliases.insert(NO_BRAND.to_string(), 1);
        Self {
            inner: Mutex::new(inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn counts(&self) -> MemoryCounts {
        let inner = self.lock();
        MemoryCounts {
            brands: inner.brands.len(),
            categories: inner.categories.len(),
            articuls: inner.articuls.len(),
            products: inner.products.len(),
            uploads: inner.uploads.len(),
            prices_actual: inner.prices_actual.len(),
            prices_history: inner.prices_history.len(),
        }
    }
}

fn next_id(len: usize) -> i64 {
    i64::try_from(len).map_or(i64::MAX, |n| n + 1)
}

fn index_of(id: i64) -> Option<usize> {
    usize::try_from(id).ok()?.checked_sub(1)
}

impl CatalogStore for MemoryStore {
    async fn find_brand_by_alias(&self, alias: &str) -> CatalogResult<Option<i64>> {
        Ok(self.lock().brand_aliases.get(alias).copied())
    }

    async fn insert_brand(&self, name: &str, aliases: &[String]) -> CatalogResult<i64> {
        let mut inner = self.lock();
        if let Some(taken) = aliases.iter().find(|a| inner.brand_aliases.contains_key(*a)) {
            return Err(CatalogError::duplicate("brand alias", taken.clone()));
        }
        let id = next_id(inner.brands.len());
        let mut owned: Vec<String> = Vec::with_capacity(aliases.len());
        for alias in aliases {
            if !owned.contains(alias) {
                owned.push(alias.clone());
                inner.brand_aliases.insert(alias.clone(), id);
            }
        }
        inner.brands.push(BrandRecord {
            id,
            name: name.to_string(),
            aliases: owned,
        });
        Ok(id)
    }

    async fn add_brand_alias(&self, brand_id: i64, alias: &str) -> CatalogResult<()> {
        let mut inner = self.lock();
        match inner.brand_aliases.get(alias) {
            Some(&owner) if owner == brand_id => return Ok(()),
            Some(_) => return Err(CatalogError::duplicate("brand alias", alias)),
            None => {}
        }
        let idx = index_of(brand_id)
            .filter(|&i| i < inner.brands.len())
            .ok_or_else(|| CatalogError::not_found("brand", brand_id.to_string()))?;
        inner.brands[idx].aliases.push(alias.to_string());
        inner.brand_aliases.insert(alias.to_string(), brand_id);
        Ok(())
    }

    async fn get_brand(&self, id: i64) -> CatalogResult<Option<BrandRecord>> {
        let inner = self.lock();
        Ok(index_of(id).and_then(|i| inner.brands.get(i)).cloned())
    }

    async fn insert_category(&self, name: &str, norm: &str) -> CatalogResult<i64> {
        let mut inner = self.lock();
        if inner
            .categories
            .iter()
            .any(|(n, existing)| n == name || existing == norm)
        {
            return Err(CatalogError::duplicate("category", norm));
        }
        inner.categories.push((name.to_string(), norm.to_string()));
        Ok(next_id(inner.categories.len() - 1))
    }

    async fn find_category_by_norm(&self, norm: &str) -> CatalogResult<Option<i64>> {
        let inner = self.lock();
        Ok(inner
            .categories
            .iter()
            .position(|(_, existing)| existing == norm)
            .map(next_id))
    }

    async fn insert_keyphrase(&self, category_id: i64, keyphrase: &str) -> CatalogResult<()> {
        let mut inner = self.lock();
        if index_of(category_id).is_none_or(|i| i >= inner.categories.len()) {
            return Err(CatalogError::not_found("category", category_id.to_string()));
        }
        if inner.keyphrases.iter().any(|(p, _)| p == keyphrase) {
            return Err(CatalogError::duplicate("keyphrase", keyphrase));
        }
        inner.keyphrases.push((keyphrase.to_string(), category_id));
        Ok(())
    }

    async fn list_keyphrases(&self) -> CatalogResult<Vec<(String, i64)>> {
        Ok(self.lock().keyphrases.clone())
    }

    async fn upsert_supplier(&self, name: &str, email: Option<&str>) -> CatalogResult<i64> {
        let mut inner = self.lock();
        if let Some(pos) = inner.suppliers.iter().position(|(n, _)| n == name) {
            if let Some(email) = email {
                inner.suppliers[pos].1 = Some(email.to_string());
            }
            return Ok(next_id(pos));
        }
        inner
            .suppliers
            .push((name.to_string(), email.map(str::to_string)));
        Ok(next_id(inner.suppliers.len() - 1))
    }

    async fn upsert_articul(&self, key: &ArticulKey, aliases: &[String]) -> CatalogResult<bool> {
        let mut inner = self.lock();
        if index_of(key.brand_id).is_none_or(|i| i >= inner.brands.len()) {
            return Err(CatalogError::not_found("brand", key.brand_id.to_string()));
        }
        let set = canonical_alias_set(&key.articul, aliases);
        match inner.articuls.get_mut(key) {
            Some(record) if record.aliases == set => Ok(false),
            Some(record) => {
                record.aliases = set;
                Ok(true)
            }
            None => {
                inner.articuls.insert(
                    key.clone(),
                    ArticulRecord {
                        key: key.clone(),
                        aliases: set,
                        category_id: None,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn get_articul(&self, key: &ArticulKey) -> CatalogResult<Option<ArticulRecord>> {
        Ok(self.lock().articuls.get(key).cloned())
    }

    async fn list_uncategorized_articuls(&self) -> CatalogResult<Vec<ArticulKey>> {
        Ok(self
            .lock()
            .articuls
            .values()
            .filter(|a| a.category_id.is_none())
            .map(|a| a.key.clone())
            .collect())
    }

    async fn set_articul_category(&self, key: &ArticulKey, category_id: i64) -> CatalogResult<bool> {
        let mut inner = self.lock();
        if index_of(category_id).is_none_or(|i| i >= inner.categories.len()) {
            return Err(CatalogError::not_found("category", category_id.to_string()));
        }
        match inner.articuls.get_mut(key) {
            Some(record) if record.category_id.is_none() => {
                record.category_id = Some(category_id);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(CatalogError::not_found("articul", key.to_string())),
        }
    }

    async fn clear_articul_category(&self, key: &ArticulKey) -> CatalogResult<bool> {
        let mut inner = self.lock();
        match inner.articuls.get_mut(key) {
            Some(record) => Ok(record.category_id.take().is_some()),
            None => Err(CatalogError::not_found("articul", key.to_string())),
        }
    }

    async fn product_names_for_articul(&self, key: &ArticulKey) -> CatalogResult<Vec<String>> {
        let inner = self.lock();
        let mut names: Vec<String> = Vec::new();
        for p in &inner.products {
            if p.brand_id == key.brand_id && p.articul == key.articul && !names.contains(&p.name) {
                names.push(p.name.clone());
            }
        }
        Ok(names)
    }

    async fn find_product_by_hash(&self, hash: &ContentHash) -> CatalogResult<Option<ProductRecord>> {
        let inner = self.lock();
        Ok(inner
            .products_by_hash
            .get(hash)
            .map(|&i| inner.products[i].clone()))
    }

    async fn insert_product(&self, product: &NewProduct) -> CatalogResult<i64> {
        let mut inner = self.lock();
        if inner.products_by_hash.contains_key(&product.hash) {
            return Err(CatalogError::duplicate("product", product.hash.as_str()));
        }
        let key = ArticulKey::new(product.articul.clone(), product.brand_id);
        if !inner.articuls.contains_key(&key) {
            return Err(CatalogError::not_found("articul", key.to_string()));
        }
        let idx = inner.products.len();
        let id = next_id(idx);
        inner.products.push(ProductRecord {
            id,
            hash: product.hash.clone(),
            supplier_id: product.supplier_id,
            brand_id: product.brand_id,
            articul: product.articul.clone(),
            name: product.name.clone(),
            partnum: product.partnum.clone(),
            quantity: product.quantity,
        });
        inner.products_by_hash.insert(product.hash.clone(), idx);
        Ok(id)
    }

    async fn create_upload(&self) -> CatalogResult<UploadRecord> {
        let mut inner = self.lock();
        let record = UploadRecord {
            id: next_id(inner.uploads.len()),
            created_at: Utc::now(),
        };
        inner.uploads.push(record.clone());
        Ok(record)
    }

    async fn record_price(
        &self,
        product_id: i64,
        upload_id: i64,
        price: Decimal,
        rest: i32,
    ) -> CatalogResult<()> {
        let mut inner = self.lock();
        if index_of(product_id).is_none_or(|i| i >= inner.products.len()) {
            return Err(CatalogError::not_found("product", product_id.to_string()));
        }
        let now = Utc::now();
        let stale = inner
            .prices_actual
            .get(&product_id)
            .is_some_and(|existing| existing.upload_id > upload_id);
        if !stale {
            inner.prices_actual.insert(
                product_id,
                PriceActual {
                    product_id,
                    upload_id,
                    price,
                    rest,
                    updated_at: now,
                },
            );
        }
        let id = next_id(inner.prices_history.len());
        inner.prices_history.push(PriceHistoryEntry {
            id,
            product_id,
            upload_id,
            price,
            rest,
            recorded_at: now,
        });
        Ok(())
    }

    async fn mark_out_of_stock(&self, supplier_id: i64, upload_id: i64) -> CatalogResult<u64> {
        let mut inner = self.lock();
        let Inner {
            products,
            prices_actual,
            ..
        } = &mut *inner;
        let now = Utc::now();
        let mut changed = 0;
        for product in products.iter().filter(|p| p.supplier_id == supplier_id) {
            if let Some(actual) = prices_actual.get_mut(&product.id) {
                if actual.upload_id < upload_id {
                    actual.rest = 0;
                    actual.upload_id = upload_id;
                    actual.updated_at = now;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn get_price_actual(&self, product_id: i64) -> CatalogResult<Option<PriceActual>> {
        Ok(self.lock().prices_actual.get(&product_id).cloned())
    }

    async fn list_price_history(&self, product_id: i64) -> CatalogResult<Vec<PriceHistoryEntry>> {
        Ok(self
            .lock()
            .prices_history
            .iter()
            .filter(|h| h.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn record_upload_file(
        &self,
        upload_id: i64,
        summary: &UploadFileSummary,
    ) -> CatalogResult<()> {
        let mut inner = self.lock();
        if inner
            .upload_files
            .iter()
            .any(|(u, s)| *u == upload_id && s.file_name == summary.file_name)
        {
            return Err(CatalogError::duplicate("upload file", summary.file_name.clone()));
        }
        inner.upload_files.push((upload_id, summary.clone()));
        Ok(())
    }

    async fn list_upload_files(&self, upload_id: i64) -> CatalogResult<Vec<UploadFileSummary>> {
        Ok(self
            .lock()
            .upload_files
            .iter()
            .filter(|(u, _)| *u == upload_id)
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn list_uploads(&self, limit: i64) -> CatalogResult<Vec<UploadRecord>> {
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(self.lock().uploads.iter().rev().take(take).cloned().collect())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
