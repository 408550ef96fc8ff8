use std::collections::BTreeSet;

use pricecat_core::{CatalogResult, CatalogStore};
use rust_decimal::Decimal;

/// Record the price of a product as seen in `upload_id`: the current snapshot
/// is upserted and a history row is appended.
///
/// # Errors
///
/// Propagates store errors.
pub async fn apply_price<S: CatalogStore>(
    store: &S,
    product_id: i64,
    upload_id: i64,
    price: Decimal,
    rest: i32,
) -> CatalogResult<()> {
    store.record_price(product_id, upload_id, price, rest).await
}

/// Zero the stock of the supplier's products that `upload_id` did not touch.
///
/// Must run only after every row of the supplier in this upload has been
/// applied.
///
/// # Errors
///
/// Propagates store errors.
pub async fn mark_out_of_stock<S: CatalogStore>(
    store: &S,
    supplier_id: i64,
    upload_id: i64,
) -> CatalogResult<u64> {
    let changed = store.mark_out_of_stock(supplier_id, upload_id).await?;
    tracing::info!(supplier_id, upload_id, products = changed, "marked out of stock");
    Ok(changed)
}

/// Suppliers whose rows were applied in the current upload. Swept once, after
/// all files.
#[derive(Debug, Default, Clone)]
pub struct StaleSweep {
    suppliers: BTreeSet<i64>,
}

impl StaleSweep {
    pub fn touch(&mut self, supplier_id: i64) {
        self.suppliers.insert(supplier_id);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.suppliers.is_empty()
    }

    pub fn suppliers(&self) -> impl Iterator<Item = i64> + '_ {
        self.suppliers.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use pricecat_core::{content_hash, ArticulKey, MemoryStore, NewProduct};

    use super::*;

    async fn product(store: &MemoryStore, articul: &str) -> i64 {
        store
            .upsert_articul(&ArticulKey::new(articul, 1), &[])
            .await
            .unwrap();
        store
            .insert_product(&NewProduct {
                hash: content_hash(1, articul, articul),
                supplier_id: 1,
                brand_id: 1,
                articul: articul.into(),
                name: articul.into(),
                partnum: String::new(),
                quantity: 0,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn product_absent_from_newer_upload_goes_out_of_stock() {
        let store = MemoryStore::new();
        let id = product(&store, "a1").await;

        apply_price(&store, id, 5, Decimal::new(1999, 2), 7).await.unwrap();
        assert_eq!(mark_out_of_stock(&store, 1, 6).await.unwrap(), 1);

        let actual = store.get_price_actual(id).await.unwrap().unwrap();
        assert_eq!(actual.rest, 0);
        assert_eq!(actual.upload_id, 6);
        assert_eq!(actual.price, Decimal::new(1999, 2));
    }

    #[tokio::test]
    async fn reapplying_same_price_appends_history_only() {
        let store = MemoryStore::new();
        let id = product(&store, "a1").await;

        apply_price(&store, id, 1, Decimal::TEN, 2).await.unwrap();
        apply_price(&store, id, 2, Decimal::TEN, 2).await.unwrap();

        assert_eq!(store.counts().prices_actual, 1);
        assert_eq!(store.list_price_history(id).await.unwrap().len(), 2);
    }

    #[test]
    fn sweep_deduplicates_suppliers() {
        let mut sweep = StaleSweep::default();
        assert!(sweep.is_empty());
        sweep.touch(3);
        sweep.touch(1);
        sweep.touch(3);
        assert_eq!(sweep.suppliers().collect::<Vec<_>>(), vec![1, 3]);
    }
}
