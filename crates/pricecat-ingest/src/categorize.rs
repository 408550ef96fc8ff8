use pricecat_core::{
    ArticulKey, CatalogError, CatalogResult, CatalogStore, MatchTable, Normalizer, NO_BRAND,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CategorizeSummary {
    pub examined: usize,
    pub categorized: usize,
    pub unmatched: usize,
    pub failed: usize,
}

/// Build the match table from every stored keyphrase.
///
/// # Errors
///
/// Propagates store errors.
pub async fn load_match_table<S: CatalogStore>(
    store: &S,
    normalizer: &Normalizer,
) -> CatalogResult<MatchTable> {
    let pairs = store.list_keyphrases().await?;
    Ok(MatchTable::new(pairs, normalizer))
}

/// Assign a category to every articul that has none, using the names of the
/// products recorded under it. An articul that already has a category is
/// never touched.
///
/// # Errors
///
/// Aborts with `Unavailable` when the store goes away. Other per-articul
/// failures are logged and counted.
pub async fn categorize_uncategorized<S: CatalogStore>(
    store: &S,
    table: &MatchTable,
    normalizer: &Normalizer,
    cancel: &CancellationToken,
) -> CatalogResult<CategorizeSummary> {
    let mut summary = CategorizeSummary::default();
    if table.is_empty() {
        tracing::warn!("no keyphrases loaded, skipping categorization");
        return Ok(summary);
    }

    let pending = store.list_uncategorized_articuls().await?;
    for key in &pending {
        if cancel.is_cancelled() {
            tracing::info!(examined = summary.examined, "categorization cancelled");
            break;
        }
        summary.examined += 1;

        match categorize_one(store, table, normalizer, key).await {
            Ok(true) => summary.categorized += 1,
            Ok(false) => summary.unmatched += 1,
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(articul = %key, error = %e, "failed to categorize articul");
            }
        }
    }

    tracing::info!(
        examined = summary.examined,
        categorized = summary.categorized,
        unmatched = summary.unmatched,
        failed = summary.failed,
        "categorization finished"
    );
    Ok(summary)
}

async fn categorize_one<S: CatalogStore>(
    store: &S,
    table: &MatchTable,
    normalizer: &Normalizer,
    key: &ArticulKey,
) -> CatalogResult<bool> {
    let names = store.product_names_for_articul(key).await?;
    let Some(hit) = table.classify(&names, normalizer) else {
        tracing::debug!(articul = %key, "no keyphrase matched");
        return Ok(false);
    };
    let changed = store.set_articul_category(key, hit.category_id).await?;
    if changed {
        tracing::debug!(
            articul = %key,
            category_id = hit.category_id,
            keyphrase = %hit.phrase,
            "categorized articul"
        );
    }
    Ok(changed)
}

/// Clear the category of one articul so the next categorization pass can
/// assign it again. `articul_raw` is normalized the same way rows are; it must
/// name the stored (primary) articul, not an alias.
///
/// # Errors
///
/// `NotFound` when the brand or articul is unknown.
pub async fn uncategorize<S: CatalogStore>(
    store: &S,
    normalizer: &Normalizer,
    brand_raw: &str,
    articul_raw: &str,
) -> CatalogResult<bool> {
    let brand_key = normalizer.key(brand_raw);
    let alias = if brand_key.is_empty() {
        NO_BRAND.to_string()
    } else {
        brand_key
    };
    let brand_id = store
        .find_brand_by_alias(&alias)
        .await?
        .ok_or_else(|| CatalogError::not_found("brand", brand_raw.trim()))?;

    let articul = normalizer.key(articul_raw);
    if articul.is_empty() {
        return Err(CatalogError::malformed("articul", articul_raw));
    }
    let key = ArticulKey::new(articul, brand_id);
    let cleared = store.clear_articul_category(&key).await?;
    tracing::info!(articul = %key, cleared, "uncategorized articul");
    Ok(cleared)
}

#[cfg(test)]
mod tests {
    use pricecat_core::{content_hash, MemoryStore, NewProduct};

    use super::*;

    async fn add_product(store: &MemoryStore, articul: &str, name: &str) -> ArticulKey {
        let key = ArticulKey::new(articul, 1);
        store.upsert_articul(&key, &[]).await.unwrap();
        store
            .insert_product(&NewProduct {
                hash: content_hash(1, articul, &name.to_lowercase()),
                supplier_id: 1,
                brand_id: 1,
                articul: articul.into(),
                name: name.into(),
                partnum: String::new(),
                quantity: 0,
            })
            .await
            .unwrap();
        key
    }

    async fn seeded_store() -> (MemoryStore, i64, i64) {
        let store = MemoryStore::new();
        let discs = store
            .insert_category("Тормозные диски", "тормозные диски")
            .await
            .unwrap();
        let wheels = store
            .insert_category("Диски колесные", "диски колесные")
            .await
            .unwrap();
        store.insert_keyphrase(discs, "тормозной диск").await.unwrap();
        store.insert_keyphrase(wheels, "диск").await.unwrap();
        (store, discs, wheels)
    }

    #[tokio::test]
    async fn longest_keyphrase_wins() {
        let (store, discs, _) = seeded_store().await;
        let n = Normalizer::new();
        let key = add_product(&store, "df4000", "Диск тормозной передний (TRW)").await;

        let table = load_match_table(&store, &n).await.unwrap();
        let summary = categorize_uncategorized(&store, &table, &n, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.categorized, 1);
        let record = store.get_articul(&key).await.unwrap().unwrap();
        assert_eq!(record.category_id, Some(discs));
    }

    #[tokio::test]
    async fn unmatched_articul_stays_uncategorized() {
        let (store, _, _) = seeded_store().await;
        let n = Normalizer::new();
        let key = add_product(&store, "w712", "Фильтр масляный").await;

        let table = load_match_table(&store, &n).await.unwrap();
        let summary = categorize_uncategorized(&store, &table, &n, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.unmatched, 1);
        assert!(store.get_articul(&key).await.unwrap().unwrap().category_id.is_none());
    }

    #[tokio::test]
    async fn existing_category_is_not_overwritten() {
        let (store, discs, wheels) = seeded_store().await;
        let n = Normalizer::new();
        let key = add_product(&store, "df4000", "Диск тормозной").await;
        store.set_articul_category(&key, wheels).await.unwrap();

        let table = load_match_table(&store, &n).await.unwrap();
        let summary = categorize_uncategorized(&store, &table, &n, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.examined, 0);
        let record = store.get_articul(&key).await.unwrap().unwrap();
        assert_eq!(record.category_id, Some(wheels));
        assert_ne!(record.category_id, Some(discs));
    }

    #[tokio::test]
    async fn uncategorize_allows_reassignment() {
        let (store, discs, wheels) = seeded_store().await;
        let n = Normalizer::new();
        let key = add_product(&store, "df4000", "Диск тормозной").await;
        store.set_articul_category(&key, wheels).await.unwrap();

        assert!(uncategorize(&store, &n, "", "DF-4000").await.unwrap());

        let table = load_match_table(&store, &n).await.unwrap();
        categorize_uncategorized(&store, &table, &n, &CancellationToken::new())
            .await
            .unwrap();
        let record = store.get_articul(&key).await.unwrap().unwrap();
        assert_eq!(record.category_id, Some(discs));
    }

    #[tokio::test]
    async fn uncategorize_unknown_brand_is_not_found() {
        let store = MemoryStore::new();
        let n = Normalizer::new();
        let err = uncategorize(&store, &n, "Nobody", "x1").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "brand", .. }));
    }
}
