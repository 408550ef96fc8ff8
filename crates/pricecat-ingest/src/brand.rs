use pricecat_core::{CatalogError, CatalogResult, CatalogStore, Normalizer, NO_BRAND};

/// Map a raw brand field to a brand id, creating the brand on first sight.
///
/// An empty normalized value resolves to the reserved brand. A new brand is
/// named after the trimmed raw value and owns the normalized value as its
/// only alias. Concurrent creation of the same alias is settled by the
/// store's uniqueness constraint: the loser re-reads the winner's id.
///
/// # Errors
///
/// Propagates store errors other than the recovered `Duplicate`.
pub async fn resolve_brand<S: CatalogStore>(
    store: &S,
    normalizer: &Normalizer,
    raw: &str,
) -> CatalogResult<i64> {
    let key = normalizer.key(raw);
    let (alias, name) = if key.is_empty() {
        (NO_BRAND.to_string(), NO_BRAND)
    } else {
        (key, raw.trim())
    };

    if let Some(id) = store.find_brand_by_alias(&alias).await? {
        return Ok(id);
    }

    match store
        .insert_brand(name, std::slice::from_ref(&alias))
        .await
    {
        Ok(id) => {
            tracing::info!(brand = %name, alias = %alias, brand_id = id, "created brand");
            Ok(id)
        }
        Err(e) if e.is_duplicate() => store
            .find_brand_by_alias(&alias)
            .await?
            .ok_or_else(|| CatalogError::not_found("brand alias", alias)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use pricecat_core::MemoryStore;

    use super::*;
    use crate::testing::RacingStore;

    #[tokio::test]
    async fn same_raw_brand_resolves_to_one_brand() {
        let store = MemoryStore::new();
        let n = Normalizer::new();
        let first = resolve_brand(&store, &n, "Mann-Filter").await.unwrap();
        let second = resolve_brand(&store, &n, "  MANN filter ").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.counts().brands, 2);

        let brand = store.get_brand(first).await.unwrap().unwrap();
        assert_eq!(brand.name, "Mann-Filter");
        assert_eq!(brand.aliases, vec!["mannfilter"]);
    }

    #[tokio::test]
    async fn empty_brand_resolves_to_reserved() {
        let store = MemoryStore::new();
        let n = Normalizer::new();
        let reserved = store.find_brand_by_alias(NO_BRAND).await.unwrap().unwrap();
        assert_eq!(resolve_brand(&store, &n, "").await.unwrap(), reserved);
        assert_eq!(resolve_brand(&store, &n, " -- ").await.unwrap(), reserved);
        assert_eq!(store.counts().brands, 1);
    }

    #[tokio::test]
    async fn lost_insert_race_adopts_the_winning_brand() {
        let store = RacingStore::new("TRW Automotive");
        let n = Normalizer::new();

        let id = resolve_brand(&store, &n, "TRW").await.unwrap();

        assert_eq!(store.find_brand_by_alias("trw").await.unwrap(), Some(id));
        assert_eq!(store.get_brand(id).await.unwrap().unwrap().name, "TRW Automotive");
        assert_eq!(store.inner.counts().brands, 2);
        assert_eq!(resolve_brand(&store, &n, "trw").await.unwrap(), id);
    }

    #[tokio::test]
    async fn known_alias_resolves_to_curated_brand() {
        let store = MemoryStore::new();
        let n = Normalizer::new();
        let bosch = store
            .insert_brand("Bosch", &["bosch".into(), "бош".into()])
            .await
            .unwrap();
        assert_eq!(resolve_brand(&store, &n, "БОШ").await.unwrap(), bosch);
    }
}
