//! Loading curated reference data into the store.
//!
//! Seeding is additive and idempotent: running it twice leaves the store
//! unchanged, and rows that collide with existing data are counted rather
//! than treated as failures.

use std::collections::HashMap;

use pricecat_core::{
    AliasRow, AliasTable, AliasTableBuilder, BrandsFile, CatalogError, CatalogResult,
    CatalogStore, CategoryRow, Normalizer,
};

use crate::brand::resolve_brand;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedCounts {
    pub added: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CategorySeedCounts {
    pub categories: SeedCounts,
    pub keyphrases: SeedCounts,
}

/// Insert every curated brand with its aliases.
///
/// A brand whose alias already belongs to a stored brand is merged into it:
/// its remaining aliases are attached to the existing brand. Aliases owned by
/// some third brand are logged and left alone.
///
/// # Errors
///
/// Propagates store errors other than `Duplicate`.
pub async fn seed_brands<S: CatalogStore>(
    store: &S,
    normalizer: &Normalizer,
    file: &BrandsFile,
) -> CatalogResult<SeedCounts> {
    let mut counts = SeedCounts::default();

    for brand in &file.brands {
        let keys = brand.alias_keys(normalizer);
        if keys.is_empty() {
            tracing::warn!(brand = %brand.name, "brand has no usable alias, skipping");
            counts.skipped += 1;
            continue;
        }

        let mut owner = None;
        for key in &keys {
            if let Some(id) = store.find_brand_by_alias(key).await? {
                owner = Some(id);
                break;
            }
        }

        let Some(brand_id) = owner else {
            let id = store.insert_brand(brand.name.trim(), &keys).await?;
            tracing::debug!(brand = %brand.name, brand_id = id, aliases = keys.len(), "seeded brand");
            counts.added += 1;
            continue;
        };

        counts.duplicates += 1;
        for key in &keys {
            match store.add_brand_alias(brand_id, key).await {
                Ok(()) => {}
                Err(CatalogError::Duplicate { .. }) => {
                    tracing::warn!(
                        brand = %brand.name,
                        alias = %key,
                        "alias belongs to another brand, not reassigned"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    tracing::info!(
        added = counts.added,
        duplicates = counts.duplicates,
        skipped = counts.skipped,
        "seeded brands"
    );
    Ok(counts)
}

/// Insert categories and their keyphrases. A keyphrase already assigned to
/// any category is skipped, so the first category to claim it keeps it.
///
/// # Errors
///
/// Propagates store errors other than `Duplicate`.
pub async fn seed_categories<S: CatalogStore>(
    store: &S,
    normalizer: &Normalizer,
    rows: &[CategoryRow],
) -> CatalogResult<CategorySeedCounts> {
    let mut counts = CategorySeedCounts::default();

    for row in rows {
        let name = normalizer.name(&row.name);
        let norm = normalizer.key(&row.name);
        if norm.is_empty() || row.keyphrases.is_empty() {
            tracing::warn!(category = %row.name, "category row has no name or keyphrases, skipping");
            counts.categories.skipped += 1;
            continue;
        }

        let category_id = match store.insert_category(&name, &norm).await {
            Ok(id) => {
                counts.categories.added += 1;
                id
            }
            Err(e) if e.is_duplicate() => {
                counts.categories.duplicates += 1;
                store
                    .find_category_by_norm(&norm)
                    .await?
                    .ok_or_else(|| CatalogError::not_found("category", norm.clone()))?
            }
            Err(e) => return Err(e),
        };

        for raw in &row.keyphrases {
            let phrase = normalizer.phrase(raw);
            if phrase.is_empty() {
                counts.keyphrases.skipped += 1;
                continue;
            }
            match store.insert_keyphrase(category_id, &phrase).await {
                Ok(()) => counts.keyphrases.added += 1,
                Err(e) if e.is_duplicate() => counts.keyphrases.duplicates += 1,
                Err(e) => return Err(e),
            }
        }
    }

    tracing::info!(
        categories = counts.categories.added,
        keyphrases = counts.keyphrases.added,
        duplicate_keyphrases = counts.keyphrases.duplicates,
        "seeded categories"
    );
    Ok(counts)
}

/// Build the alias table from reference rows, resolving each row's brand
/// (and creating unknown brands the same way price rows do).
///
/// # Errors
///
/// Propagates store errors from brand resolution.
pub async fn load_alias_table<S: CatalogStore>(
    store: &S,
    normalizer: &Normalizer,
    rows: &[AliasRow],
) -> CatalogResult<AliasTable> {
    let mut brands: HashMap<String, i64> = HashMap::new();
    let mut builder = AliasTableBuilder::new();

    for row in rows {
        let brand_key = normalizer.key(&row.brand);
        let brand_id = match brands.get(&brand_key) {
            Some(&id) => id,
            None => {
                let id = resolve_brand(store, normalizer, &row.brand).await?;
                brands.insert(brand_key, id);
                id
            }
        };
        builder.add(
            brand_id,
            &normalizer.key(&row.primary),
            &normalizer.key(&row.alternate),
        );
    }

    let table = builder.build();
    tracing::info!(groups = table.groups().len(), rows = rows.len(), "loaded articul aliases");
    Ok(table)
}
