//! Reference data loading shared by `db seed`, `ingest`, and `watch`.

use pricecat_core::{
    load_alias_rows, load_brands, load_categories, load_suppliers, AppConfig, CatalogStore,
    Normalizer,
};
use pricecat_ingest::{
    load_alias_table, seed_brands, seed_categories, CategorySeedCounts, IngestContext, SeedCounts,
};

#[derive(Debug, Default)]
pub(crate) struct SeedSummary {
    pub brands: SeedCounts,
    pub categories: CategorySeedCounts,
    pub suppliers: usize,
}

impl std::fmt::Display for SeedSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "brands: {} added, {} already known, {} skipped",
            self.brands.added, self.brands.duplicates, self.brands.skipped
        )?;
        writeln!(
            f,
            "categories: {} added, {} already known, {} skipped",
            self.categories.categories.added,
            self.categories.categories.duplicates,
            self.categories.categories.skipped
        )?;
        writeln!(
            f,
            "keyphrases: {} added, {} already assigned",
            self.categories.keyphrases.added, self.categories.keyphrases.duplicates
        )?;
        write!(f, "suppliers: {} registered", self.suppliers)
    }
}

/// Seed curated brands, categories with keyphrases, and supplier rows.
pub(crate) async fn seed_reference<S: CatalogStore>(
    store: &S,
    config: &AppConfig,
) -> anyhow::Result<SeedSummary> {
    let normalizer = Normalizer::new();

    let brands_file = load_brands(&config.brands_path)?;
    let brands = seed_brands(store, &normalizer, &brands_file).await?;

    let category_rows = load_categories(&config.categories_path)?;
    let categories = seed_categories(store, &normalizer, &category_rows).await?;

    let suppliers = load_suppliers(&config.suppliers_path)?;
    for descriptor in suppliers.iter() {
        store
            .upsert_supplier(&descriptor.name, descriptor.email.as_deref())
            .await?;
    }

    Ok(SeedSummary {
        brands,
        categories,
        suppliers: suppliers.len(),
    })
}

/// Supplier table and alias groups for one batch. Alias rows naming an
/// unknown brand create it.
pub(crate) async fn load_context<S: CatalogStore>(
    store: &S,
    config: &AppConfig,
) -> anyhow::Result<IngestContext> {
    let normalizer = Normalizer::new();
    let suppliers = load_suppliers(&config.suppliers_path)?;
    let alias_rows = load_alias_rows(&config.aliases_path)?;
    let aliases = load_alias_table(store, &normalizer, &alias_rows).await?;
    Ok(IngestContext {
        normalizer,
        suppliers,
        aliases,
    })
}
