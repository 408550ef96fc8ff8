//! Identity resolution, price versioning, and categorization over a
//! [`CatalogStore`](pricecat_core::CatalogStore).
//!
//! Every operation is generic over the store, so the same code runs against
//! Postgres in production and [`MemoryStore`](pricecat_core::MemoryStore) in
//! tests and dry runs.

pub mod batch;
pub mod brand;
pub mod categorize;
pub mod dedup;
pub mod lock;
pub mod parse;
pub mod pricing;
pub mod reader;
pub mod seed;

#[cfg(test)]
mod testing;

pub use batch::{run_batch, BatchError, BatchReport, BatchSettings, IngestContext};
pub use brand::resolve_brand;
pub use categorize::{
    categorize_uncategorized, load_match_table, uncategorize, CategorizeSummary,
};
pub use dedup::{get_or_create, ProductInput};
pub use lock::{acquire_with_retry, DirLock, LOCK_FILE_NAME};
pub use pricing::{apply_price, mark_out_of_stock, StaleSweep};
pub use reader::{PriceFileReader, RawRow, RowError};
pub use seed::{load_alias_table, seed_brands, seed_categories, CategorySeedCounts, SeedCounts};
