//! Domain model for the supplier price-list catalog.
//!
//! Everything here is free of database and network I/O: canonical key
//! normalization, articul alias groups, keyphrase matching, supplier
//! descriptors, content hashing, and the [`CatalogStore`] contract that
//! persistence backends implement.

pub mod aliases;
mod app_config;
pub mod brands;
pub mod categories;
mod config;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod products;
pub mod store;
pub mod suppliers;

use thiserror::Error;

pub use aliases::{load_alias_rows, AliasGroup, AliasRow, AliasTable, AliasTableBuilder};
pub use app_config::{AppConfig, Environment};
pub use brands::{load_brands, BrandConfig, BrandsFile, NO_BRAND};
pub use categories::{load_categories, CategoryRow, Keyphrase, MatchTable};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{CatalogError, CatalogResult};
pub use memory::{MemoryCounts, MemoryStore};
pub use normalize::Normalizer;
pub use products::{
    content_hash, ArticulKey, ArticulRecord, BrandRecord, ContentHash, FileStatus, NewProduct,
    PriceActual, PriceHistoryEntry, ProductRecord, UploadFileSummary, UploadRecord,
};
pub use store::{canonical_alias_set, CatalogStore};
pub use suppliers::{
    load_suppliers, ColumnMap, FilenamePattern, NameColumns, SupplierDescriptor, SupplierTable,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read reference file {path}: {source}")]
    ReferenceFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML reference file {path}: {source}")]
    ReferenceFileYaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to parse CSV reference file {path}: {source}")]
    ReferenceFileCsv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("validation error: {0}")]
    Validation(String),
}
