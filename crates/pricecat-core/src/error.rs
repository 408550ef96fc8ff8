//! Error taxonomy shared by every catalog operation.
//!
//! `Duplicate` and `NotFound` are expected outcomes that callers recover
//! from locally (fallback lookup, creation, or skip). `Malformed` and
//! `Unrecognized` cause a row or file to be skipped. `Unavailable` is the
//! only variant that aborts a batch.

use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// A unique constraint rejected the write.
    #[error("duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A field value could not be interpreted.
    #[error("malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },

    /// No supplier descriptor, category, or charset matches the input.
    #[error("unrecognized {0}")]
    Unrecognized(String),

    /// Lock contention or an unreachable store. Retryable.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Two different identities produced the same content hash.
    #[error("content hash {hash} already belongs to a different product (id {existing_id})")]
    HashCollision { hash: String, existing_id: i64 },

    /// Any other rejection from the storage backend.
    #[error("store error: {0}")]
    Store(String),
}

impl CatalogError {
    #[must_use]
    pub fn duplicate(entity: &'static str, key: impl Into<String>) -> Self {
        Self::Duplicate {
            entity,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn malformed(field: &'static str, value: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Returns `true` when the error should abort the current batch rather
    /// than skip a single row.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
