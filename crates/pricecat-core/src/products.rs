use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Identity of an article number: the normalized articul scoped by brand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArticulKey {
    pub articul: String,
    pub brand_id: i64,
}

impl ArticulKey {
    #[must_use]
    pub fn new(articul: impl Into<String>, brand_id: i64) -> Self {
        Self {
            articul: articul.into(),
            brand_id,
        }
    }
}

impl std::fmt::Display for ArticulKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.articul, self.brand_id)
    }
}

/// 128-bit content identity of a product, as 32 lower-case hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps a hash read back from storage.
    #[must_use]
    pub fn from_stored(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash of the fields that define a product.
///
/// Fields are length-prefixed before hashing so `("ab", "c")` and
/// `("a", "bc")` never share a digest. `name_key` must already be the
/// case-folded, whitespace-collapsed name.
#[must_use]
pub fn content_hash(brand_id: i64, articul: &str, name_key: &str) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(brand_id.to_le_bytes());
    for field in [articul, name_key] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    let digest = hasher.finalize();
    ContentHash(digest[..16].iter().map(|b| format!("{b:02x}")).collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub hash: ContentHash,
    pub supplier_id: i64,
    pub brand_id: i64,
    pub articul: String,
    /// Display name: trimmed with whitespace collapsed, case preserved.
    pub name: String,
    pub partnum: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecord {
    pub id: i64,
    pub hash: ContentHash,
    pub supplier_id: i64,
    pub brand_id: i64,
    pub articul: String,
    pub name: String,
    pub partnum: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandRecord {
    pub id: i64,
    pub name: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticulRecord {
    pub key: ArticulKey,
    /// Sorted, de-duplicated alias articuls. Never contains the key itself.
    pub aliases: Vec<String>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceActual {
    pub product_id: i64,
    pub upload_id: i64,
    pub price: Decimal,
    pub rest: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceHistoryEntry {
    pub id: i64,
    pub product_id: i64,
    pub upload_id: i64,
    pub price: Decimal,
    pub rest: i32,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one source file within an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Rows were read; some may have been skipped.
    Processed,
    /// No supplier descriptor matched the file name.
    Unrecognized,
    /// The file could not be opened or its header was unreadable.
    Failed,
}

impl FileStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FileStatus::Processed => "processed",
            FileStatus::Unrecognized => "unrecognized",
            FileStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processed" => Some(FileStatus::Processed),
            "unrecognized" => Some(FileStatus::Unrecognized),
            "failed" => Some(FileStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFileSummary {
    pub file_name: String,
    pub supplier_id: Option<i64>,
    pub status: FileStatus,
    pub rows_total: i64,
    pub rows_applied: i64,
    pub error_message: Option<String>,
}

impl std::fmt::Display for UploadFileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} from {}",
            self.rows_applied, self.rows_total, self.file_name
        )?;
        if let Some(message) = &self.error_message {
            write!(f, " ({}: {message})", self.status)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_32_lowercase_hex_chars() {
        let h = content_hash(1, "ab12", "filter oil");
        assert_eq!(h.as_str().len(), 32);
        assert!(h
            .as_str()
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(
            content_hash(42, "ab12", "filter oil"),
            content_hash(42, "ab12", "filter oil")
        );
    }

    #[test]
    fn content_hash_depends_on_every_field() {
        let base = content_hash(1, "ab12", "filter oil");
        assert_ne!(base, content_hash(2, "ab12", "filter oil"));
        assert_ne!(base, content_hash(1, "ab13", "filter oil"));
        assert_ne!(base, content_hash(1, "ab12", "filter air"));
    }

    #[test]
    fn content_hash_separates_field_boundaries() {
        assert_ne!(content_hash(1, "ab", "c"), content_hash(1, "a", "bc"));
    }

    #[test]
    fn file_status_round_trips_through_text() {
        for status in [
            FileStatus::Processed,
            FileStatus::Unrecognized,
            FileStatus::Failed,
        ] {
            assert_eq!(FileStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FileStatus::parse("bogus"), None);
    }

    #[test]
    fn summary_line_reports_applied_of_total() {
        let summary = UploadFileSummary {
            file_name: "autoparts_2024.csv".into(),
            supplier_id: Some(3),
            status: FileStatus::Processed,
            rows_total: 120,
            rows_applied: 117,
            error_message: None,
        };
        assert_eq!(summary.to_string(), "117 of 120 from autoparts_2024.csv");
    }

    #[test]
    fn summary_line_includes_failure_reason() {
        let summary = UploadFileSummary {
            file_name: "mystery.csv".into(),
            supplier_id: None,
            status: FileStatus::Unrecognized,
            rows_total: 0,
            rows_applied: 0,
            error_message: Some("no supplier matches".into()),
        };
        assert_eq!(
            summary.to_string(),
            "0 of 0 from mystery.csv (unrecognized: no supplier matches)"
        );
    }
}
