//! Supplier format descriptors and filename dispatch.
//!
//! Each supplier publishes a price list with its own layout. A
//! [`SupplierDescriptor`] records that layout; a [`SupplierTable`] picks the
//! descriptor for an incoming file by its name, trying the most specific
//! pattern first.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Case-insensitive filename rule. A file matches when its name starts with
/// `prefix` and ends with `suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenamePattern {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
}

impl FilenamePattern {
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        let name = file_name.to_lowercase();
        let prefix = self.prefix.to_lowercase();
        let suffix = self.suffix.to_lowercase();
        name.len() >= prefix.len() + suffix.len()
            && name.starts_with(&prefix)
            && name.ends_with(&suffix)
    }

    /// Longer patterns are more specific and are tried first.
    #[must_use]
    pub fn specificity(&self) -> usize {
        self.prefix.chars().count() + self.suffix.chars().count()
    }

    fn is_empty(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty()
    }
}

/// One column index, or several whose values are joined with spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NameColumns {
    One(usize),
    Many(Vec<usize>),
}

impl NameColumns {
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        match self {
            NameColumns::One(idx) => std::slice::from_ref(idx),
            NameColumns::Many(list) => list,
        }
    }
}

/// Zero-based column indices for each field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub brand: usize,
    pub articul: usize,
    pub name: NameColumns,
    #[serde(default)]
    pub partnum: Option<usize>,
    pub price: usize,
    /// Absent means every row has quantity 0.
    #[serde(default)]
    pub quantity: Option<usize>,
    pub rest: usize,
}

impl ColumnMap {
    /// Highest column index referenced, so short rows can be rejected early.
    #[must_use]
    pub fn max_index(&self) -> usize {
        self.name
            .indices()
            .iter()
            .copied()
            .chain([self.brand, self.articul, self.price, self.rest])
            .chain(self.partnum)
            .chain(self.quantity)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierDescriptor {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub filename: FilenamePattern,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_true")]
    pub quoted: bool,
    /// Rows skipped before the first data row.
    #[serde(default = "default_header_rows")]
    pub header_rows: usize,
    pub columns: ColumnMap,
    #[serde(default)]
    pub charset: Option<String>,
}

fn default_delimiter() -> String {
    ";".to_string()
}

fn default_true() -> bool {
    true
}

fn default_header_rows() -> usize {
    1
}

impl SupplierDescriptor {
    /// The delimiter as a byte. Validated to be a single ASCII byte on load.
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b';')
    }

    /// `true` when the file is declared (or assumed) to be UTF-8.
    #[must_use]
    pub fn declares_utf8(&self) -> bool {
        self.charset.as_deref().is_none_or(|c| {
            let c = c.trim().to_ascii_lowercase();
            c.is_empty() || c == "utf-8" || c == "utf8"
        })
    }
}

#[derive(Debug, Deserialize)]
struct SuppliersFile {
    suppliers: Vec<SupplierDescriptor>,
}

/// Descriptors ordered by filename specificity, most specific first. Ties
/// keep file order.
#[derive(Debug, Clone, Default)]
pub struct SupplierTable {
    descriptors: Vec<SupplierDescriptor>,
}

impl SupplierTable {
    /// Validate and order descriptors.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` for an empty name, a duplicate name,
    /// an empty or duplicate filename pattern, a delimiter that is not one
    /// ASCII byte, or an empty name column list.
    pub fn new(mut descriptors: Vec<SupplierDescriptor>) -> Result<Self, ConfigError> {
        validate_suppliers(&descriptors)?;
        descriptors.sort_by_key(|d| std::cmp::Reverse(d.filename.specificity()));
        Ok(Self { descriptors })
    }

    /// The descriptor whose pattern matches `file_name`, most specific first.
    #[must_use]
    pub fn match_file(&self, file_name: &str) -> Option<&SupplierDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.filename.matches(file_name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SupplierDescriptor> {
        self.descriptors.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Load and validate supplier descriptors from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_suppliers(path: &Path) -> Result<SupplierTable, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReferenceFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: SuppliersFile =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ReferenceFileYaml {
            path: path.display().to_string(),
            source: e,
        })?;

    SupplierTable::new(file.suppliers)
}

fn validate_suppliers(descriptors: &[SupplierDescriptor]) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_patterns = HashSet::new();

    for d in descriptors {
        if d.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "supplier name must be non-empty".to_string(),
            ));
        }
        if !seen_names.insert(d.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate supplier name: '{}'",
                d.name
            )));
        }
        if d.filename.is_empty() {
            return Err(ConfigError::Validation(format!(
                "supplier '{}' needs a filename prefix or suffix",
                d.name
            )));
        }
        let pattern = (
            d.filename.prefix.to_lowercase(),
            d.filename.suffix.to_lowercase(),
        );
        if !seen_patterns.insert(pattern) {
            return Err(ConfigError::Validation(format!(
                "supplier '{}' repeats the filename pattern of another supplier",
                d.name
            )));
        }
        if d.delimiter.len() != 1 || !d.delimiter.is_ascii() {
            return Err(ConfigError::Validation(format!(
                "supplier '{}' has delimiter {:?}; must be a single ASCII character",
                d.name, d.delimiter
            )));
        }
        if d.columns.name.indices().is_empty() {
            return Err(ConfigError::Validation(format!(
                "supplier '{}' has no name columns",
                d.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str, prefix: &str, suffix: &str) -> SupplierDescriptor {
        SupplierDescriptor {
            name: name.to_string(),
            email: None,
            filename: FilenamePattern {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            },
            delimiter: ";".to_string(),
            quoted: true,
            header_rows: 1,
            columns: ColumnMap {
                brand: 0,
                articul: 1,
                name: NameColumns::One(2),
                partnum: None,
                price: 3,
                quantity: None,
                rest: 4,
            },
            charset: None,
        }
    }

    #[test]
    fn pattern_matches_case_insensitively() {
        let p = FilenamePattern {
            prefix: "Autodoc_".into(),
            suffix: ".CSV".into(),
        };
        assert!(p.matches("AUTODOC_2024-05-01.csv"));
        assert!(!p.matches("autodoc.xls"));
    }

    #[test]
    fn pattern_prefix_and_suffix_must_not_overlap() {
        let p = FilenamePattern {
            prefix: "ab".into(),
            suffix: "bc".into(),
        };
        assert!(!p.matches("abc"));
        assert!(p.matches("abbc"));
    }

    #[test]
    fn most_specific_pattern_wins() {
        let table = SupplierTable::new(vec![
            descriptor("generic", "parts", ""),
            descriptor("specific", "parts_msk", ".csv"),
        ])
        .unwrap();
        assert_eq!(table.match_file("parts_msk_01.csv").unwrap().name, "specific");
        assert_eq!(table.match_file("parts_spb.csv").unwrap().name, "generic");
        assert!(table.match_file("other.csv").is_none());
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = SupplierTable::new(vec![
            descriptor("Alpha", "a", ""),
            descriptor("alpha", "b", ""),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate supplier name"));
    }

    #[test]
    fn rejects_duplicate_patterns() {
        let err = SupplierTable::new(vec![
            descriptor("one", "Parts", ".csv"),
            descriptor("two", "parts", ".CSV"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("repeats the filename pattern"));
    }

    #[test]
    fn rejects_empty_pattern() {
        let err = SupplierTable::new(vec![descriptor("one", "", "")]).unwrap_err();
        assert!(err.to_string().contains("prefix or suffix"));
    }

    #[test]
    fn rejects_multibyte_delimiter() {
        let mut d = descriptor("one", "x", "");
        d.delimiter = "||".into();
        let err = SupplierTable::new(vec![d]).unwrap_err();
        assert!(err.to_string().contains("single ASCII character"));
    }

    #[test]
    fn max_index_covers_optional_columns() {
        let mut d = descriptor("one", "x", "");
        assert_eq!(d.columns.max_index(), 4);
        d.columns.quantity = Some(9);
        d.columns.name = NameColumns::Many(vec![2, 11]);
        assert_eq!(d.columns.max_index(), 11);
    }

    #[test]
    fn charset_defaults_to_utf8() {
        let mut d = descriptor("one", "x", "");
        assert!(d.declares_utf8());
        d.charset = Some("UTF-8".into());
        assert!(d.declares_utf8());
        d.charset = Some("windows-1251".into());
        assert!(!d.declares_utf8());
    }

    #[test]
    fn yaml_defaults_and_name_list_deserialize() {
        let yaml = r"
suppliers:
  - name: Autoparts
    filename: { prefix: autoparts }
    columns: { brand: 0, articul: 1, name: [2, 3], price: 4, rest: 5 }
";
        let file: SuppliersFile = serde_yaml::from_str(yaml).unwrap();
        let d = &file.suppliers[0];
        assert_eq!(d.delimiter_byte(), b';');
        assert!(d.quoted);
        assert_eq!(d.header_rows, 1);
        assert_eq!(d.columns.name.indices(), &[2, 3]);
        assert_eq!(d.filename.suffix, "");
    }

    #[test]
    fn load_suppliers_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("suppliers.yaml");
        let result = load_suppliers(&path);
        assert!(result.is_ok(), "failed to load suppliers.yaml: {result:?}");
        assert!(!result.unwrap().is_empty());
    }
}
