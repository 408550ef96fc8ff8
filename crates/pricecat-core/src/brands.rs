use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::normalize::Normalizer;
use crate::ConfigError;

/// Alias of the reserved brand that owns rows with an empty or unusable
/// brand field. Upper-case with an underscore, so no normalized key can
/// ever equal it.
pub const NO_BRAND: &str = "NO_BRAND";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    pub name: String,
    /// Spellings suppliers use for this brand. Empty means the brand is only
    /// known by its own name.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl BrandConfig {
    /// Normalized alias keys for this brand, de-duplicated, in file order.
    /// The brand's own name is always included.
    #[must_use]
    pub fn alias_keys(&self, normalizer: &Normalizer) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(self.aliases.len() + 1);
        for raw in std::iter::once(&self.name).chain(&self.aliases) {
            let key = normalizer.key(raw);
            if !key.is_empty() && !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

#[derive(Debug, Deserialize)]
pub struct BrandsFile {
    pub brands: Vec<BrandConfig>,
}

/// Load and validate the curated brands file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_brands(path: &Path) -> Result<BrandsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReferenceFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let brands_file: BrandsFile =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ReferenceFileYaml {
            path: path.display().to_string(),
            source: e,
        })?;

    validate_brands(&brands_file, &Normalizer::new())?;

    Ok(brands_file)
}

fn validate_brands(brands_file: &BrandsFile, normalizer: &Normalizer) -> Result<(), ConfigError> {
    // alias key -> brand name that claimed it first
    let mut owners: HashMap<String, &str> = HashMap::new();

    for brand in &brands_file.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }

        if brand.name.trim() == NO_BRAND {
            return Err(ConfigError::Validation(format!(
                "brand name '{NO_BRAND}' is reserved"
            )));
        }

        let keys = brand.alias_keys(normalizer);
        if keys.is_empty() {
            return Err(ConfigError::Validation(format!(
                "brand '{}' has no alias with letters or digits",
                brand.name
            )));
        }

        for key in keys {
            if let Some(owner) = owners.insert(key.clone(), &brand.name) {
                return Err(ConfigError::Validation(format!(
                    "alias '{key}' is claimed by both '{owner}' and '{}'",
                    brand.name
                )));
            }
        }
    }

    Ok(())
}
