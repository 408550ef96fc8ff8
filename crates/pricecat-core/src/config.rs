use std::path::PathBuf;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        parse_flag(&or_default(var, default)).ok_or_else(|| {
            invalid(
                var,
                "expected one of true/false/1/0/yes/no/on/off".to_string(),
            )
        })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("PRICECAT_ENV", "development"));
    let log_level = or_default("PRICECAT_LOG_LEVEL", "info");

    let source_dir = PathBuf::from(or_default("PRICECAT_SOURCE_DIR", "./data/prices"));
    let suppliers_path = PathBuf::from(or_default(
        "PRICECAT_SUPPLIERS_PATH",
        "./config/suppliers.yaml",
    ));
    let brands_path = PathBuf::from(or_default("PRICECAT_BRANDS_PATH", "./config/brands.yaml"));
    let categories_path = PathBuf::from(or_default(
        "PRICECAT_CATEGORIES_PATH",
        "./config/categories.csv",
    ));
    let aliases_path = PathBuf::from(or_default(
        "PRICECAT_ALIASES_PATH",
        "./config/articul_aliases.csv",
    ));

    let db_max_connections = parse_u32("PRICECAT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("PRICECAT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("PRICECAT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let lock_max_attempts = parse_u32("PRICECAT_LOCK_MAX_ATTEMPTS", "3")?;
    if lock_max_attempts == 0 {
        return Err(invalid(
            "PRICECAT_LOCK_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let lock_backoff_secs = parse_u64("PRICECAT_LOCK_BACKOFF_SECS", "5")?;
    let interval_secs = parse_u64("PRICECAT_INTERVAL_SECS", "900")?;
    if interval_secs == 0 {
        return Err(invalid(
            "PRICECAT_INTERVAL_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let remove_processed = parse_bool("PRICECAT_REMOVE_PROCESSED", "false")?;
    let categorize_after_ingest = parse_bool("PRICECAT_CATEGORIZE_AFTER_INGEST", "true")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        source_dir,
        suppliers_path,
        brands_path,
        categories_path,
        aliases_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        lock_max_attempts,
        lock_backoff_secs,
        interval_secs,
        remove_processed,
        categorize_after_ingest,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
