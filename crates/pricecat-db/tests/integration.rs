//! Offline tests for pricecat-db pool configuration and row conversions.
//! These tests do not require a live database connection.

use std::path::PathBuf;

use chrono::Utc;
use pricecat_core::{AppConfig, ArticulRecord, Environment, FileStatus, UploadFileSummary};
use pricecat_db::{articuls::ArticulRow, uploads::UploadFileRow, DbError, PoolConfig};

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        source_dir: PathBuf::from("./data/prices"),
        suppliers_path: PathBuf::from("./config/suppliers.yaml"),
        brands_path: PathBuf::from("./config/brands.yaml"),
        categories_path: PathBuf::from("./config/categories.csv"),
        aliases_path: PathBuf::from("./config/articul_aliases.csv"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        lock_max_attempts: 3,
        lock_backoff_secs: 5,
        interval_secs: 900,
        remove_processed: false,
        categorize_after_ingest: true,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn articul_row_converts_to_record() {
    let row = ArticulRow {
        articul: "df4000".to_string(),
        brand_id: 3,
        aliases: vec!["df4000a".to_string()],
        category_id: None,
    };
    let record = ArticulRecord::from(row);
    assert_eq!(record.key.articul, "df4000");
    assert_eq!(record.key.brand_id, 3);
    assert_eq!(record.aliases, vec!["df4000a"]);
    assert!(record.category_id.is_none());
}

#[test]
fn upload_file_row_with_known_status_converts() {
    let row = UploadFileRow {
        file_name: "autotrade_0501.csv".to_string(),
        supplier_id: Some(1),
        status: "processed".to_string(),
        rows_total: 10,
        rows_applied: 9,
        error_message: None,
    };
    let summary = UploadFileSummary::try_from(row).expect("status should parse");
    assert_eq!(summary.status, FileStatus::Processed);
    assert_eq!(summary.rows_applied, 9);
}

#[test]
fn upload_file_row_with_unknown_status_is_corrupt() {
    let row = UploadFileRow {
        file_name: "x.csv".to_string(),
        supplier_id: None,
        status: "exploded".to_string(),
        rows_total: 0,
        rows_applied: 0,
        error_message: None,
    };
    let err = UploadFileSummary::try_from(row).unwrap_err();
    assert!(matches!(err, DbError::Corrupt(_)));
}

#[test]
fn upload_row_converts_to_record() {
    let now = Utc::now();
    let record = pricecat_core::UploadRecord::from(pricecat_db::uploads::UploadRow {
        id: 12,
        created_at: now,
    });
    assert_eq!(record.id, 12);
    assert_eq!(record.created_at, now);
}
