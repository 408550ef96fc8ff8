use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    /// Directory polled for supplier CSV files.
    pub source_dir: PathBuf,
    pub suppliers_path: PathBuf,
    pub brands_path: PathBuf,
    pub categories_path: PathBuf,
    pub aliases_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Attempts to acquire the source-directory lock before abandoning a batch.
    pub lock_max_attempts: u32,
    /// Fixed pause between lock attempts.
    pub lock_backoff_secs: u64,
    /// Period of the `watch` scheduler.
    pub interval_secs: u64,
    pub remove_processed: bool,
    pub categorize_after_ingest: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("source_dir", &self.source_dir)
            .field("suppliers_path", &self.suppliers_path)
            .field("brands_path", &self.brands_path)
            .field("categories_path", &self.categories_path)
            .field("aliases_path", &self.aliases_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("lock_max_attempts", &self.lock_max_attempts)
            .field("lock_backoff_secs", &self.lock_backoff_secs)
            .field("interval_secs", &self.interval_secs)
            .field("remove_processed", &self.remove_processed)
            .field("categorize_after_ingest", &self.categorize_after_ingest)
            .finish()
    }
}
