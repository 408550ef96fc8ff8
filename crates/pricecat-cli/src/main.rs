mod ingest;
mod reference;
mod scheduler;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use pricecat_core::AppConfig;
use pricecat_db::{PgCatalogStore, PoolConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricecat")]
#[command(about = "Supplier price-list catalog: ingestion, identity resolution, categorization")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Ingest every price file in the source directory once.
    Ingest {
        /// Override `PRICECAT_SOURCE_DIR`.
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Run against an in-memory catalog seeded from the reference files.
        #[arg(long)]
        dry_run: bool,
        /// Skip the categorization pass after the batch.
        #[arg(long)]
        no_categorize: bool,
    },
    /// Assign categories to uncategorized articuls.
    Categorize,
    /// Ingest on a fixed interval until interrupted.
    Watch {
        /// Override `PRICECAT_INTERVAL_SECS`.
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    Articul {
        #[command(subcommand)]
        command: ArticulCommands,
    },
    /// List recent uploads with their per-file summaries.
    Uploads {
        #[arg(long, default_value_t = 10)]
        limit: i64,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
    /// Load curated brands, categories, and suppliers.
    Seed,
}

#[derive(Debug, Subcommand)]
enum ArticulCommands {
    /// Clear an articul's category so the next pass reassigns it.
    Uncategorize {
        /// Brand as written in price files. Empty selects the reserved brand.
        #[arg(long, default_value = "")]
        brand: String,
        #[arg(long)]
        articul: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = pricecat_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cancel = CancellationToken::new();
    cancel_on_signal(cancel.clone());

    match command {
        Commands::Db { command } => run_db(&config, command).await?,
        Commands::Ingest {
            dir,
            dry_run,
            no_categorize,
        } => {
            let categorize = config.categorize_after_ingest && !no_categorize;
            ingest::run_ingest(&config, dir, dry_run, categorize, &cancel).await?;
        }
        Commands::Categorize => {
            let store = connect_store(&config).await?;
            ingest::categorize_pass(&store, &cancel).await?;
        }
        Commands::Watch { interval_secs } => {
            let store = connect_store(&config).await?;
            let interval = interval_secs.unwrap_or(config.interval_secs);
            scheduler::run_watch(store, config, interval, cancel).await?;
        }
        Commands::Articul {
            command: ArticulCommands::Uncategorize { brand, articul },
        } => {
            let store = connect_store(&config).await?;
            ingest::run_uncategorize(&store, &brand, &articul).await?;
        }
        Commands::Uploads { limit, json } => {
            let store = connect_store(&config).await?;
            ingest::run_uploads(&store, limit, json).await?;
        }
    }

    Ok(())
}

async fn run_db(config: &AppConfig, command: DbCommands) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    match command {
        DbCommands::Ping => {
            pricecat_db::ping(store.pool()).await?;
            println!("database reachable");
        }
        DbCommands::Migrate => {
            let applied = pricecat_db::run_migrations(store.pool()).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Seed => {
            let summary = reference::seed_reference(&store, config).await?;
            println!("{summary}");
        }
    }
    Ok(())
}

async fn connect_store(config: &AppConfig) -> anyhow::Result<PgCatalogStore> {
    let pool =
        pricecat_db::connect_pool(&config.database_url, PoolConfig::from_app_config(config)).await?;
    Ok(PgCatalogStore::new(pool))
}

/// Cancel `token` on ctrl-c or SIGTERM. Running batches stop between files.
fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("received shutdown signal, stopping after the current file");
        token.cancel();
    });
}
