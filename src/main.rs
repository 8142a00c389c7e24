//! MTG Collector - card catalog database
//!
//! Downloads the MTGJSON bulk snapshot when a new version is published,
//! normalizes it and merges it into SQLite. Runs continuously with daily
//! update checks.

use clap::Parser;
use mtg_collector::catalog::normalize;
use mtg_collector::database::{entity_counts, init_schema, persist_catalog};
use mtg_collector::mtgjson::SnapshotStore;
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::interval;

/// MTG catalog sync - downloads bulk card data and syncs it to SQLite
#[derive(Parser, Debug)]
#[command(name = "mtg_collector")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// Directory for downloaded snapshot files
    #[arg(long, default_value_t = default_download_dir())]
    data_dir: String,

    /// Run once and exit (default: run continuously with daily schedule)
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Check interval in hours when running continuously
    #[arg(long, default_value_t = 24)]
    interval_hours: u64,

    /// Re-ingest the latest local snapshot even without a new remote version
    #[arg(long, default_value_t = false)]
    force: bool,
}

/// Returns the default database path: ~/.local/share/mtg_collector/catalog.db
fn default_db_path() -> String {
    data_root().join("catalog.db").to_string_lossy().to_string()
}

/// Returns the default snapshot directory: ~/.local/share/mtg_collector/downloads
fn default_download_dir() -> String {
    data_root().join("downloads").to_string_lossy().to_string()
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mtg_collector")
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    log::info!("Starting mtg_collector...");
    log::info!("Database path: {}", db_path.display());
    log::info!("Snapshot directory: {}", args.data_dir);

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.exists() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create database directory: {}", e);
                std::process::exit(1);
            }
            log::info!("Created directory: {}", parent.display());
        }
    }

    // Open database connection
    let mut conn = match Connection::open(&db_path) {
        Ok(conn) => {
            log::info!("Opened database: {}", db_path.display());
            conn
        }
        Err(e) => {
            log::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize database schema
    if let Err(e) = init_schema(&conn) {
        log::error!("Failed to initialize database schema: {}", e);
        std::process::exit(1);
    }

    let store = match SnapshotStore::new(&args.data_dir) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to open snapshot directory: {}", e);
            std::process::exit(1);
        }
    };

    if args.once {
        // Run once and exit
        run_sync(&mut conn, &store, args.force).await;
    } else {
        // Run continuously with interval checks
        log::info!(
            "Running in daemon mode, checking every {} hour(s)",
            args.interval_hours
        );
        run_daemon(&mut conn, &store, args.interval_hours, args.force).await;
    }
}

/// Run the sync daemon - checks periodically and ingests when needed
async fn run_daemon(conn: &mut Connection, store: &SnapshotStore, interval_hours: u64, force: bool) {
    let check_interval = Duration::from_secs(interval_hours * 3600);
    let mut ticker = interval(check_interval);

    // Run immediately on startup; --force only applies to the first pass
    run_sync(conn, store, force).await;

    loop {
        ticker.tick().await;
        log::info!("Scheduled check triggered");
        run_sync(conn, store, false).await;
    }
}

/// Run a single ingestion pass
///
/// Nothing is persisted unless normalization of the whole snapshot
/// succeeded; a failed pass leaves the previously stored catalog intact.
async fn run_sync(conn: &mut Connection, store: &SnapshotStore, force: bool) {
    let client = reqwest::Client::new();

    // Check for a new snapshot version
    let updated = match store.check_update(&client).await {
        Ok(updated) => updated,
        Err(e) => {
            log::error!("Failed to download snapshot: {}", e);
            return;
        }
    };

    let version = match updated {
        Some(version) => {
            log::info!("Downloaded snapshot version {}", version);
            version
        }
        None if force => match store.latest_local_version() {
            Ok(Some(version)) => {
                log::info!("Forcing re-ingestion of local snapshot {}", version);
                version
            }
            Ok(None) => {
                log::error!("No local snapshot available to force-ingest");
                return;
            }
            Err(e) => {
                log::error!("Failed to scan snapshot directory: {}", e);
                return;
            }
        },
        None => {
            log::info!("Catalog is up to date, skipping ingestion");
            return;
        }
    };

    // Decode and normalize entirely in memory before touching the store
    let snapshot = match store.load(&version) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            log::error!("Failed to decode snapshot {}: {}", version, e);
            return;
        }
    };
    log::info!("Loaded snapshot {} ({} editions)", version, snapshot.len());

    let catalog = normalize(&snapshot);

    match persist_catalog(conn, &catalog) {
        Ok(_) => {}
        Err(e) => {
            log::error!("Failed to persist catalog: {}", e);
            return;
        }
    }

    match entity_counts(conn) {
        Ok(counts) => log::info!(
            "Catalog now holds {} editions, {} metacards, {} cards, {} formats, {} legalities",
            counts.editions,
            counts.metacards,
            counts.cards,
            counts.formats,
            counts.legalities
        ),
        Err(e) => log::error!("Failed to read catalog counts: {}", e),
    }

    log::info!("Ingestion pass completed successfully.");
}
