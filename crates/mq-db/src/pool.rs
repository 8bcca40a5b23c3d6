//! r2d2 pools over the marquee library database.
//!
//! Every pool runs pending migrations before it is handed out, so callers
//! never see an unmigrated schema.

use std::path::Path;

use mq_core::config::DatabaseConfig;
use mq_core::{Error, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::migrations;

pub type DbPool = Pool<SqliteConnectionManager>;

pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const POOL_SIZE: u32 = 4;

/// How long a connection waits on a lock held by another `marquee`
/// process before failing with `SQLITE_BUSY`.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Open the library named by `config`, creating the file and any missing
/// parent directories.
pub fn open_pool(config: &DatabaseConfig) -> Result<DbPool> {
    if let Some(dir) = config.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    init_pool(&config.path.to_string_lossy())
}

/// Open a library file with foreign keys and WAL enabled on every
/// connection.
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(Path::new(db_path)).with_init(|conn| {
        conn.execute_batch(&format!(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};"
        ))
    });
    let pool = build_migrated(manager, db_path)?;
    tracing::debug!("Library database ready at {db_path}");
    Ok(pool)
}

/// A private in-memory library. Connections within one pool share a
/// uniquely named database; separate pools never see each other.
pub fn init_memory_pool() -> Result<DbPool> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let uri = format!("file:marquee_mem_{n}?mode=memory&cache=shared");

    let manager = SqliteConnectionManager::file(&uri)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    build_migrated(manager, &uri)
}

fn build_migrated(manager: SqliteConnectionManager, label: &str) -> Result<DbPool> {
    let pool = Pool::builder()
        .max_size(POOL_SIZE)
        .build(manager)
        .map_err(|e| Error::database(format!("cannot open {label}: {e}")))?;
    let conn = get_conn(&pool)?;
    migrations::run_migrations(&conn)?;
    Ok(pool)
}

pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("no database connection available: {e}")))
}
