//! SQLite connections and startup migration.
//!
//! There is no shared connection: every operation opens its own, and all
//! coordination between concurrent callers is left to SQLite's locking.

use crate::config::AppConfig;
use crate::error::AppError;
use crate::infra::migrate::{run_migrations, MigrationReport};
use crate::infra::schema::Schema;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

pub struct DbPool {
    path: PathBuf,
    busy_timeout: Duration,
    /// Test databases are deleted on drop.
    temporary: bool,
}

impl DbPool {
    /// Open (creating if needed) the database file without migrating it.
    pub fn open(config: &AppConfig) -> Result<Self, AppError> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;
            }
        }
        let pool = DbPool {
            path: config.db_path.clone(),
            busy_timeout: config.busy_timeout(),
            temporary: false,
        };
        let conn = pool.connect()?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;
        log::debug!("DB journal mode: {}", mode);
        Ok(pool)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fresh connection with foreign keys enforced and a busy wait installed.
    pub fn connect(&self) -> Result<Connection, AppError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }
}

impl Drop for DbPool {
    fn drop(&mut self) {
        if !self.temporary {
            return;
        }
        for suffix in ["", "-wal", "-shm"] {
            let mut p = self.path.clone().into_os_string();
            p.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(p));
        }
    }
}

/// Open the database at the configured path and bring it to the canonical schema.
pub fn init_db(config: &AppConfig) -> Result<(DbPool, MigrationReport), AppError> {
    let pool = DbPool::open(config)?;
    let mut conn = pool.connect()?;
    let report = run_migrations(&mut conn, &Schema::canonical())?;
    Ok((pool, report))
}

/// Get a connection for one store operation.
pub(crate) fn get_connection(pool: &DbPool) -> Result<Connection, AppError> {
    pool.connect()
}

fn temp_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("pocketbook-test-{}.db", Uuid::new_v4()))
}

/// Empty database in a temp file, no schema. Removed when dropped.
///
/// Panics if the temp directory is unusable; meant for tests only.
pub fn open_unmigrated_test_db() -> DbPool {
    let mut pool = DbPool::open(&AppConfig::at(temp_db_path())).expect("open test db");
    pool.temporary = true;
    pool
}

/// Migrated database in a temp file. Removed when dropped.
///
/// Panics if the temp directory is unusable; meant for tests only.
pub fn init_test_db() -> DbPool {
    let pool = open_unmigrated_test_db();
    let mut conn = pool.connect().expect("connect test db");
    run_migrations(&mut conn, &Schema::canonical()).expect("migrate test db");
    pool
}
