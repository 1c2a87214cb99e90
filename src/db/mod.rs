//! SQLite storage for backtest reports

use crate::error::{ArbError, ArbResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub mod report;

pub use report::BacktestReport;

/// Shared handle to a single SQLite connection
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a database file
    pub fn new<P: AsRef<Path>>(path: P) -> ArbResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            ArbError::DatabaseConnection(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> ArbResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ArbError::DatabaseConnection(e.to_string()))?;

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a database file and make sure the schema exists
    pub fn open_with_schema<P: AsRef<Path>>(path: P) -> ArbResult<Self> {
        let db = Self::new(path)?;
        db.run_migrations()?;
        Ok(db)
    }

    /// Run migrations to set up or update the schema
    pub fn run_migrations(&self) -> ArbResult<()> {
        let conn = self.lock()?;
        let migration_sql = include_str!("migrations/V1__initial_schema.sql");
        conn.execute_batch(migration_sql)?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> ArbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ArbError::DatabaseConnection("connection lock poisoned".to_string()))
    }

    /// Check database health
    pub fn health_check(&self) -> ArbResult<bool> {
        let conn = self.lock()?;
        let result: i32 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
        Ok(result == 1)
    }
}
