//! Database module for SQLite operations.
//!
//! This module provides the `Database` struct and the store implementations,
//! organized into submodules by table.

mod assets;
mod chunks;
mod migrations;
pub mod models;
mod projects;

pub use models::{Asset, AssetType, DataChunk, NewAsset, NewChunk, Project};

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{DatabaseError, ProcessingError, ServiceError, ServiceResult};

/// Database manager for SQLite operations
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> ServiceResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ServiceError::Processing(ProcessingError::Io(e)))?;
        }

        let conn = Connection::open(path).map_err(DatabaseError::Connection)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(DatabaseError::Query)?;

        Self::init(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> ServiceResult<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::Connection)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(DatabaseError::Query)?;

        Self::init(conn)
    }

    fn init(conn: Connection) -> ServiceResult<Self> {
        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Flush and close the underlying connection
    pub fn close(self) -> ServiceResult<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| DatabaseError::LockPoisoned)?;
        conn.close()
            .map_err(|(_, e)| DatabaseError::Connection(e))?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ProjectStore;

    #[test]
    fn test_open_creates_file_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.db");

        let db = Database::open(&path).unwrap();
        let project = db.get_or_create_project("alpha").unwrap();
        db.close().unwrap();
        assert!(path.exists());

        let db = Database::open(&path).unwrap();
        let found = db.find_project("alpha").unwrap().unwrap();
        assert_eq!(found.id, project.id);
    }
}
