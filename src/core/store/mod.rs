//! SQLite-backed record store
//!
//! The store is the sole owner of the database file. It creates one table per
//! entity type on first use and exposes create/get/list/update/delete generic
//! over [`Record`](crate::core::entity::Record). Every operation is a single
//! statement against the connection; nothing is cached between calls.

pub(crate) mod columns;
mod maintenance;
mod queries;
mod schema;
mod types;

pub use maintenance::RECORD_TABLES;
pub use types::*;

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::core::error::Result;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i32 = 1;

/// The record store backed by SQLite
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create the store at `path`
    ///
    /// Missing parent directories are created. Tables are created if absent.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        log::debug!("opened store at {}", path.display());

        Self::with_connection(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory store (tests, dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = Self { conn, path };
        store.init_schema()?;
        Ok(store)
    }

    /// Database file path (`None` for in-memory stores)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> Result<i32> {
        let version: Option<i32> =
            self.conn
                .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                    row.get(0)
                })?;
        Ok(version.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests;
