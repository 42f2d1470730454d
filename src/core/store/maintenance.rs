//! Whole-database operations: online backup, restore and clear

use std::path::Path;

use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName, OpenFlags, OptionalExtension};

use super::{Store, SCHEMA_VERSION};
use crate::core::error::{BmsError, Result};

/// Every record table, in the order they are cleared
pub const RECORD_TABLES: &[&str] = &["handovers", "requirements", "issues", "test_suites"];

impl Store {
    /// Rows across all record tables
    pub fn total_records(&self) -> Result<usize> {
        let mut total = 0;
        for table in RECORD_TABLES {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            total += n as usize;
        }
        Ok(total)
    }

    /// Copy the live database to `dest` with SQLite's online backup
    ///
    /// `dest` must not exist yet.
    pub fn backup_to(&self, dest: &Path) -> Result<()> {
        if dest.exists() {
            return Err(BmsError::Store(format!(
                "backup target {} already exists",
                dest.display()
            )));
        }
        self.conn
            .backup(DatabaseName::Main, dest, None::<fn(Progress)>)?;
        // Single self-contained file, no -wal sidecar
        Connection::open(dest)?.execute_batch("PRAGMA journal_mode=DELETE;")?;
        log::info!("backed up store to {}", dest.display());
        Ok(())
    }

    /// Replace every table with the contents of the backup at `src`
    ///
    /// The backup is checked before anything is overwritten: it must be a
    /// BMS database whose schema is not newer than this build's.
    pub fn restore_from(&mut self, src: &Path) -> Result<()> {
        let version = backup_schema_version(src)?;
        if version > SCHEMA_VERSION {
            return Err(BmsError::Store(format!(
                "backup schema version {} is newer than this build supports ({})",
                version, SCHEMA_VERSION
            )));
        }

        self.conn
            .restore(DatabaseName::Main, src, None::<fn(Progress)>)?;
        if self.path.is_some() {
            self.conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }
        self.init_schema()?;
        log::info!("restored store from {} (schema v{})", src.display(), version);
        Ok(())
    }

    /// Delete every record, returning how many were removed
    ///
    /// Id sequences are left alone, so ids handed out before the clear are
    /// never reused.
    pub fn clear(&self) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0;
        for table in RECORD_TABLES {
            removed += tx.execute(&format!("DELETE FROM {}", table), [])?;
        }
        tx.commit()?;
        log::info!("cleared {} records", removed);
        Ok(removed)
    }
}

/// Schema version recorded in a backup file
fn backup_schema_version(src: &Path) -> Result<i32> {
    if !src.is_file() {
        return Err(BmsError::Store(format!(
            "backup {} does not exist",
            src.display()
        )));
    }
    let not_bms = || BmsError::Store(format!("{} is not a BMS database", src.display()));

    let conn = Connection::open_with_flags(src, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
    let has_table: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|_| not_bms())?;
    if has_table.is_none() {
        return Err(not_bms());
    }

    let version: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    version.ok_or_else(not_bms)
}
