//! Database schema initialization

use rusqlite::params;

use super::{Store, SCHEMA_VERSION};
use crate::core::error::{BmsError, Result};

impl Store {
    /// Create all tables if missing and record the schema version
    ///
    /// A database written by a newer build is refused rather than modified.
    pub(super) fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS handovers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                from_person TEXT NOT NULL,
                to_person TEXT NOT NULL,
                date TEXT NOT NULL,
                status TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                documents TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_handovers_status ON handovers(status);
            CREATE INDEX IF NOT EXISTS idx_handovers_updated ON handovers(updated_at);

            CREATE TABLE IF NOT EXISTS requirements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                change_date TEXT,
                priority TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_requirements_status ON requirements(status);
            CREATE INDEX IF NOT EXISTS idx_requirements_priority ON requirements(priority);
            CREATE INDEX IF NOT EXISTS idx_requirements_updated ON requirements(updated_at);

            CREATE TABLE IF NOT EXISTS issues (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                issue_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                status TEXT NOT NULL,
                reporter TEXT,
                assigned_to TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
            CREATE INDEX IF NOT EXISTS idx_issues_severity ON issues(severity);
            CREATE INDEX IF NOT EXISTS idx_issues_type ON issues(issue_type);
            CREATE INDEX IF NOT EXISTS idx_issues_updated ON issues(updated_at);

            CREATE TABLE IF NOT EXISTS test_suites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                pass_count INTEGER NOT NULL DEFAULT 0 CHECK (pass_count >= 0),
                fail_count INTEGER NOT NULL DEFAULT 0 CHECK (fail_count >= 0),
                last_run TEXT,
                status TEXT NOT NULL,
                fix_notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_test_suites_status ON test_suites(status);
            CREATE INDEX IF NOT EXISTS idx_test_suites_updated ON test_suites(updated_at);
            "#,
        )?;

        let recorded = self.schema_version()?;
        if recorded > SCHEMA_VERSION {
            return Err(BmsError::Store(format!(
                "database schema version {} is newer than this build supports ({})",
                recorded, SCHEMA_VERSION
            )));
        }
        if recorded < SCHEMA_VERSION {
            self.conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
            log::info!("initialized store schema version {}", SCHEMA_VERSION);
        }

        Ok(())
    }
}
