//! Timestamped database backups
//!
//! Backups are plain SQLite files named `bms_backup_YYYYmmdd_HHMMSS.db` in a
//! backup directory, each with a small JSON sidecar describing where it came
//! from. Names sort chronologically, so "newest" means "last by name".

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{BmsError, Result};
use crate::core::store::Store;

pub const BACKUP_PREFIX: &str = "bms_backup_";
pub const BACKUP_EXTENSION: &str = "db";

/// Sidecar written next to every backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub created_at: DateTime<Utc>,
    pub source: Option<PathBuf>,
    pub schema_version: i32,
    pub records: usize,
}

/// One backup found on disk
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub size: u64,
    /// `None` when the sidecar is missing or unreadable
    pub metadata: Option<BackupMetadata>,
}

impl BackupInfo {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// `bms_backup_20240301_101500.db`
pub fn backup_filename(at: DateTime<Local>) -> String {
    format!(
        "{}{}.{}",
        BACKUP_PREFIX,
        at.format("%Y%m%d_%H%M%S"),
        BACKUP_EXTENSION
    )
}

fn metadata_path(backup: &Path) -> PathBuf {
    backup.with_extension("json")
}

fn is_backup(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    name.starts_with(BACKUP_PREFIX)
        && path.extension().is_some_and(|e| e == BACKUP_EXTENSION)
}

/// Back up `store` into `dir`, returning the new file
///
/// Two backups in the same second get `_1`, `_2`, ... suffixes.
pub fn create_backup(store: &Store, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;

    let name = backup_filename(Local::now());
    let stem = name.trim_end_matches(&format!(".{}", BACKUP_EXTENSION)).to_string();
    let mut path = dir.join(&name);
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}.{}", stem, n, BACKUP_EXTENSION));
        n += 1;
    }

    store.backup_to(&path)?;

    let metadata = BackupMetadata {
        created_at: Utc::now(),
        source: store.path().map(Path::to_path_buf),
        schema_version: store.schema_version()?,
        records: store.total_records()?,
    };
    let json = serde_json::to_string_pretty(&metadata)
        .map_err(|e| BmsError::Store(e.to_string()))?;
    fs::write(metadata_path(&path), json)?;
    Ok(path)
}

/// Backups in `dir`, newest first; a missing directory has none
pub fn list_backups(dir: &Path) -> Result<Vec<BackupInfo>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut backups = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || !is_backup(&path) {
            continue;
        }
        let size = fs::metadata(&path)?.len();
        let metadata = fs::read_to_string(metadata_path(&path))
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok());
        backups.push(BackupInfo {
            path,
            size,
            metadata,
        });
    }
    backups.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    Ok(backups)
}

/// Delete all but the newest `keep` backups, returning what was removed
pub fn cleanup_old_backups(dir: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for old in list_backups(dir)?.into_iter().skip(keep) {
        fs::remove_file(&old.path)?;
        let sidecar = metadata_path(&old.path);
        if sidecar.exists() {
            fs::remove_file(sidecar)?;
        }
        log::info!("removed old backup {}", old.path.display());
        removed.push(old.path);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use tempfile::tempdir;

    use crate::entities::Handover;

    fn store_with_one(dir: &Path) -> Store {
        let store = Store::open(&dir.join("bms.db")).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        store.create(Handover::new("Night shift", "Alice", "Bob", day)).unwrap();
        store
    }

    #[test]
    fn test_backup_filename() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap();
        assert_eq!(backup_filename(at), "bms_backup_20240301_101500.db");
    }

    #[test]
    fn test_create_backup_writes_file_and_sidecar() {
        let tmp = tempdir().unwrap();
        let store = store_with_one(tmp.path());

        let path = create_backup(&store, &tmp.path().join("backups")).unwrap();
        assert!(path.exists());
        assert!(is_backup(&path));

        let listed = list_backups(&tmp.path().join("backups")).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].size > 0);
        let meta = listed[0].metadata.as_ref().unwrap();
        assert_eq!(meta.records, 1);
        assert_eq!(meta.source.as_deref(), store.path());
    }

    #[test]
    fn test_same_second_backups_do_not_collide() {
        let tmp = tempdir().unwrap();
        let store = store_with_one(tmp.path());
        let dir = tmp.path().join("backups");

        let a = create_backup(&store, &dir).unwrap();
        let b = create_backup(&store, &dir).unwrap();
        assert_ne!(a, b);
        assert_eq!(list_backups(&dir).unwrap().len(), 2);
    }

    #[test]
    fn test_list_ignores_other_files_and_sorts_newest_first() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("bms_backup_20240101_000000.db"), "x").unwrap();
        fs::write(dir.join("bms_backup_20240301_000000.db"), "x").unwrap();
        fs::write(dir.join("bms_backup_20240201_000000.json"), "{}").unwrap();
        fs::write(dir.join("notes.db"), "x").unwrap();

        let names: Vec<String> = list_backups(dir)
            .unwrap()
            .iter()
            .map(BackupInfo::file_name)
            .collect();
        assert_eq!(
            names,
            vec!["bms_backup_20240301_000000.db", "bms_backup_20240101_000000.db"]
        );
        assert!(list_backups(&dir.join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        for day in ["01", "02", "03"] {
            let name = format!("bms_backup_202403{}_000000", day);
            fs::write(dir.join(format!("{}.db", name)), "x").unwrap();
            fs::write(dir.join(format!("{}.json", name)), "{}").unwrap();
        }

        let removed = cleanup_old_backups(dir, 2).unwrap();
        assert_eq!(removed, vec![dir.join("bms_backup_20240301_000000.db")]);
        assert!(!dir.join("bms_backup_20240301_000000.json").exists());
        assert_eq!(list_backups(dir).unwrap().len(), 2);
    }
}
