//! Configuration management with layered hierarchy
//!
//! Sources, lowest priority first: built-in defaults, the global user file
//! (`<config dir>/bms/config.yaml`), the file named by `BMS_CONFIG`, then
//! `BMS_*` environment variables. The CLI applies its own flags last. The
//! resulting [`Config`] is passed explicitly to whatever needs it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::{BmsError, Result};

/// Default database file name
pub const DEFAULT_DB_NAME: &str = "bms_database.db";

/// Backups kept by `bms db backup` unless configured otherwise
pub const DEFAULT_BACKUP_KEEP: usize = 10;

/// Default number of recent activities on the dashboard
pub const DEFAULT_DASHBOARD_LIMIT: usize = 5;

pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_FROM_NAME: &str = "BMS System";

/// Environment variables read by [`Config::load`], with what they set
pub const ENV_KEYS: &[(&str, &str)] = &[
    ("BMS_CONFIG", "extra config file merged over the global one"),
    ("BMS_DB_PATH", "database file path"),
    ("BMS_SMTP_SERVER", "SMTP server host"),
    ("BMS_SMTP_PORT", "SMTP server port"),
    ("BMS_EMAIL_USERNAME", "sender account (also the From address)"),
    ("BMS_EMAIL_PASSWORD", "sender password"),
    ("BMS_NOTIFY_TO", "comma-separated status-change recipients"),
    ("BMS_OUTBOX_DIR", "write outgoing mail as .eml files here"),
    ("BMS_BACKUP_DIR", "directory for database backups"),
];

/// Outgoing mail settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_server: Option<String>,
    pub smtp_port: Option<u16>,
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Display name on the From header
    pub from_name: Option<String>,
}

impl EmailConfig {
    pub fn smtp_server(&self) -> &str {
        self.smtp_server.as_deref().unwrap_or(DEFAULT_SMTP_SERVER)
    }

    pub fn smtp_port(&self) -> u16 {
        self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT)
    }

    pub fn from_name(&self) -> &str {
        self.from_name.as_deref().unwrap_or(DEFAULT_FROM_NAME)
    }

    /// Username and password are both set and non-blank
    pub fn has_credentials(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.username) && set(&self.password)
    }

    fn merge(&mut self, other: EmailConfig) {
        if other.smtp_server.is_some() {
            self.smtp_server = other.smtp_server;
        }
        if other.smtp_port.is_some() {
            self.smtp_port = other.smtp_port;
        }
        if other.username.is_some() {
            self.username = other.username;
        }
        if other.password.is_some() {
            self.password = other.password;
        }
        if other.from_name.is_some() {
            self.from_name = other.from_name;
        }
    }
}

/// Notification behavior
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Master switch (default on)
    pub enabled: Option<bool>,
    /// Who receives status-change notifications
    pub recipients: Vec<String>,
    /// Write messages as `.eml` files instead of logging them
    pub outbox_dir: Option<PathBuf>,
}

impl NotifyConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    fn merge(&mut self, other: NotifyConfig) {
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if !other.recipients.is_empty() {
            self.recipients = other.recipients;
        }
        if other.outbox_dir.is_some() {
            self.outbox_dir = other.outbox_dir;
        }
    }
}

/// BMS configuration with layered hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file
    pub database_path: Option<PathBuf>,

    /// Recent activities shown by `bms status`
    pub dashboard_limit: Option<usize>,

    /// Default output format
    pub default_format: Option<String>,

    /// Where `bms db backup` writes (default: `backups/` next to the database)
    pub backup_dir: Option<PathBuf>,

    /// Backups kept after each `bms db backup`
    pub backup_keep: Option<usize>,

    pub email: EmailConfig,

    pub notify: NotifyConfig,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    ///
    /// A broken global file is skipped with a warning; a broken file named
    /// explicitly by `BMS_CONFIG` is an error.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                match Self::from_file(&global_path) {
                    Ok(global) => config.merge(global),
                    Err(e) => log::warn!("ignoring {}: {}", global_path.display(), e),
                }
            }
        }

        if let Ok(path) = std::env::var("BMS_CONFIG") {
            config.merge(Self::from_file(Path::new(&path))?);
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a single YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_yml::from_str(&contents)
            .map_err(|e| BmsError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bms")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Overlay `BMS_*` variables, read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("BMS_DB_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(server) = get("BMS_SMTP_SERVER") {
            self.email.smtp_server = Some(server);
        }
        if let Some(port) = get("BMS_SMTP_PORT") {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| BmsError::Config(format!("BMS_SMTP_PORT '{}' is not a port", port)))?;
            self.email.smtp_port = Some(port);
        }
        if let Some(username) = get("BMS_EMAIL_USERNAME") {
            self.email.username = Some(username);
        }
        if let Some(password) = get("BMS_EMAIL_PASSWORD") {
            self.email.password = Some(password);
        }
        if let Some(recipients) = get("BMS_NOTIFY_TO") {
            self.notify.recipients = recipients
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(dir) = get("BMS_OUTBOX_DIR") {
            self.notify.outbox_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = get("BMS_BACKUP_DIR") {
            self.backup_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.database_path.is_some() {
            self.database_path = other.database_path;
        }
        if other.dashboard_limit.is_some() {
            self.dashboard_limit = other.dashboard_limit;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.backup_dir.is_some() {
            self.backup_dir = other.backup_dir;
        }
        if other.backup_keep.is_some() {
            self.backup_keep = other.backup_keep;
        }
        self.email.merge(other.email);
        self.notify.merge(other.notify);
    }

    /// Database file, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        if let Some(ref path) = self.database_path {
            return path.clone();
        }
        directories::ProjectDirs::from("", "", "bms")
            .map(|dirs| dirs.data_dir().join(DEFAULT_DB_NAME))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_NAME))
    }

    pub fn dashboard_limit(&self) -> usize {
        self.dashboard_limit.unwrap_or(DEFAULT_DASHBOARD_LIMIT)
    }

    /// Backup directory, defaulting to `backups/` beside the database file
    pub fn backup_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.backup_dir {
            return dir.clone();
        }
        let db = self.database_path();
        db.parent()
            .map(|p| p.join("backups"))
            .unwrap_or_else(|| PathBuf::from("backups"))
    }

    pub fn backup_keep(&self) -> usize {
        self.backup_keep.unwrap_or(DEFAULT_BACKUP_KEEP)
    }
}
