//! `bms config` command - Configuration management
//!
//! Shows the effective configuration and edits the global config file.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::commands::utils::load_config;
use crate::cli::helpers::mask_secret;
use crate::cli::GlobalOpts;
use crate::core::config::ENV_KEYS;
use crate::core::{BmsService, Config};
use crate::notify::Notifier;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration values
    Show(ShowArgs),

    /// Set a value in the global config file
    Set(SetArgs),

    /// Remove a value from the global config file
    Unset(UnsetArgs),

    /// Show paths to the config file and database
    Path,

    /// List configuration keys, environment variables and field values
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., dashboard_limit, email.smtp_server)
    pub key: String,

    /// Value to set
    pub value: String,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,
}

/// Keys settable in the config file
const VALID_KEYS: &[(&str, &str)] = &[
    ("database_path", "SQLite database file"),
    ("dashboard_limit", "Recent activities shown by `bms status` (default 5)"),
    ("default_format", "Default output format (tsv, json, yaml, csv, md)"),
    ("backup_dir", "Where `bms db backup` writes (default: backups/ beside the database)"),
    ("backup_keep", "Backups kept after each `bms db backup` (default 10)"),
    ("email.smtp_server", "SMTP server host (default smtp.gmail.com)"),
    ("email.smtp_port", "SMTP server port (default 587)"),
    ("email.username", "Sender account, also the From address"),
    ("email.from_name", "Display name on the From header"),
    ("notify.enabled", "Send notifications at all (true/false)"),
    ("notify.recipients", "Comma-separated status-change recipients"),
    ("notify.outbox_dir", "Write outgoing mail as .eml files here"),
];

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => edit_global(&args.key, Some(&args.value)),
        ConfigCommands::Unset(args) => edit_global(&args.key, None),
        ConfigCommands::Path => run_path(global),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;

    if let Some(key) = &args.key {
        return match config_value(&config, key) {
            Some(value) => {
                println!("{}", value);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _) in VALID_KEYS {
        print_config_value(key, config_value(&config, key).as_deref());
    }
    print_config_value(
        "email.password",
        config.email.password.as_deref().map(mask_secret).as_deref(),
    );
    let transport = Notifier::from_config(&config)
        .map(|n| n.transport())
        .unwrap_or_else(|e| format!("unavailable ({})", e));
    print_config_value("mail transport", Some(transport.as_str()));

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Command-line flags (--db)");
    println!("  2. Environment variables (BMS_*)");
    println!("  3. File named by BMS_CONFIG");
    println!("  4. Global config (<config dir>/bms/config.yaml)");
    Ok(())
}

fn print_config_value(key: &str, value: Option<&str>) {
    match value {
        Some(v) => println!("  {}: {}", style(key).cyan(), style(v).yellow()),
        None => println!("  {}: {}", style(key).cyan(), style("(not set)").dim()),
    }
}

/// Effective value of `key` (defaults applied where the config has one)
fn config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "database_path" => Some(config.database_path().display().to_string()),
        "dashboard_limit" => Some(config.dashboard_limit().to_string()),
        "default_format" => config.default_format.clone(),
        "backup_dir" => Some(config.backup_dir().display().to_string()),
        "backup_keep" => Some(config.backup_keep().to_string()),
        "email.smtp_server" => Some(config.email.smtp_server().to_string()),
        "email.smtp_port" => Some(config.email.smtp_port().to_string()),
        "email.username" => config.email.username.clone(),
        "email.from_name" => Some(config.email.from_name().to_string()),
        "notify.enabled" => Some(config.notify.enabled().to_string()),
        "notify.recipients" => {
            Some(config.notify.recipients.join(",")).filter(|r| !r.is_empty())
        }
        "notify.outbox_dir" => config
            .notify
            .outbox_dir
            .as_ref()
            .map(|p| p.display().to_string()),
        _ => None,
    }
}

/// Set (`Some`) or clear (`None`) one key
fn apply_key(config: &mut Config, key: &str, value: Option<&str>) -> std::result::Result<(), String> {
    fn parse<T: std::str::FromStr>(key: &str, value: &str) -> std::result::Result<T, String> {
        value
            .trim()
            .parse()
            .map_err(|_| format!("Invalid value '{}' for {}", value, key))
    }
    let text = value.map(|v| v.trim().to_string());

    match key {
        "database_path" => config.database_path = text.map(PathBuf::from),
        "dashboard_limit" => {
            config.dashboard_limit = value.map(|v| parse(key, v)).transpose()?;
        }
        "default_format" => config.default_format = text,
        "backup_dir" => config.backup_dir = text.map(PathBuf::from),
        "backup_keep" => config.backup_keep = value.map(|v| parse(key, v)).transpose()?,
        "email.smtp_server" => config.email.smtp_server = text,
        "email.smtp_port" => config.email.smtp_port = value.map(|v| parse(key, v)).transpose()?,
        "email.username" => config.email.username = text,
        "email.from_name" => config.email.from_name = text,
        "notify.enabled" => config.notify.enabled = value.map(|v| parse(key, v)).transpose()?,
        "notify.recipients" => {
            config.notify.recipients = text
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        "notify.outbox_dir" => config.notify.outbox_dir = text.map(PathBuf::from),
        "email.password" => {
            return Err("Passwords are not stored in the config file; set BMS_EMAIL_PASSWORD".to_string())
        }
        _ => {
            let valid: Vec<&str> = VALID_KEYS.iter().map(|(k, _)| *k).collect();
            return Err(format!(
                "Unknown config key '{}'. Valid keys: {}",
                key,
                valid.join(", ")
            ));
        }
    }
    Ok(())
}

fn edit_global(key: &str, value: Option<&str>) -> Result<()> {
    let path = Config::global_config_path()
        .ok_or_else(|| miette::miette!("Could not determine config directory"))?;

    let mut config = if path.exists() {
        Config::from_file(&path)?
    } else {
        Config::default()
    };
    apply_key(&mut config, key, value).map_err(|e| miette::miette!("{}", e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&config).into_diagnostic()?;
    fs::write(&path, yaml).into_diagnostic()?;

    match value {
        Some(v) => println!(
            "{} Set {} = {} in {}",
            style("✓").green(),
            style(key).cyan(),
            style(v).yellow(),
            style(path.display()).dim()
        ),
        None => println!(
            "{} Removed {} from {}",
            style("✓").green(),
            style(key).cyan(),
            style(path.display()).dim()
        ),
    }
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;

    println!("{}", style("Configuration file paths:").bold());
    println!();
    match Config::global_config_path() {
        Some(path) => {
            println!("  {} {}", style("Global:").cyan(), path.display());
            if path.exists() {
                println!("          {}", style("(exists)").green());
            } else {
                println!("          {}", style("(not created)").dim());
            }
        }
        None => println!("  {} {}", style("Global:").cyan(), style("(unavailable)").dim()),
    }
    if let Ok(extra) = std::env::var("BMS_CONFIG") {
        println!("  {} {}", style("BMS_CONFIG:").cyan(), extra);
    }

    let db = config.database_path();
    println!();
    println!("  {} {}", style("Database:").cyan(), db.display());
    if !db.exists() {
        println!("          {}", style("(not created; run `bms init`)").dim());
    }
    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();
    for (key, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!("{}", style("Environment variables:").bold());
    println!();
    for (var, description) in ENV_KEYS {
        println!("  {:<20} {}", style(var).cyan(), style(description).dim());
    }

    println!();
    println!("{}", style("Accepted field values:").bold());
    println!();
    for (field, values) in BmsService::filter_options() {
        println!("  {:<22} {}", style(field).cyan(), style(values.join(", ")).dim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_key_sets_and_clears() {
        let mut config = Config::default();
        apply_key(&mut config, "dashboard_limit", Some("8")).unwrap();
        apply_key(&mut config, "notify.recipients", Some("a@x.io, b@x.io,")).unwrap();
        assert_eq!(config.dashboard_limit(), 8);
        assert_eq!(config.notify.recipients, vec!["a@x.io", "b@x.io"]);

        apply_key(&mut config, "dashboard_limit", None).unwrap();
        assert_eq!(config.dashboard_limit, None);
    }

    #[test]
    fn test_apply_key_rejects_bad_values() {
        let mut config = Config::default();
        assert!(apply_key(&mut config, "email.smtp_port", Some("http")).is_err());
        assert!(apply_key(&mut config, "email.password", Some("x")).is_err());
        let err = apply_key(&mut config, "colour", Some("red")).unwrap_err();
        assert!(err.starts_with("Unknown config key 'colour'"));
    }

    #[test]
    fn test_every_listed_key_has_a_value_path() {
        let mut config = Config::default();
        config.default_format = Some("json".to_string());
        config.email.username = Some("ops@example.com".to_string());
        config.notify.recipients = vec!["lead@example.com".to_string()];
        config.notify.outbox_dir = Some(PathBuf::from("outbox"));
        for (key, _) in VALID_KEYS {
            assert!(config_value(&config, key).is_some(), "{} has no value", key);
        }
    }
}
