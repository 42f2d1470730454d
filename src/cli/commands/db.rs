//! `bms db` command - Backups, restore and clearing the database

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::utils::{confirm, load_config};
use crate::cli::helpers::format_local;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::backup::{cleanup_old_backups, create_backup, list_backups};
use crate::core::Store;

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Write a timestamped backup, then prune old ones
    Backup(BackupArgs),

    /// List backups, newest first
    List(ListArgs),

    /// Replace the database with a backup
    Restore(RestoreArgs),

    /// Delete every record (ids are not reused afterwards)
    Clear(ClearArgs),
}

#[derive(clap::Args, Debug)]
pub struct BackupArgs {
    /// Backup directory (default: backup_dir from config)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Backups to keep after this one (default: backup_keep from config, 10)
    #[arg(long, value_name = "N")]
    pub keep: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Backup directory (default: backup_dir from config)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct RestoreArgs {
    /// Backup file to restore from
    pub file: PathBuf,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Do not back up the current database first
    #[arg(long)]
    pub no_backup: bool,
}

#[derive(clap::Args, Debug)]
pub struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

pub fn run(cmd: DbCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DbCommands::Backup(args) => run_backup(args, global),
        DbCommands::List(args) => run_list(args, global),
        DbCommands::Restore(args) => run_restore(args, global),
        DbCommands::Clear(args) => run_clear(args, global),
    }
}

fn run_backup(args: BackupArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let dir = args.dir.unwrap_or_else(|| config.backup_dir());
    let keep = args.keep.unwrap_or_else(|| config.backup_keep()).max(1);

    let store = Store::open(&config.database_path())?;
    let path = create_backup(&store, &dir)?;
    let removed = cleanup_old_backups(&dir, keep)?;

    if global.quiet {
        println!("{}", path.display());
        return Ok(());
    }
    println!(
        "{} Backed up {} records to {}",
        style("✓").green(),
        store.total_records()?,
        style(path.display()).cyan()
    );
    if !removed.is_empty() {
        println!("  Removed {} old backup(s), keeping {}", removed.len(), keep);
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let dir = args.dir.unwrap_or_else(|| config.backup_dir());
    let backups = list_backups(&dir)?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&backups).into_diagnostic()?);
            return Ok(());
        }
        OutputFormat::Id => {
            for backup in &backups {
                println!("{}", backup.path.display());
            }
            return Ok(());
        }
        _ => {}
    }

    if backups.is_empty() {
        println!("No backups in {}", style(dir.display()).cyan());
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["File", "Size", "Created", "Records"]);
    for backup in &backups {
        let (created, records) = match &backup.metadata {
            Some(meta) => (format_local(&meta.created_at), meta.records.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        builder.push_record([
            backup.file_name(),
            format!("{} KB", backup.size.div_ceil(1024)),
            created,
            records,
        ]);
    }
    let mut table = builder.build();
    match global.format {
        OutputFormat::Md => table.with(Style::markdown()),
        _ => table.with(Style::rounded()),
    };
    println!("{}", table);
    if !global.quiet {
        println!();
        println!("{} backup(s) in {}", style(backups.len()).cyan(), dir.display());
    }
    Ok(())
}

fn run_restore(args: RestoreArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let db = config.database_path();
    if !args.file.is_file() {
        return Err(miette::miette!("Backup {} not found", args.file.display()));
    }

    let prompt = format!("Replace {} with {}?", db.display(), args.file.display());
    if !args.yes && !confirm(&prompt, "restore over the current database")? {
        println!("Cancelled.");
        return Ok(());
    }

    let mut store = Store::open(&db)?;
    if !args.no_backup {
        let safety = create_backup(&store, &config.backup_dir())?;
        if !global.quiet {
            println!("  Current database saved to {}", style(safety.display()).dim());
        }
    }

    store.restore_from(&args.file)?;
    if !global.quiet {
        println!(
            "{} Restored {} records from {}",
            style("✓").green(),
            store.total_records()?,
            style(args.file.display()).cyan()
        );
    }
    Ok(())
}

fn run_clear(args: ClearArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let store = Store::open(&config.database_path())?;
    let total = store.total_records()?;

    let prompt = format!("Permanently delete all {} records?", total);
    if !args.yes && !confirm(&prompt, "clear the database")? {
        println!("Cancelled.");
        return Ok(());
    }

    let removed = store.clear()?;
    if !global.quiet {
        println!("{} Cleared {} records", style("✓").green(), removed);
    }
    Ok(())
}
