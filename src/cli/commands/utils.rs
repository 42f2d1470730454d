//! Shared utilities for CLI commands

use clap::ValueEnum;
use console::{style, Term};
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};
use std::io;
use std::str::FromStr;

use crate::cli::helpers::format_local;
use crate::cli::table::{TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::export::write_csv;
use crate::core::validation::Fields;
use crate::core::{BmsService, Config, ListFilter, Record, SortOrder};

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Record id
    pub id: i64,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Record id
    pub id: i64,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Window options shared by every `list` subcommand
#[derive(clap::Args, Debug, Default)]
pub struct WindowArgs {
    /// Show only the N most recently created
    #[arg(long, value_name = "N")]
    pub recent: Option<usize>,

    /// Limit output to N items
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show count only, not the items
    #[arg(long)]
    pub count: bool,

    /// Wrap text columns at this width instead of truncating
    #[arg(long, short = 'w', value_name = "WIDTH")]
    pub wrap: Option<usize>,
}

impl WindowArgs {
    /// Apply `--recent` / `--limit` to a filter
    pub fn apply(&self, filter: ListFilter) -> ListFilter {
        let filter = match self.recent {
            Some(n) => filter.order(SortOrder::Newest).limit(n),
            None => filter,
        };
        match (self.recent, self.limit) {
            (Some(n), Some(limit)) => filter.limit(n.min(limit)),
            (None, Some(limit)) => filter.limit(limit),
            _ => filter,
        }
    }
}

/// clap value parser for record enums (`"In Progress"` is accepted)
pub fn choice<T: FromStr<Err = String>>(value: &str) -> std::result::Result<T, String> {
    value.parse()
}

/// Form fields from optional CLI values, skipping the absent ones
pub fn form_fields<'a>(values: impl IntoIterator<Item = (&'a str, Option<String>)>) -> Fields {
    values
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
}

/// Load configuration and apply the global `--db` flag
pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(ref db) = global.db {
        config.database_path = Some(db.clone());
    }
    Ok(config)
}

/// Open the service against the configured database
pub fn open_service(global: &GlobalOpts) -> Result<BmsService> {
    let config = load_config(global)?;
    Ok(BmsService::open(config)?)
}

/// Resolve `auto` through the configured default, then `fallback`
pub fn resolve_format(global: &GlobalOpts, config: &Config, fallback: OutputFormat) -> OutputFormat {
    if global.format != OutputFormat::Auto {
        return global.format;
    }
    config
        .default_format
        .as_deref()
        .and_then(|f| <OutputFormat as ValueEnum>::from_str(f, true).ok())
        .filter(|f| *f != OutputFormat::Auto)
        .unwrap_or(fallback)
}

/// Print a list of records in the requested format
pub fn print_list<R: Record>(
    records: &[R],
    format: OutputFormat,
    formatter: TableFormatter<'_>,
    window: &WindowArgs,
    new_hint: &str,
    row: impl Fn(&R) -> TableRow,
) -> Result<()> {
    if window.count {
        println!("{}", records.len());
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(records).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&records).into_diagnostic()?;
            print!("{}", yaml);
        }
        // Full records, importable with `bms import`
        OutputFormat::Csv => write_csv(records, io::stdout().lock())?,
        OutputFormat::Tsv | OutputFormat::Auto if records.is_empty() => {
            println!("No {}s found.", R::KIND);
            println!();
            println!("Create one with: {}", style(new_hint).yellow());
        }
        _ => {
            let config = match window.wrap {
                Some(width) => TableConfig::with_wrap(width),
                None if format == OutputFormat::Tsv || format == OutputFormat::Auto => {
                    TableConfig::default()
                }
                None => TableConfig::for_pipe(),
            };
            formatter
                .with_config(config)
                .output(records.iter().map(row), format);
        }
    }
    Ok(())
}

/// Print one record; `details` renders the human-readable view
pub fn print_record<R: Record>(record: &R, format: OutputFormat, details: impl Fn(&R)) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(record).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(record).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Csv => write_csv(std::slice::from_ref(record), io::stdout().lock())?,
        OutputFormat::Id => println!("{}", record.id().unwrap_or_default()),
        _ => details(record),
    }
    Ok(())
}

/// Report a created or updated record
pub fn print_saved<R: Record>(record: &R, verb: &str, global: &GlobalOpts) -> Result<()> {
    let id = record.id().unwrap_or_default();
    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => print_record(record, global.format, |_| {}),
        _ if global.quiet || global.format == OutputFormat::Id => {
            println!("{}", id);
            Ok(())
        }
        _ => {
            println!(
                "{} {} {} {}: {}",
                style("✓").green(),
                verb,
                R::KIND,
                style(id).cyan(),
                style(record.title()).yellow()
            );
            Ok(())
        }
    }
}

/// Print a `label: value` detail line
pub fn detail(label: &str, value: impl std::fmt::Display) {
    println!("{:<14} {}", style(format!("{}:", label)).bold(), value);
}

/// Print a multi-line text block under a heading, skipped when blank
pub fn detail_block(label: &str, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    println!();
    println!("{}", style(label).bold());
    for line in text.lines() {
        println!("  {}", line);
    }
}

/// Print the created/updated footer shared by every detail view
pub fn detail_footer<R: Record>(record: &R) {
    println!();
    if let Some(created) = record.created_at() {
        detail("Created", style(format_local(&created)).dim());
    }
    if let Some(updated) = record.updated_at() {
        detail("Updated", style(format_local(&updated)).dim());
    }
}

/// Ask before a destructive `action`; off a terminal the answer is an error
pub fn confirm(prompt: &str, action: &str) -> Result<bool> {
    if !Term::stderr().is_term() {
        return Err(miette::miette!(
            "Refusing to {} without confirmation; pass --yes",
            action
        ));
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .into_diagnostic()
}

/// Delete a record after confirming with the user
pub fn delete_record<R: Record>(service: &BmsService, args: &DeleteArgs, global: &GlobalOpts) -> Result<()> {
    let record: R = service.get(args.id)?;

    let prompt = format!("Delete {} {} '{}'?", R::KIND, args.id, record.title());
    let action = format!("delete {} {}", R::KIND, args.id);
    if !args.yes && !confirm(&prompt, &action)? {
        println!("Cancelled.");
        return Ok(());
    }

    service.delete::<R>(args.id)?;
    if !global.quiet {
        println!(
            "{} Deleted {} {}",
            style("✓").green(),
            R::KIND,
            style(args.id).cyan()
        );
    }
    Ok(())
}
