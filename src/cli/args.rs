//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, config::ConfigCommands, db::DbCommands, export::ExportArgs,
    handover::HandoverCommands, import::ImportArgs, init::InitArgs, issue::IssueCommands,
    mail::MailCommands, req::ReqCommands, status::StatusArgs, suite::SuiteCommands,
};

#[derive(Parser)]
#[command(name = "bms")]
#[command(author, version, about = "Business Management System")]
#[command(long_about = "Business Management System: track handovers, requirements, issues and test-suite results in a local SQLite database.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (info-level logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Database file (default: from config, then the platform data directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database (and its directory) if it does not exist
    Init(InitArgs),

    /// Team handover management
    #[command(subcommand, visible_alias = "handover")]
    Ho(HandoverCommands),

    /// Requirement management
    #[command(subcommand)]
    Req(ReqCommands),

    /// Issue tracking
    #[command(subcommand)]
    Issue(IssueCommands),

    /// Test suite results
    #[command(subcommand)]
    Suite(SuiteCommands),

    /// Dashboard: headline counts, status breakdown and recent activity
    Status(StatusArgs),

    /// Export records or the dashboard to CSV
    Export(ExportArgs),

    /// Import records from a CSV file
    Import(ImportArgs),

    /// Back up, restore or clear the database
    #[command(subcommand)]
    Db(DbCommands),

    /// Show and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Compose and send account emails
    #[command(subcommand)]
    Mail(MailCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Output format for list and show commands
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Auto-detect: table for lists, details for single records
    #[default]
    Auto,
    /// YAML format
    Yaml,
    /// Aligned columns (human readable)
    Tsv,
    /// JSON format (for programmatic use)
    Json,
    /// CSV format (same layout as `bms export`)
    Csv,
    /// Markdown table
    Md,
    /// Just record ids, one per line
    Id,
}
