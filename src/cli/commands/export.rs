//! `bms export` command - CSV export of records and the dashboard

use chrono::Utc;
use clap::ValueEnum;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::cli::commands::utils::open_service;
use crate::cli::GlobalOpts;
use crate::core::export::{export_filename, write_csv, write_dashboard_csv};
use crate::core::{BmsService, ListFilter, Record};
use crate::entities::{Handover, Issue, Requirement, TestSuite};

/// What to export
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ExportKind {
    Handovers,
    Requirements,
    Issues,
    #[value(alias = "suites")]
    TestSuites,
    Dashboard,
}

impl ExportKind {
    /// Prefix of the generated file name
    fn file_prefix(&self) -> &'static str {
        match self {
            ExportKind::Handovers => "handovers",
            ExportKind::Requirements => "requirements",
            ExportKind::Issues => "issues",
            ExportKind::TestSuites => "test_suites",
            ExportKind::Dashboard => "dashboard",
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// What to export
    #[arg(value_enum)]
    pub kind: ExportKind,

    /// Output file ("-" for stdout; default: <kind>_export_<timestamp>.csv)
    #[arg(long, short = 'o', conflicts_with = "dir")]
    pub output: Option<PathBuf>,

    /// Directory for the generated file name
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Recent activities in a dashboard export (default: from config)
    #[arg(long, value_name = "N")]
    pub recent: Option<usize>,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let path = match args.output {
        Some(ref path) if path.as_os_str() == "-" => None,
        Some(path) => Some(path),
        None => {
            let name = export_filename(args.kind.file_prefix(), Utc::now());
            Some(args.dir.unwrap_or_default().join(name))
        }
    };

    match path {
        None => {
            let stdout = io::stdout();
            export(&service, args.kind, args.recent, stdout.lock())?;
        }
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).into_diagnostic()?;
            }
            let file = File::create(&path).into_diagnostic()?;
            let count = export(&service, args.kind, args.recent, BufWriter::new(file))?;
            report(&path, args.kind, count, global);
        }
    }
    Ok(())
}

/// Write the export to `writer`; returns the number of data rows
fn export<W: Write>(
    service: &BmsService,
    kind: ExportKind,
    recent: Option<usize>,
    writer: W,
) -> Result<usize> {
    match kind {
        ExportKind::Handovers => export_records::<Handover, W>(service, writer),
        ExportKind::Requirements => export_records::<Requirement, W>(service, writer),
        ExportKind::Issues => export_records::<Issue, W>(service, writer),
        ExportKind::TestSuites => export_records::<TestSuite, W>(service, writer),
        ExportKind::Dashboard => {
            let limit = recent.unwrap_or_else(|| service.config().dashboard_limit());
            let dashboard = service.dashboard(limit)?;
            write_dashboard_csv(&dashboard, writer)?;
            Ok(dashboard.recent.len())
        }
    }
}

fn export_records<R: Record, W: Write>(service: &BmsService, writer: W) -> Result<usize> {
    let records: Vec<R> = service.list(&ListFilter::new())?;
    write_csv(&records, writer)?;
    Ok(records.len())
}

fn report(path: &Path, kind: ExportKind, count: usize, global: &GlobalOpts) {
    if global.quiet {
        println!("{}", path.display());
        return;
    }
    let what = match kind {
        ExportKind::Dashboard => format!("dashboard ({} recent activities)", count),
        _ => format!("{} {}", count, kind.file_prefix().replace('_', " ")),
    };
    println!(
        "{} Exported {} to {}",
        style("✓").green(),
        what,
        style(path.display()).cyan()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::IssueType;

    #[test]
    fn test_export_records_counts_rows() {
        let service = BmsService::in_memory().unwrap();
        service
            .create(Issue::new("VPN down", "", IssueType::Infrastructure))
            .unwrap();
        service
            .create(Issue::new("Slow login", "", IssueType::Performance))
            .unwrap();

        let mut out = Vec::new();
        let count = export(&service, ExportKind::Issues, None, &mut out).unwrap();
        assert_eq!(count, 2);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_export_dashboard_of_empty_store() {
        let service = BmsService::in_memory().unwrap();
        let mut out = Vec::new();
        let count = export(&service, ExportKind::Dashboard, Some(3), &mut out).unwrap();
        assert_eq!(count, 0);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("DASHBOARD STATISTICS\n"));
        assert!(text.contains("RECENT ACTIVITIES\nType,ID,Title,Status,Updated\n"));
    }
}
