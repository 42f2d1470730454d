//! `bms status` command - Dashboard

use console::style;
use miette::{IntoDiagnostic, Result};
use std::io;
use tabled::{builder::Builder, settings::Style};

use crate::cli::commands::utils::{open_service, resolve_format};
use crate::cli::helpers::{format_local, humanize, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::export::write_dashboard_csv;
use crate::core::Dashboard;

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Recent activities to show (default: dashboard_limit from config, 5)
    #[arg(long, value_name = "N")]
    pub recent: Option<usize>,
}

pub fn run(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;
    let limit = args
        .recent
        .unwrap_or_else(|| service.config().dashboard_limit());
    let dashboard = service.dashboard(limit)?;

    match resolve_format(global, service.config(), OutputFormat::Auto) {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&dashboard).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(&dashboard).into_diagnostic()?;
            print!("{}", yaml);
        }
        OutputFormat::Csv => write_dashboard_csv(&dashboard, io::stdout().lock())?,
        OutputFormat::Md => print!("{}", render_markdown(&dashboard)),
        _ => print_dashboard(&dashboard),
    }
    Ok(())
}

fn stats_table(dashboard: &Dashboard) -> Builder {
    let mut builder = Builder::default();
    builder.push_record(["Metric", "Count"]);
    for (label, count) in dashboard.stats.rows() {
        builder.push_record([label.to_string(), count.to_string()]);
    }
    builder
}

fn recent_table(dashboard: &Dashboard, title_width: usize) -> Builder {
    let mut builder = Builder::default();
    builder.push_record(["Type", "ID", "Title", "Status", "Updated"]);
    for activity in &dashboard.recent {
        builder.push_record([
            activity.kind.label().to_string(),
            activity.id.to_string(),
            truncate_str(&activity.title, title_width),
            humanize(&activity.status),
            format_local(&activity.updated_at),
        ]);
    }
    builder
}

fn breakdown_table(dashboard: &Dashboard) -> Builder {
    let mut builder = Builder::default();
    builder.push_record(["Type", "Status", "Count"]);
    for (kind, counts) in &dashboard.status_counts {
        for (status, count) in counts {
            builder.push_record([
                kind.label().to_string(),
                humanize(status),
                count.to_string(),
            ]);
        }
    }
    builder
}

/// Dashboard as a Markdown document
pub fn render_markdown(dashboard: &Dashboard) -> String {
    let mut output = String::new();
    output.push_str("# BMS Dashboard\n\n");
    output.push_str("## Statistics\n\n");
    output.push_str(&stats_table(dashboard).build().with(Style::markdown()).to_string());
    output.push_str("\n\n## Status Breakdown\n\n");
    output.push_str(&breakdown_table(dashboard).build().with(Style::markdown()).to_string());
    output.push_str("\n\n## Recent Activity\n\n");
    if dashboard.recent.is_empty() {
        output.push_str("_No activity yet._\n");
    } else {
        output.push_str(&recent_table(dashboard, 60).build().with(Style::markdown()).to_string());
        output.push('\n');
    }
    output
}

fn print_dashboard(dashboard: &Dashboard) {
    println!("{}", style("BMS Dashboard").bold().underlined());
    println!();

    let stats = &dashboard.stats;
    let highlight = |n: usize| {
        if n == 0 {
            style(n.to_string()).green()
        } else {
            style(n.to_string()).yellow().bold()
        }
    };
    println!("  {:<22} {}", "Pending handovers", highlight(stats.pending_handovers));
    println!("  {:<22} {}", "Open issues", highlight(stats.open_issues));
    println!("  {:<22} {}", "Failed test suites", highlight(stats.failed_suites));
    println!(
        "  {:<22} {}",
        "Total requirements",
        style(stats.total_requirements).cyan()
    );

    let has_records = dashboard.status_counts.values().any(|c| !c.is_empty());
    if has_records {
        println!();
        println!("{}", style("By status").bold());
        println!("{}", breakdown_table(dashboard).build().with(Style::rounded()));
    }

    println!();
    println!("{}", style("Recent activity").bold());
    if dashboard.recent.is_empty() {
        println!("  {}", style("No activity yet.").dim());
    } else {
        println!("{}", recent_table(dashboard, 40).build().with(Style::rounded()));
    }
}
