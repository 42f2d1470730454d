//! `bms issue` command - Issue tracking

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{
    choice, delete_record, detail, detail_block, detail_footer, form_fields, open_service,
    print_list, print_record, print_saved, resolve_format, DeleteArgs, ShowArgs, WindowArgs,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::ListFilter;
use crate::entities::issue::UNASSIGNED;
use crate::entities::{Issue, IssuePatch, IssueSeverity, IssueStatus, IssueType};

#[derive(Subcommand, Debug)]
pub enum IssueCommands {
    /// List issues with filtering
    List(ListArgs),

    /// Report a new issue
    New(NewArgs),

    /// Show an issue's details
    Show(ShowArgs),

    /// Change fields of an existing issue
    Edit(EditArgs),

    /// Assign an issue to someone (or back to nobody)
    Assign(AssignArgs),

    /// Delete an issue
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by issue type
    #[arg(long, short = 't', value_parser = choice::<IssueType>)]
    pub r#type: Option<IssueType>,

    /// Filter by severity
    #[arg(long, value_parser = choice::<IssueSeverity>)]
    pub severity: Option<IssueSeverity>,

    /// Filter by status
    #[arg(long, short = 's', value_parser = choice::<IssueStatus>, conflicts_with = "active")]
    pub status: Option<IssueStatus>,

    /// Show only open and in-progress issues
    #[arg(long)]
    pub active: bool,

    /// Filter by assignee (exact match)
    #[arg(long)]
    pub assignee: Option<String>,

    /// Search in title (case-insensitive substring)
    #[arg(long)]
    pub search: Option<String>,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Short summary
    #[arg(long)]
    pub title: String,

    /// Issue type (infrastructure, test_environment, application, performance, security)
    #[arg(long, short = 't')]
    pub r#type: String,

    /// What happened
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Severity (critical/high/medium/low)
    #[arg(long)]
    pub severity: Option<String>,

    /// Initial status
    #[arg(long, short = 's')]
    pub status: Option<String>,

    /// Who raised it
    #[arg(long)]
    pub reporter: Option<String>,

    /// Owner (default: Unassigned)
    #[arg(long)]
    pub assignee: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Issue id
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, short = 't', value_parser = choice::<IssueType>)]
    pub r#type: Option<IssueType>,

    #[arg(long, value_parser = choice::<IssueSeverity>)]
    pub severity: Option<IssueSeverity>,

    #[arg(long, short = 's', value_parser = choice::<IssueStatus>)]
    pub status: Option<IssueStatus>,

    #[arg(long, conflicts_with = "clear_reporter")]
    pub reporter: Option<String>,

    /// Remove the reporter
    #[arg(long)]
    pub clear_reporter: bool,
}

#[derive(clap::Args, Debug)]
pub struct AssignArgs {
    /// Issue id
    pub id: i64,

    /// New owner; omit to unassign
    pub assignee: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("title", "TITLE", 36),
    ColumnDef::new("type", "TYPE", 16),
    ColumnDef::new("severity", "SEVERITY", 10),
    ColumnDef::new("status", "STATUS", 12),
    ColumnDef::new("assignee", "ASSIGNEE", 16),
];

pub fn run(cmd: IssueCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        IssueCommands::List(args) => run_list(args, global),
        IssueCommands::New(args) => run_new(args, global),
        IssueCommands::Show(args) => run_show(args, global),
        IssueCommands::Edit(args) => run_edit(args, global),
        IssueCommands::Assign(args) => run_assign(args, global),
        IssueCommands::Delete(args) => {
            let service = open_service(global)?;
            delete_record::<Issue>(&service, &args, global)
        }
    }
}

fn row(issue: &Issue) -> TableRow {
    let assignee = if issue.assigned_to == UNASSIGNED {
        CellValue::Empty
    } else {
        CellValue::Text(issue.assigned_to.clone())
    };
    TableRow::new(issue.id.unwrap_or_default())
        .cell("title", CellValue::Text(issue.title.clone()))
        .cell("type", CellValue::Text(issue.issue_type.to_string()))
        .cell("severity", CellValue::Level(issue.severity.to_string()))
        .cell("status", CellValue::Status(issue.status.to_string()))
        .cell("assignee", assignee)
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let filter = ListFilter::new()
        .eq_opt("issue_type", args.r#type)
        .eq_opt("severity", args.severity)
        .eq_opt("status", args.status)
        .eq_opt("assigned_to", args.assignee)
        .search(args.search.unwrap_or_default());
    let mut issues: Vec<Issue> = service.list(&args.window.apply(filter))?;
    if args.active {
        issues.retain(|i| i.status.is_active());
    }

    let format = resolve_format(global, service.config(), OutputFormat::Tsv);
    print_list(
        &issues,
        format,
        TableFormatter::new(COLUMNS, "issues"),
        &args.window,
        "bms issue new --title <title> --type <type>",
        row,
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let fields = form_fields([
        ("title", Some(args.title)),
        ("issue_type", Some(args.r#type)),
        ("description", args.description),
        ("severity", args.severity),
        ("status", args.status),
        ("reporter", args.reporter),
        ("assigned_to", args.assignee),
    ]);
    let issue: Issue = service.create_from_fields(&fields)?;
    print_saved(&issue, "Created", global)
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;
    let issue: Issue = service.get(args.id)?;

    let format = resolve_format(global, service.config(), OutputFormat::Auto);
    print_record(&issue, format, |issue| {
        println!("{}", style(&issue.title).bold().underlined());
        println!();
        detail("ID", style(issue.id.unwrap_or_default()).cyan());
        detail("Type", issue.issue_type);
        detail("Severity", CellValue::Level(issue.severity.to_string()).format_tsv(0));
        detail("Status", CellValue::Status(issue.status.to_string()).format_tsv(0));
        detail("Assigned to", &issue.assigned_to);
        if let Some(ref reporter) = issue.reporter {
            detail("Reporter", reporter);
        }
        detail_block("Description", &issue.description);
        detail_footer(issue);
    })
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let reporter = if args.clear_reporter {
        Some(None)
    } else {
        args.reporter.map(Some)
    };
    let patch = IssuePatch {
        title: args.title,
        description: args.description,
        issue_type: args.r#type,
        severity: args.severity,
        status: args.status,
        reporter,
        assigned_to: None,
    };
    let issue: Issue = service.update(args.id, patch)?;
    print_saved(&issue, "Updated", global)
}

fn run_assign(args: AssignArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let assignee = args
        .assignee
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| UNASSIGNED.to_string());
    let patch = IssuePatch {
        assigned_to: Some(assignee),
        ..Default::default()
    };
    let issue: Issue = service.update(args.id, patch)?;
    print_saved(&issue, "Assigned", global)
}
