//! `bms req` command - Requirement management

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{
    choice, delete_record, detail, detail_block, detail_footer, form_fields, open_service,
    print_list, print_record, print_saved, resolve_format, DeleteArgs, ShowArgs, WindowArgs,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::validation::parse_date;
use crate::core::ListFilter;
use crate::entities::{Requirement, RequirementPatch, RequirementPriority, RequirementStatus};

#[derive(Subcommand, Debug)]
pub enum ReqCommands {
    /// List requirements with filtering
    List(ListArgs),

    /// Create a new requirement
    New(NewArgs),

    /// Show a requirement's details
    Show(ShowArgs),

    /// Change fields of an existing requirement
    Edit(EditArgs),

    /// Delete a requirement
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', value_parser = choice::<RequirementStatus>)]
    pub status: Option<RequirementStatus>,

    /// Filter by priority
    #[arg(long, short = 'p', value_parser = choice::<RequirementPriority>)]
    pub priority: Option<RequirementPriority>,

    /// Search in title (case-insensitive substring)
    #[arg(long)]
    pub search: Option<String>,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Short title
    #[arg(long)]
    pub title: String,

    /// Full requirement text
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Priority (high/medium/low)
    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    /// Initial status
    #[arg(long, short = 's')]
    pub status: Option<String>,

    /// Change date, YYYY-MM-DD
    #[arg(long)]
    pub change_date: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Requirement id
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, short = 'p', value_parser = choice::<RequirementPriority>)]
    pub priority: Option<RequirementPriority>,

    #[arg(long, short = 's', value_parser = choice::<RequirementStatus>)]
    pub status: Option<RequirementStatus>,

    #[arg(long, value_parser = parse_date, conflicts_with = "clear_change_date")]
    pub change_date: Option<NaiveDate>,

    /// Remove the change date
    #[arg(long)]
    pub clear_change_date: bool,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("title", "TITLE", 44),
    ColumnDef::new("priority", "PRIORITY", 10),
    ColumnDef::new("status", "STATUS", 12),
    ColumnDef::new("change_date", "CHANGE", 10),
];

pub fn run(cmd: ReqCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReqCommands::List(args) => run_list(args, global),
        ReqCommands::New(args) => run_new(args, global),
        ReqCommands::Show(args) => run_show(args, global),
        ReqCommands::Edit(args) => run_edit(args, global),
        ReqCommands::Delete(args) => {
            let service = open_service(global)?;
            delete_record::<Requirement>(&service, &args, global)
        }
    }
}

fn row(req: &Requirement) -> TableRow {
    TableRow::new(req.id.unwrap_or_default())
        .cell("title", CellValue::Text(req.title.clone()))
        .cell("priority", CellValue::Level(req.priority.to_string()))
        .cell("status", CellValue::Status(req.status.to_string()))
        .cell(
            "change_date",
            req.change_date.map(CellValue::Date).unwrap_or(CellValue::Empty),
        )
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let filter = ListFilter::new()
        .eq_opt("status", args.status)
        .eq_opt("priority", args.priority)
        .search(args.search.unwrap_or_default());
    let reqs: Vec<Requirement> = service.list(&args.window.apply(filter))?;

    let format = resolve_format(global, service.config(), OutputFormat::Tsv);
    print_list(
        &reqs,
        format,
        TableFormatter::new(COLUMNS, "requirements"),
        &args.window,
        "bms req new --title <title>",
        row,
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let fields = form_fields([
        ("title", Some(args.title)),
        ("description", args.description),
        ("priority", args.priority),
        ("status", args.status),
        ("change_date", args.change_date),
    ]);
    let req: Requirement = service.create_from_fields(&fields)?;
    print_saved(&req, "Created", global)
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;
    let req: Requirement = service.get(args.id)?;

    let format = resolve_format(global, service.config(), OutputFormat::Auto);
    print_record(&req, format, |req| {
        println!("{}", style(&req.title).bold().underlined());
        println!();
        detail("ID", style(req.id.unwrap_or_default()).cyan());
        detail("Priority", CellValue::Level(req.priority.to_string()).format_tsv(0));
        detail("Status", CellValue::Status(req.status.to_string()).format_tsv(0));
        if let Some(date) = req.change_date {
            detail("Change date", date.format("%Y-%m-%d"));
        }
        detail_block("Description", &req.description);
        detail_footer(req);
    })
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let change_date = if args.clear_change_date {
        Some(None)
    } else {
        args.change_date.map(Some)
    };
    let patch = RequirementPatch {
        title: args.title,
        description: args.description,
        change_date,
        priority: args.priority,
        status: args.status,
    };
    let req: Requirement = service.update(args.id, patch)?;
    print_saved(&req, "Updated", global)
}
