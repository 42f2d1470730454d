//! `bms ho` command - Team handover management

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{
    choice, delete_record, detail, detail_block, detail_footer, form_fields, open_service,
    print_list, print_record, print_saved, resolve_format, DeleteArgs, ShowArgs, WindowArgs,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::store::columns::format_date;
use crate::core::validation::parse_date;
use crate::core::ListFilter;
use crate::entities::handover::split_documents;
use crate::entities::{Handover, HandoverPatch, HandoverStatus};

#[derive(Subcommand, Debug)]
pub enum HandoverCommands {
    /// List handovers with filtering
    List(ListArgs),

    /// Record a new handover
    New(NewArgs),

    /// Show a handover's details
    Show(ShowArgs),

    /// Change fields of an existing handover
    Edit(EditArgs),

    /// Delete a handover
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', value_parser = choice::<HandoverStatus>)]
    pub status: Option<HandoverStatus>,

    /// Filter by who handed over (exact match)
    #[arg(long)]
    pub from: Option<String>,

    /// Filter by who received (exact match)
    #[arg(long)]
    pub to: Option<String>,

    /// Search in title (case-insensitive substring)
    #[arg(long)]
    pub search: Option<String>,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Title (default: "<from> → <to>")
    #[arg(long)]
    pub title: Option<String>,

    /// Person or team handing over
    #[arg(long)]
    pub from: String,

    /// Person or team receiving
    #[arg(long)]
    pub to: String,

    /// Handover date, YYYY-MM-DD (default: today)
    #[arg(long)]
    pub date: Option<String>,

    /// Initial status (pending, in_progress, completed, blocked)
    #[arg(long, short = 's')]
    pub status: Option<String>,

    /// Notes for the receiver
    #[arg(long)]
    pub notes: Option<String>,

    /// Attached document (repeatable, or comma/semicolon separated)
    #[arg(long = "doc", value_name = "NAME")]
    pub documents: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Handover id
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub from: Option<String>,

    #[arg(long)]
    pub to: Option<String>,

    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    #[arg(long, short = 's', value_parser = choice::<HandoverStatus>)]
    pub status: Option<HandoverStatus>,

    #[arg(long)]
    pub notes: Option<String>,

    /// Replace the document list (comma/semicolon separated; "" clears it)
    #[arg(long)]
    pub docs: Option<String>,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("title", "TITLE", 36),
    ColumnDef::new("from", "FROM", 16),
    ColumnDef::new("to", "TO", 16),
    ColumnDef::new("date", "DATE", 10),
    ColumnDef::new("status", "STATUS", 12),
    ColumnDef::new("docs", "DOCS", 5),
];

pub fn run(cmd: HandoverCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        HandoverCommands::List(args) => run_list(args, global),
        HandoverCommands::New(args) => run_new(args, global),
        HandoverCommands::Show(args) => run_show(args, global),
        HandoverCommands::Edit(args) => run_edit(args, global),
        HandoverCommands::Delete(args) => {
            let service = open_service(global)?;
            delete_record::<Handover>(&service, &args, global)
        }
    }
}

fn row(ho: &Handover) -> TableRow {
    TableRow::new(ho.id.unwrap_or_default())
        .cell("title", CellValue::Text(ho.title.clone()))
        .cell("from", CellValue::Text(ho.from_person.clone()))
        .cell("to", CellValue::Text(ho.to_person.clone()))
        .cell("date", CellValue::Date(ho.date))
        .cell("status", CellValue::Status(ho.status.to_string()))
        .cell("docs", CellValue::Count(ho.documents.len() as u32))
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let filter = ListFilter::new()
        .eq_opt("status", args.status)
        .eq_opt("from_person", args.from)
        .eq_opt("to_person", args.to)
        .search(args.search.unwrap_or_default());
    let handovers: Vec<Handover> = service.list(&args.window.apply(filter))?;

    let format = resolve_format(global, service.config(), OutputFormat::Tsv);
    print_list(
        &handovers,
        format,
        TableFormatter::new(COLUMNS, "handovers"),
        &args.window,
        "bms ho new --from <who> --to <who>",
        row,
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let date = args
        .date
        .unwrap_or_else(|| format_date(&Local::now().date_naive()));
    let fields = form_fields([
        ("title", args.title),
        ("from_person", Some(args.from)),
        ("to_person", Some(args.to)),
        ("date", Some(date)),
        ("status", args.status),
        ("notes", args.notes),
        ("documents", Some(args.documents.join("; "))),
    ]);

    let handover: Handover = service.create_from_fields(&fields)?;
    print_saved(&handover, "Created", global)
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;
    let handover: Handover = service.get(args.id)?;

    let format = resolve_format(global, service.config(), OutputFormat::Auto);
    print_record(&handover, format, |ho| {
        println!("{}", style(&ho.title).bold().underlined());
        println!();
        detail("ID", style(ho.id.unwrap_or_default()).cyan());
        detail("From", &ho.from_person);
        detail("To", &ho.to_person);
        detail("Date", ho.date.format("%Y-%m-%d"));
        detail("Status", CellValue::Status(ho.status.to_string()).format_tsv(0));
        if !ho.documents.is_empty() {
            println!();
            println!("{}", style("Documents").bold());
            for doc in &ho.documents {
                println!("  • {}", doc);
            }
        }
        detail_block("Notes", &ho.notes);
        detail_footer(ho);
    })
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let patch = HandoverPatch {
        title: args.title,
        from_person: args.from,
        to_person: args.to,
        date: args.date,
        status: args.status,
        notes: args.notes,
        documents: args.docs.as_deref().map(split_documents),
    };
    let handover: Handover = service.update(args.id, patch)?;
    print_saved(&handover, "Updated", global)
}
