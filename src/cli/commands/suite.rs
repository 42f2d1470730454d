//! `bms suite` command - Test suite results

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::{
    choice, delete_record, detail, detail_block, detail_footer, form_fields, open_service,
    print_list, print_record, print_saved, resolve_format, DeleteArgs, ShowArgs, WindowArgs,
};
use crate::cli::helpers::format_local;
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::ListFilter;
use crate::entities::{TestSuite, TestSuitePatch, TestSuiteStatus};

#[derive(Subcommand, Debug)]
pub enum SuiteCommands {
    /// List test suites with filtering
    List(ListArgs),

    /// Register a new test suite
    New(NewArgs),

    /// Show a suite's last result
    Show(ShowArgs),

    /// Change fields of an existing suite
    Edit(EditArgs),

    /// Mark a suite as running now
    Rerun(ShowArgs),

    /// Record the counts of a finished run (status follows from them)
    Record(RecordArgs),

    /// Delete a test suite
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', value_parser = choice::<TestSuiteStatus>)]
    pub status: Option<TestSuiteStatus>,

    /// Show only suites with failing tests
    #[arg(long)]
    pub failing: bool,

    /// Search in suite name (case-insensitive substring)
    #[arg(long)]
    pub search: Option<String>,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Suite name
    #[arg(long)]
    pub name: String,

    /// Passing tests in the last run
    #[arg(long)]
    pub passed: Option<String>,

    /// Failing tests in the last run
    #[arg(long)]
    pub failed: Option<String>,

    /// Status (default: derived from the counts)
    #[arg(long, short = 's')]
    pub status: Option<String>,

    /// When the suite last ran (RFC 3339 or YYYY-MM-DD HH:MM)
    #[arg(long)]
    pub last_run: Option<String>,

    /// Notes on fixes for failing tests
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Suite id
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, short = 's', value_parser = choice::<TestSuiteStatus>)]
    pub status: Option<TestSuiteStatus>,

    /// Replace the fix notes
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RecordArgs {
    /// Suite id
    pub id: i64,

    /// Passing tests
    #[arg(long)]
    pub passed: u32,

    /// Failing tests
    #[arg(long)]
    pub failed: u32,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("name", "NAME", 32),
    ColumnDef::new("status", "STATUS", 10),
    ColumnDef::new("passed", "PASS", 6),
    ColumnDef::new("failed", "FAIL", 6),
    ColumnDef::new("last_run", "LAST RUN", 16),
];

pub fn run(cmd: SuiteCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SuiteCommands::List(args) => run_list(args, global),
        SuiteCommands::New(args) => run_new(args, global),
        SuiteCommands::Show(args) => run_show(args, global),
        SuiteCommands::Edit(args) => run_edit(args, global),
        SuiteCommands::Rerun(args) => {
            let service = open_service(global)?;
            let suite = service.rerun_test_suite(args.id)?;
            print_saved(&suite, "Started", global)
        }
        SuiteCommands::Record(args) => {
            let service = open_service(global)?;
            let suite = service.record_test_run(args.id, args.passed, args.failed)?;
            print_saved(&suite, "Recorded run of", global)
        }
        SuiteCommands::Delete(args) => {
            let service = open_service(global)?;
            delete_record::<TestSuite>(&service, &args, global)
        }
    }
}

fn row(suite: &TestSuite) -> TableRow {
    TableRow::new(suite.id.unwrap_or_default())
        .cell("name", CellValue::Text(suite.name.clone()))
        .cell("status", CellValue::Status(suite.status.to_string()))
        .cell("passed", CellValue::Count(suite.pass_count))
        .cell("failed", CellValue::Count(suite.fail_count))
        .cell(
            "last_run",
            suite.last_run.map(CellValue::DateTime).unwrap_or(CellValue::Empty),
        )
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let filter = ListFilter::new()
        .eq_opt("status", args.status)
        .search(args.search.unwrap_or_default());
    let mut suites: Vec<TestSuite> = service.list(&args.window.apply(filter))?;
    if args.failing {
        suites.retain(|s| s.fail_count > 0);
    }

    let format = resolve_format(global, service.config(), OutputFormat::Tsv);
    print_list(
        &suites,
        format,
        TableFormatter::new(COLUMNS, "test suites"),
        &args.window,
        "bms suite new --name <name>",
        row,
    )
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let status = args.status.or_else(|| {
        // Derive from the counts when both parse; bad counts are reported below
        let passed = args.passed.as_deref().map_or(Some(0), |p| p.trim().parse().ok())?;
        let failed = args.failed.as_deref().map_or(Some(0), |f| f.trim().parse().ok())?;
        Some(TestSuiteStatus::from_counts(passed, failed).to_string())
    });
    let fields = form_fields([
        ("name", Some(args.name)),
        ("pass_count", args.passed),
        ("fail_count", args.failed),
        ("status", status),
        ("last_run", args.last_run),
        ("fix_notes", args.notes),
    ]);
    let suite: TestSuite = service.create_from_fields(&fields)?;
    print_saved(&suite, "Created", global)
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;
    let suite: TestSuite = service.get(args.id)?;

    let format = resolve_format(global, service.config(), OutputFormat::Auto);
    print_record(&suite, format, |suite| {
        println!("{}", style(&suite.name).bold().underlined());
        println!();
        detail("ID", style(suite.id.unwrap_or_default()).cyan());
        detail("Status", CellValue::Status(suite.status.to_string()).format_tsv(0));
        detail(
            "Results",
            format!(
                "{} passed, {} failed ({} total)",
                style(suite.pass_count).green(),
                style(suite.fail_count).red(),
                suite.total()
            ),
        );
        match suite.last_run {
            Some(ref ts) => detail("Last run", format_local(ts)),
            None => detail("Last run", style("never").dim()),
        }
        detail_block("Fix notes", &suite.fix_notes);
        detail_footer(suite);
    })
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let service = open_service(global)?;

    let patch = TestSuitePatch {
        name: args.name,
        status: args.status,
        fix_notes: args.notes,
        ..Default::default()
    };
    let suite: TestSuite = service.update(args.id, patch)?;
    print_saved(&suite, "Updated", global)
}
