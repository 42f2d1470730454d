use clap::Parser;
use env_logger::Env;
use miette::Result;

use bms::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE so piping into `head` or `grep -q` exits quietly instead of panicking.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    // RUST_LOG wins over --verbose
    let level = if global.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Init(args) => bms::cli::commands::init::run(args, &global),
        Commands::Ho(cmd) => bms::cli::commands::handover::run(cmd, &global),
        Commands::Req(cmd) => bms::cli::commands::req::run(cmd, &global),
        Commands::Issue(cmd) => bms::cli::commands::issue::run(cmd, &global),
        Commands::Suite(cmd) => bms::cli::commands::suite::run(cmd, &global),
        Commands::Status(args) => bms::cli::commands::status::run(args, &global),
        Commands::Export(args) => bms::cli::commands::export::run(args, &global),
        Commands::Import(args) => bms::cli::commands::import::run(args, &global),
        Commands::Db(cmd) => bms::cli::commands::db::run(cmd, &global),
        Commands::Config(cmd) => bms::cli::commands::config::run(cmd, &global),
        Commands::Mail(cmd) => bms::cli::commands::mail::run(cmd, &global),
        Commands::Completions(args) => bms::cli::commands::completions::run(args),
    }
}
