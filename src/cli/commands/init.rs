//! `bms init` command - Create the BMS database

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::commands::utils::load_config;
use crate::cli::GlobalOpts;
use crate::core::Store;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Database file to create (default: the configured database)
    pub path: Option<PathBuf>,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = match args.path {
        Some(path) => path,
        None => load_config(global)?.database_path(),
    };
    let existed = path.exists();

    let store = Store::open(&path)?;
    let version = store.schema_version()?;
    log::info!("database {} at schema version {}", path.display(), version);

    if global.quiet {
        return Ok(());
    }

    if existed {
        println!(
            "{} BMS database already exists at {} (schema v{})",
            style("!").yellow(),
            style(path.display()).cyan(),
            version
        );
        return Ok(());
    }

    println!(
        "{} Initialized BMS database at {}",
        style("✓").green(),
        style(path.display()).cyan()
    );
    println!("  Schema version {}", version);
    println!();
    println!("Next steps:");
    println!("  {} Record a team handover", style("bms ho new --from <who> --to <who>").yellow());
    println!("  {} Log an issue", style("bms issue new --title <title> --type application").yellow());
    println!("  {} See the dashboard", style("bms status").yellow());
    Ok(())
}
