//! `bms mail` command - Send account emails
//!
//! Registration and password-reset messages go out through the configured
//! transport. `--preview` renders the message without sending it.

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::load_config;
use crate::cli::GlobalOpts;
use crate::notify::{EmailMessage, Notifier};

#[derive(Subcommand, Debug)]
pub enum MailCommands {
    /// Send an account verification email
    Registration(MailArgs),

    /// Send a password reset email
    Reset(MailArgs),
}

#[derive(clap::Args, Debug)]
pub struct MailArgs {
    /// Recipient address
    #[arg(long)]
    pub to: String,

    /// Name used in the greeting
    #[arg(long, short = 'u')]
    pub username: String,

    /// Verification or reset link
    #[arg(long)]
    pub url: String,

    /// Print the rendered message instead of sending it
    #[arg(long)]
    pub preview: bool,
}

pub fn run(cmd: MailCommands, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let notifier = Notifier::from_config(&config).map_err(|e| miette::miette!("{}", e))?;

    let (args, message) = match cmd {
        MailCommands::Registration(args) => {
            let message = notifier.registration_email(&args.to, &args.username, &args.url);
            (args, message)
        }
        MailCommands::Reset(args) => {
            let message = notifier.password_reset_email(&args.to, &args.username, &args.url);
            (args, message)
        }
    };
    let message = message.map_err(|e| miette::miette!("{}", e))?;

    let Some(message) = message else {
        println!(
            "{} Notifications are disabled; nothing sent",
            style("!").yellow()
        );
        println!(
            "  Enable with: {}",
            style("bms config set notify.enabled true").yellow()
        );
        return Ok(());
    };

    if args.preview {
        print_preview(&message);
        return Ok(());
    }

    notifier
        .send(&message)
        .map_err(|e| miette::miette!("{}", e))?;
    if !global.quiet {
        println!(
            "{} Sent '{}' to {} via {}",
            style("✓").green(),
            message.subject,
            style(&args.to).cyan(),
            style(notifier.transport()).dim()
        );
    }
    Ok(())
}

fn print_preview(message: &EmailMessage) {
    println!("{} {}", style("From:").bold(), message.from);
    println!("{} {}", style("To:").bold(), message.to.join(", "));
    println!("{} {}", style("Subject:").bold(), message.subject);
    println!();
    print!("{}", message.text_body);
    if !message.text_body.ends_with('\n') {
        println!();
    }
}
