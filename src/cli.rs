use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::commands::{self, CommandReport};

#[derive(Debug, Parser)]
#[command(
    name = "meetily-exporter",
    version,
    about = "Export Meetily meetings as Markdown and keep the folder in sync"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Export every meeting with a completed summary.
    Export(ExportArgs),
    /// Export, then keep polling for newly completed meetings.
    Watch(WatchArgs),
    /// View or update saved settings.
    Config(ConfigArgs),
    /// Show resolved paths and check that the database exists.
    Status,
}

#[derive(Debug, Args)]
struct ExportArgs {
    /// Path to the Meetily SQLite database.
    #[arg(long)]
    db: Option<PathBuf>,
    /// Output directory.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Export a single meeting.
    #[arg(long)]
    meeting_id: Option<String>,
    /// Rewrite documents that already exist (renaming them if the title changed).
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct WatchArgs {
    #[arg(long)]
    db: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Poll interval in seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,
    /// Stop after the initial export.
    #[arg(long)]
    once: bool,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Set the default database path.
    #[arg(long)]
    db: Option<PathBuf>,
    /// Set the default output directory.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Set the default poll interval.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,
    /// Turn desktop notifications on or off.
    #[arg(long)]
    notify: Option<bool>,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let status = if report.ok { "ok" } else { "issues" };
    println!("{}: {status}", report.command);
    for detail in &report.details {
        println!("  {detail}");
    }
    if !report.issues.is_empty() {
        println!("issues:");
        for issue in &report.issues {
            println!("  - {issue}");
        }
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Command::Export(args) => commands::export::run(&commands::export::ExportOptions {
            db: args.db,
            output: args.output,
            meeting_id: args.meeting_id,
            force: args.force,
        })?,
        Command::Watch(args) => commands::watch::run(&commands::watch::WatchOptions {
            db: args.db,
            output: args.output,
            interval: args.interval,
            once: args.once,
        })?,
        Command::Config(args) => commands::config::run(&commands::config::ConfigOptions {
            db: args.db,
            output: args.output,
            interval: args.interval,
            notify: args.notify,
        })?,
        Command::Status => commands::status::run()?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!(
            "{} finished with {} issue(s)",
            report.command,
            report.issues.len()
        );
    }
    Ok(())
}
