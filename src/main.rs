use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use yotei::core::Schedule;
use yotei::links::{google_calendar_link, todoist_mobile_link, todoist_web_link};
use yotei::parser::parse_schedule;

#[derive(Debug, Parser)]
#[command(
    name = "yotei",
    about = "Plain-text schedule tooling built on the yotei crate",
    version
)]
struct Cli {
    /// Enable verbose logging for debugging.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse schedule files and print the grouped events.
    Parse(ParseArgs),

    /// Parse schedule files and print calendar/task deep links per event.
    Links(LinksArgs),
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Schedule text files to parse.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Emit JSON instead of a human-readable listing.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct LinksArgs {
    /// Schedule text files to parse.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Emit JSON instead of a human-readable listing.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    match cli.command {
        Commands::Parse(args) => handle_parse(args, verbose),
        Commands::Links(args) => handle_links(args, verbose),
    }
}

fn handle_parse(args: ParseArgs, verbose: bool) -> Result<()> {
    let ParseArgs { inputs, json } = args;
    let today = Local::now().date_naive();
    let parsed = read_all(&inputs, today, verbose)?;

    if json {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            path: String,
            groups: &'a Schedule,
        }

        let payload: Vec<JsonOutput<'_>> = parsed
            .iter()
            .map(|(path, schedule)| JsonOutput {
                path: path.display().to_string(),
                groups: schedule,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    for (idx, (path, schedule)) in parsed.iter().enumerate() {
        if parsed.len() > 1 {
            if idx > 0 {
                println!();
            }
            println!("== {} ==", path.display());
        }
        print_schedule(schedule);
    }
    Ok(())
}

fn handle_links(args: LinksArgs, verbose: bool) -> Result<()> {
    let LinksArgs { inputs, json } = args;
    let today = Local::now().date_naive();
    let parsed = read_all(&inputs, today, verbose)?;

    if json {
        #[derive(serde::Serialize)]
        struct LinkSet {
            group: String,
            title: String,
            start: String,
            google: String,
            todoist_app: String,
            todoist_web: String,
        }

        let mut payload = Vec::new();
        for (_, schedule) in &parsed {
            for (group, events) in schedule {
                for event in events {
                    payload.push(LinkSet {
                        group: group.clone(),
                        title: event.title.clone(),
                        start: event.start.clone(),
                        google: google_calendar_link(event),
                        todoist_app: todoist_mobile_link(event, today),
                        todoist_web: todoist_web_link(event, today),
                    });
                }
            }
        }
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let mut first = true;
    for (_, schedule) in &parsed {
        for (group, events) in schedule {
            for event in events {
                if !first {
                    println!();
                }
                first = false;
                println!("[{}] {} ({})", group, event.title, event.time_label());
                println!("  google:      {}", google_calendar_link(event));
                println!("  todoist-app: {}", todoist_mobile_link(event, today));
                println!("  todoist-web: {}", todoist_web_link(event, today));
            }
        }
    }
    if first {
        eprintln!("No events found in the provided inputs.");
    }
    Ok(())
}

fn read_all(
    inputs: &[PathBuf],
    today: NaiveDate,
    verbose: bool,
) -> Result<Vec<(PathBuf, Schedule)>> {
    let mut parsed = Vec::new();
    for path in inputs {
        parsed.push((path.clone(), read_schedule(path, today, verbose)?));
    }
    Ok(parsed)
}

fn read_schedule(path: &Path, today: NaiveDate, verbose: bool) -> Result<Schedule> {
    if verbose {
        eprintln!("Reading {:?}", path);
    }
    let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    Ok(parse_schedule(&text, today))
}

fn print_schedule(schedule: &Schedule) {
    let mut any = false;
    for (group, events) in schedule {
        // Groups declared but left empty are skipped in listings.
        if events.is_empty() {
            continue;
        }
        any = true;
        println!("- {group}");
        for event in events {
            println!("  {}  {}", event.time_label(), event.title);
            if !event.location.is_empty() {
                println!("    @{}", event.location);
            }
            for line in event.details.lines() {
                println!("    {line}");
            }
        }
    }
    if !any {
        eprintln!("No events found.");
    }
}
