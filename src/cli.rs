use crate::console;
use clap::{Args, Parser, Subcommand};
use sheet_returns::config::{AppConfig, MailSettings};
use sheet_returns::error::AppError;
use sheet_returns::telemetry;
use sheet_returns::workflows::returns::filename::SheetNumber;
use sheet_returns::workflows::returns::mailer::SmtpMailer;
use sheet_returns::workflows::returns::roster::RosterIndex;
use sheet_returns::workflows::returns::{
    scan_sheet_directory, DispatchReport, ReturnDispatcher, ReturnsError,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "Sheet Return Courier",
    about = "Match corrected homework sheets against the course roster and mail every student their copy",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match and send the corrected sheets (default command)
    Send(RunArgs),
    /// Match only: show who would receive what, without sending anything
    Plan(RunArgs),
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Sheet number, e.g. 1 or 07 (prompted interactively when omitted)
    #[arg(long)]
    sheet: Option<String>,
    /// Override the sheet folder (defaults to ./SheetNN next to the roster)
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Override the configured roster CSV path
    #[arg(long)]
    roster: Option<PathBuf>,
    /// Print the final report as JSON instead of text
    #[arg(long)]
    json: bool,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Send(RunArgs::default()));

    match command {
        Command::Send(args) => run_batch(args, true),
        Command::Plan(args) => run_batch(args, false),
    }
}

fn run_batch(args: RunArgs, dispatch: bool) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let sheet_raw = match args.sheet {
        Some(raw) => raw,
        None => console::prompt_sheet_number()?,
    };
    let sheet = SheetNumber::parse(&sheet_raw).map_err(ReturnsError::from)?;

    let sheet_dir = match args.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?
            .join(format!("{}{}", config.convention.dir_prefix, sheet)),
    };
    let roster_path = args.roster.unwrap_or_else(|| config.roster.path.clone());

    let roster = RosterIndex::from_path(
        &roster_path,
        &config.roster.columns,
        config.roster.delimiter,
    )
    .map_err(ReturnsError::from)?;
    info!(
        students = roster.len(),
        roster = %roster_path.display(),
        "roster loaded"
    );

    let submissions = scan_sheet_directory(&sheet, &sheet_dir, &config.convention)?;
    println!(
        "There are {} corrected sheet file(s) for Sheet {} in {}.",
        submissions.len(),
        sheet,
        sheet_dir.display()
    );

    let mut picker = console::ConsolePicker;
    let report = if dispatch {
        let settings = MailSettings::load()?;
        let mailer = SmtpMailer::connect(&settings).map_err(ReturnsError::from)?;
        ReturnDispatcher::new(&roster, &mut picker)
            .with_mailer(&mailer, &settings)
            .run(&sheet, &sheet_dir, &submissions)
    } else {
        ReturnDispatcher::new(&roster, &mut picker).run(&sheet, &sheet_dir, &submissions)
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("report unavailable as JSON: {err}"),
        }
    } else {
        render_report(&report);
    }

    Ok(())
}

fn render_report(report: &DispatchReport) {
    println!("\nProcessed {} file(s) for Sheet {}", report.files, report.sheet);

    if report.resolved.is_empty() {
        println!("Deliveries: none");
    } else {
        if report.dispatched {
            println!("\nDelivered");
        } else {
            println!("\nPlanned deliveries");
        }
        for note in &report.resolved {
            match &note.address {
                Some(address) => {
                    println!("- {} -> {} <{}>", note.filename, note.student, address)
                }
                None => println!("- {} -> {} ({})", note.filename, note.student, note.username),
            }
        }
    }

    if !report.failures.is_empty() {
        println!("\nFailures");
        for failure in &report.failures {
            println!("- {} ({}): {}", failure.token, failure.filename, failure.reason);
        }
    }

    let unknown = report.distinct_unknown_tokens();
    if unknown.is_empty() {
        println!("\nUnresolved names: none");
    } else {
        println!("\nATTENTION: the following names were not found in the roster:");
        for token in unknown {
            println!("- {token}");
        }
        println!("Possible fixes: rename the file or correct the roster entry (umlaut encodings are a common cause).");
    }
}
