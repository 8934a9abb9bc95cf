//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the requested pipeline stage or dashboard surface

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, SummaryArgs};
use crate::dashboard::{DashboardData, Filter, build_view, default_selection};
use crate::domain::DataPaths;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `stockdash` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    // `stockdash` and `stockdash --data-dir X` behave like `stockdash dashboard ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    let paths = DataPaths::new(cli.data_dir);
    tracing::debug!(data_dir = %paths.root().display(), "resolved data directory");

    match cli.command {
        Command::Ingest(args) => pipeline::run_ingest(&args.url, &paths).map(|_| ()),
        Command::Clean => pipeline::run_clean(&paths).map(|_| ()),
        Command::Aggregate => pipeline::run_aggregate(&paths).map(|_| ()),
        Command::Pipeline(args) => pipeline::run_all(&args.url, &paths).map(|_| ()),
        Command::Dashboard => handle_dashboard(&paths),
        Command::Summary(args) => handle_summary(&paths, &args),
    }
}

/// Logs go to stderr so stdout stays clean for the operator reports.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_dashboard(paths: &DataPaths) -> Result<(), AppError> {
    let data = DashboardData::load(paths)?;
    tracing::info!(
        rows = data.cleaned.n_rows(),
        tickers = data.tickers().len(),
        "loaded dashboard data"
    );
    crate::tui::run(&data)
}

fn handle_summary(paths: &DataPaths, args: &SummaryArgs) -> Result<(), AppError> {
    let data = DashboardData::load(paths)?;
    let filter = summary_filter(&data, args)?;
    println!("{}", crate::report::format_dashboard(&build_view(&data, &filter)));
    Ok(())
}

/// Resolve summary flags against the data, clamping dates to its bounds.
pub fn summary_filter(data: &DashboardData, args: &SummaryArgs) -> Result<Filter, AppError> {
    let (min, max) = data.date_bounds();
    let start = args.start.unwrap_or(min).clamp(min, max);
    let end = args.end.unwrap_or(max).clamp(min, max);
    if start > end {
        return Err(AppError::new(
            2,
            format!("Start date {start} is after end date {end}."),
        ));
    }

    let selected = if args.all_tickers {
        Vec::new()
    } else if args.tickers.is_empty() {
        default_selection(data.tickers())
    } else {
        args.tickers.clone()
    };
    Ok(Filter::new(start, end, &selected, data.tickers()))
}

/// Rewrite argv so `stockdash` defaults to `stockdash dashboard`.
///
/// Rules:
/// - `stockdash`                     -> `stockdash dashboard`
/// - `stockdash --data-dir X`        -> `stockdash dashboard --data-dir X`
/// - `stockdash --help/--version/-h` -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("dashboard".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    if is_subcommand_name(&arg1) {
        return argv;
    }

    // A leading flag is a global option for the default subcommand.
    if arg1.starts_with('-') && !argv[1..].iter().any(|a| is_subcommand_name(a)) {
        argv.insert(1, "dashboard".to_string());
    }
    argv
}

fn is_subcommand_name(arg: &str) -> bool {
    matches!(arg, "ingest" | "clean" | "aggregate" | "pipeline" | "dashboard" | "summary")
}
