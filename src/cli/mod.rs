//! Command-line parsing for the stock market pipeline and dashboard.
//!
//! Parsing and dispatch stay here; the stages themselves live in `app::pipeline`.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_DATA_DIR, DEFAULT_SOURCE_URL};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "stockdash", version, about = "Stock market CSV pipeline and terminal dashboard")]
pub struct Cli {
    /// Root directory holding raw, processed and aggregate artifacts.
    #[arg(long, global = true, env = "STOCKDASH_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the remote CSV and save the raw snapshot.
    Ingest(SourceArgs),
    /// Normalize the raw snapshot into the cleaned table.
    Clean,
    /// Compute the three aggregates from the cleaned table.
    Aggregate,
    /// Run ingest, clean and aggregate in order.
    Pipeline(SourceArgs),
    /// Launch the interactive dashboard (the default).
    Dashboard,
    /// Print the dashboard for one filter as plain text.
    Summary(SummaryArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// CSV resource to fetch.
    #[arg(long, env = "STOCKDASH_SOURCE_URL", default_value = DEFAULT_SOURCE_URL)]
    pub url: String,
}

#[derive(Debug, Clone, Args)]
pub struct SummaryArgs {
    /// First trade date to include (YYYY-MM-DD); defaults to the earliest.
    #[arg(long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Last trade date to include (YYYY-MM-DD); defaults to the latest.
    #[arg(long, value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Ticker to include; repeat for several. Omit for the default selection.
    #[arg(long = "ticker", value_name = "TICKER")]
    pub tickers: Vec<String>,

    /// Select every ticker instead of the default few.
    #[arg(long, conflicts_with = "tickers")]
    pub all_tickers: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_flags_parse_dates_and_repeated_tickers() {
        let cli = Cli::try_parse_from([
            "stockdash",
            "--data-dir",
            "/tmp/x",
            "summary",
            "--start",
            "2024-01-01",
            "--ticker",
            "AAA",
            "--ticker",
            "BBB",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, PathBuf::from("/tmp/x"));
        let Command::Summary(args) = cli.command else { panic!("expected summary") };
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(args.end, None);
        assert_eq!(args.tickers, vec!["AAA".to_string(), "BBB".to_string()]);
    }

    #[test]
    fn bad_date_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["stockdash", "summary", "--start", "01/02/2024x"]).is_err());
    }

    #[test]
    fn data_dir_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["stockdash", "clean", "--data-dir", "elsewhere"]).unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("elsewhere"));
        assert!(matches!(cli.command, Command::Clean));
    }
}
