//! The three batch stages, each reading one artifact and writing the next.
//!
//! ingest:    remote CSV            -> raw/stock_market_raw.csv
//! clean:     raw snapshot          -> processed/cleaned.json
//! aggregate: cleaned table         -> agg/agg{1,2,3}_*.csv
//!
//! Stages print operator output (shape, previews, dtypes) to stdout and log
//! progress/warnings through `tracing`. A stage either completes or fails
//! without writing its artifact; nothing is retried.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{self, AvgVolume, DailyAvgClose, DailyReturn, MissingColumns};
use crate::clean::{CleanReport, clean_table};
use crate::data::CsvSource;
use crate::domain::{DataPaths, PREVIEW_ROWS, Table};
use crate::error::AppError;
use crate::io::artifact::{read_table_json, remove_artifact, write_records_csv, write_table_json};
use crate::io::ingest::{read_csv_path, write_csv_table};

/// Fetch the remote CSV and persist the raw snapshot.
pub fn run_ingest(url: &str, paths: &DataPaths) -> Result<Table, AppError> {
    let source = CsvSource::new(url)?;
    info!(url = source.url(), "fetching raw CSV");
    let table = source.fetch_table()?;
    info!(rows = table.n_rows(), cols = table.n_cols(), "loaded raw CSV");

    println!("{}", crate::report::format_ingest_summary(&table, PREVIEW_ROWS));

    let path = paths.raw_snapshot();
    write_csv_table(&path, &table)?;
    info!(path = %path.display(), "saved raw snapshot");
    Ok(table)
}

/// Clean the raw snapshot and persist the canonical table.
pub fn run_clean(paths: &DataPaths) -> Result<(Table, CleanReport), AppError> {
    let raw_path = paths.raw_snapshot();
    info!(path = %raw_path.display(), "loading raw snapshot");
    let raw = read_csv_path(&raw_path)?;
    info!(rows = raw.n_rows(), cols = raw.n_cols(), "loaded raw snapshot");

    let out = clean_table(raw)?;
    for w in &out.report.warnings {
        warn!("{w}");
    }
    if let Some(col) = &out.report.date_column {
        info!(column = %col, "parsed date column");
    }

    println!("{}", crate::report::format_clean_summary(&out.report, &out.table));

    let path = paths.cleaned();
    write_table_json(&path, &out.table)?;
    info!(path = %path.display(), rows = out.table.n_rows(), "saved cleaned table");
    Ok((out.table, out.report))
}

/// Result of one aggregate: written, or skipped because columns were missing.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Written { rows: usize, path: PathBuf },
    Skipped(MissingColumns),
}

impl StageOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, StageOutcome::Written { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    pub daily_avg_close: StageOutcome,
    pub avg_volume: StageOutcome,
    pub daily_return: StageOutcome,
}

impl AggregateReport {
    pub fn outcomes(&self) -> [(&'static str, &StageOutcome); 3] {
        [
            ("agg1 daily close", &self.daily_avg_close),
            ("agg2 avg volume", &self.avg_volume),
            ("agg3 daily return", &self.daily_return),
        ]
    }
}

/// Compute the three aggregates from the cleaned table and persist each.
pub fn run_aggregate(paths: &DataPaths) -> Result<AggregateReport, AppError> {
    let cleaned_path = paths.cleaned();
    info!(path = %cleaned_path.display(), "loading cleaned table");
    let table = read_table_json(&cleaned_path)?;
    info!(rows = table.n_rows(), columns = ?table.column_names(), "loaded cleaned table");

    let all = aggregate::compute_all(&table);
    let report = AggregateReport {
        daily_avg_close: persist("agg1", &DailyAvgClose::HEADER, all.daily_avg_close, paths.daily_avg_close())?,
        avg_volume: persist("agg2", &AvgVolume::HEADER, all.avg_volume, paths.avg_volume())?,
        daily_return: persist("agg3", &DailyReturn::HEADER, all.daily_return, paths.daily_return())?,
    };

    println!("{}", crate::report::format_aggregate_summary(&report));
    info!("aggregation step finished");
    Ok(report)
}

/// Write one aggregate, or drop its previous artifact when it cannot be computed.
fn persist<T: Serialize>(
    name: &str,
    header: &[&str],
    computed: Result<Vec<T>, MissingColumns>,
    path: PathBuf,
) -> Result<StageOutcome, AppError> {
    match computed {
        Ok(rows) => {
            write_records_csv(&path, header, &rows)?;
            info!(aggregate = name, rows = rows.len(), path = %path.display(), "saved aggregate");
            Ok(StageOutcome::Written { rows: rows.len(), path })
        }
        Err(missing) => {
            warn!(aggregate = name, "skipping: {missing}");
            // A stale file would describe a different cleaned table.
            if remove_artifact(&path)? {
                warn!(aggregate = name, path = %path.display(), "removed artifact from an earlier run");
            }
            Ok(StageOutcome::Skipped(missing))
        }
    }
}

/// Run ingest → clean → aggregate in order.
pub fn run_all(url: &str, paths: &DataPaths) -> Result<AggregateReport, AppError> {
    run_ingest(url, paths)?;
    run_clean(paths)?;
    run_aggregate(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::read_csv_table;

    const RAW: &str = "\
Trade Date,Ticker,Open Price,Close-Price,Volume
2024-01-01, AAA ,10,10,100
2024-01-01,AAA,10,10,100
2024-01-02,AAA,10,11,NA
bad-date,BBB,5,5,50
";

    #[test]
    fn clean_then_aggregate_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        write_csv_table(&paths.raw_snapshot(), &read_csv_table(RAW.as_bytes()).unwrap()).unwrap();

        let (cleaned, report) = run_clean(&paths).unwrap();
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(cleaned.n_rows(), 3);

        let agg = run_aggregate(&paths).unwrap();
        assert!(agg.outcomes().iter().all(|(_, o)| o.is_written()));
        assert_eq!(
            agg.daily_avg_close,
            StageOutcome::Written { rows: 2, path: paths.daily_avg_close() }
        );
        assert_eq!(agg.avg_volume, StageOutcome::Written { rows: 2, path: paths.avg_volume() });
        assert_eq!(agg.daily_return, StageOutcome::Written { rows: 1, path: paths.daily_return() });
    }

    #[test]
    fn aggregate_skips_what_the_schema_cannot_support() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        write_csv_table(
            &paths.raw_snapshot(),
            &read_csv_table("Ticker,Volume\nAAA,1\nAAA,3\n".as_bytes()).unwrap(),
        )
        .unwrap();

        run_clean(&paths).unwrap();
        let agg = run_aggregate(&paths).unwrap();

        assert!(matches!(agg.daily_avg_close, StageOutcome::Skipped(_)));
        assert!(matches!(agg.daily_return, StageOutcome::Skipped(_)));
        assert!(agg.avg_volume.is_written());
        assert!(!paths.daily_avg_close().exists());
        assert!(paths.avg_volume().exists());
    }

    fn clean_and_aggregate(paths: &DataPaths, raw: &str) -> AggregateReport {
        write_csv_table(&paths.raw_snapshot(), &read_csv_table(raw.as_bytes()).unwrap()).unwrap();
        run_clean(paths).unwrap();
        run_aggregate(paths).unwrap()
    }

    #[test]
    fn empty_aggregate_keeps_its_header() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());

        let agg = clean_and_aggregate(&paths, "trade_date,ticker,close_price,volume\n2024-01-01,AAA,1,1\n");

        assert_eq!(agg.daily_return, StageOutcome::Written { rows: 0, path: paths.daily_return() });
        assert_eq!(
            std::fs::read_to_string(paths.daily_return()).unwrap(),
            "trade_date,ticker,daily_return\n"
        );
    }

    #[test]
    fn skipped_aggregate_drops_the_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());

        clean_and_aggregate(&paths, "trade_date,ticker,close_price,volume\n2024-01-01,AAA,1,1\n");
        assert!(paths.daily_avg_close().exists());

        let agg = clean_and_aggregate(&paths, "trade_date,ticker,volume\n2024-01-01,BBB,5\n");
        assert!(matches!(agg.daily_avg_close, StageOutcome::Skipped(_)));
        assert!(!paths.daily_avg_close().exists());
        assert!(!paths.daily_return().exists());
        assert!(paths.avg_volume().exists());
    }

    #[test]
    fn clean_without_snapshot_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        let err = run_clean(&paths).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(!paths.cleaned().exists());
    }
}
