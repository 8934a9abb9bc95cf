//! Dashboard data access, filtering and view building.
//!
//! `DashboardData` is loaded once at process start and handed by reference to
//! whichever front-end renders it (the TUI or the text summary). Everything
//! downstream of it is a pure function of `(data, filter)`.

use std::path::Path;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;

use crate::aggregate::{AvgVolume, DailyAvgClose, DailyReturn};
use crate::domain::{DATE_COL, DataPaths, TICKER_COL, Table};
use crate::error::AppError;
use crate::io::artifact::{read_records_csv, read_table_json};

pub mod filter;
pub mod view;

pub use filter::*;
pub use view::*;

/// The cleaned table and the three aggregates, read once.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub cleaned: Table,
    pub daily_avg_close: Vec<DailyAvgClose>,
    pub avg_volume: Vec<AvgVolume>,
    pub daily_return: Vec<DailyReturn>,
    min_date: NaiveDate,
    max_date: NaiveDate,
    tickers: Vec<String>,
}

impl DashboardData {
    /// Load all artifacts from disk.
    ///
    /// A missing aggregate file (the aggregator skipped it) loads as empty so
    /// its panel shows the empty-state notice; a missing cleaned table is fatal.
    pub fn load(paths: &DataPaths) -> Result<Self, AppError> {
        let cleaned = read_table_json(&paths.cleaned())?;
        let daily_avg_close = read_optional_records(&paths.daily_avg_close())?;
        let avg_volume = read_optional_records(&paths.avg_volume())?;
        let daily_return = read_optional_records(&paths.daily_return())?;

        Self::from_parts(cleaned, daily_avg_close, avg_volume, daily_return)
    }

    /// Build from in-memory tables, validating what the filters rely on.
    pub fn from_parts(
        cleaned: Table,
        daily_avg_close: Vec<DailyAvgClose>,
        avg_volume: Vec<AvgVolume>,
        daily_return: Vec<DailyReturn>,
    ) -> Result<Self, AppError> {
        let dates = cleaned
            .column(DATE_COL)
            .and_then(|c| c.data.as_dates())
            .ok_or_else(|| AppError::new(3, format!("Cleaned table has no date-typed `{DATE_COL}` column.")))?;
        let tickers = cleaned
            .column(TICKER_COL)
            .and_then(|c| c.data.as_text())
            .ok_or_else(|| AppError::new(3, format!("Cleaned table has no text `{TICKER_COL}` column.")))?;

        let min_date = dates.iter().flatten().min().copied();
        let max_date = dates.iter().flatten().max().copied();
        let (Some(min_date), Some(max_date)) = (min_date, max_date) else {
            return Err(AppError::new(3, format!("Cleaned table has no valid `{DATE_COL}` values.")));
        };

        let mut tickers: Vec<String> = tickers.iter().flatten().cloned().collect();
        tickers.sort();
        tickers.dedup();

        Ok(Self {
            cleaned,
            daily_avg_close,
            avg_volume,
            daily_return,
            min_date,
            max_date,
            tickers,
        })
    }

    /// Earliest and latest trade date in the cleaned table.
    pub fn date_bounds(&self) -> (NaiveDate, NaiveDate) {
        (self.min_date, self.max_date)
    }

    /// Distinct non-null tickers, sorted.
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }
}

fn read_optional_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AppError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "aggregate artifact not found; its panel will be empty");
        return Ok(Vec::new());
    }
    read_records_csv(path)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use crate::aggregate;
    use crate::domain::{CLOSE_COL, Column, DATE_COL, TICKER_COL, Table, VOLUME_COL};

    use super::DashboardData;

    pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Tickers AAA/BBB/CCC/DDD over 2024-01-01..03 (DDD only on the 3rd).
    pub fn cleaned() -> Table {
        let mut dates = Vec::new();
        let mut tickers = Vec::new();
        let mut closes = Vec::new();
        let mut volumes = Vec::new();
        for (t, base) in [("AAA", 10.0), ("BBB", 20.0), ("CCC", 30.0)] {
            for day in 1..=3 {
                dates.push(Some(d(2024, 1, day)));
                tickers.push(Some(t));
                closes.push(Some(base + day as f64));
                volumes.push(Some(100.0 * day as f64));
            }
        }
        dates.push(Some(d(2024, 1, 3)));
        tickers.push(Some("DDD"));
        closes.push(Some(5.0));
        volumes.push(Some(1_000.0));

        Table::new(vec![
            Column::dates(DATE_COL, dates),
            Column::text(TICKER_COL, tickers),
            Column::numbers(CLOSE_COL, closes),
            Column::numbers(VOLUME_COL, volumes),
        ])
        .unwrap()
    }

    pub fn data() -> DashboardData {
        let cleaned = cleaned();
        let all = aggregate::compute_all(&cleaned);
        DashboardData::from_parts(
            cleaned,
            all.daily_avg_close.unwrap(),
            all.avg_volume.unwrap(),
            all.daily_return.unwrap(),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{d, data};
    use super::*;
    use crate::domain::Column;

    #[test]
    fn bounds_and_tickers_come_from_the_cleaned_table() {
        let data = data();
        assert_eq!(data.date_bounds(), (d(2024, 1, 1), d(2024, 1, 3)));
        assert_eq!(data.tickers(), &["AAA", "BBB", "CCC", "DDD"]);
    }

    #[test]
    fn cleaned_table_without_dates_is_rejected() {
        let cleaned = Table::new(vec![
            Column::dates(DATE_COL, [None]),
            Column::text(TICKER_COL, [Some("AAA")]),
        ])
        .unwrap();
        let err = DashboardData::from_parts(cleaned, vec![], vec![], vec![]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn missing_aggregate_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());
        crate::io::artifact::write_table_json(&paths.cleaned(), &super::fixtures::cleaned()).unwrap();

        let data = DashboardData::load(&paths).unwrap();
        assert_eq!(data.cleaned.n_rows(), 10);
        assert!(data.daily_avg_close.is_empty());
        assert!(data.avg_volume.is_empty());
        assert!(data.daily_return.is_empty());
    }
}
