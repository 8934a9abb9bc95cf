//! Behavior constants and artifact locations.
//!
//! The missing-value tokens and numeric candidate columns are fixed on purpose:
//! two runs over the same source must produce the same artifacts.

use std::path::{Path, PathBuf};

/// Source CSV fetched by `stockdash ingest` when no `--url` is given.
pub const DEFAULT_SOURCE_URL: &str =
    "https://raw.githubusercontent.com/gchandra10/filestorage/refs/heads/main/stock_market.csv";

/// Default root directory for all pipeline artifacts.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Raw field values parsed as null when reading a CSV.
pub const MISSING_VALUE_TOKENS: [&str; 5] = ["", "NA", "N/A", "null", "-"];

/// Columns coerced to numbers by the cleaner when present.
pub const NUMERIC_CANDIDATE_COLUMNS: [&str; 3] = ["open_price", "close_price", "volume"];

/// The date column is the first normalized column name containing this.
pub const DATE_COLUMN_NEEDLE: &str = "date";

/// Canonical column names consumed by the aggregator and the dashboard.
pub const DATE_COL: &str = "trade_date";
pub const TICKER_COL: &str = "ticker";
pub const CLOSE_COL: &str = "close_price";
pub const VOLUME_COL: &str = "volume";

/// How many tickers the dashboard selects before the user touches the filter.
pub const DEFAULT_TICKER_COUNT: usize = 3;

/// Rows printed by the operator inspection preview.
pub const PREVIEW_ROWS: usize = 5;

/// Locations of every artifact the pipeline produces, relative to one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_snapshot(&self) -> PathBuf {
        self.root.join("raw").join("stock_market_raw.csv")
    }

    pub fn cleaned(&self) -> PathBuf {
        self.root.join("processed").join("cleaned.json")
    }

    pub fn daily_avg_close(&self) -> PathBuf {
        self.agg_dir().join("agg1_daily_avg_close_by_ticker.csv")
    }

    pub fn avg_volume(&self) -> PathBuf {
        self.agg_dir().join("agg2_avg_volume_by_ticker.csv")
    }

    pub fn daily_return(&self) -> PathBuf {
        self.agg_dir().join("agg3_daily_return_by_ticker.csv")
    }

    fn agg_dir(&self) -> PathBuf {
        self.root.join("agg")
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}
