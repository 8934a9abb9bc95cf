//! Precomputed aggregates over the cleaned table.
//!
//! Three independent summaries, each with a fixed schema:
//!
//! | aggregate          | key                       | value             |
//! |--------------------|---------------------------|-------------------|
//! | `DailyAvgClose`    | (`trade_date`, `ticker`)  | `avg_close_price` |
//! | `AvgVolume`        | `ticker`                  | `avg_volume`      |
//! | `DailyReturn`      | (`trade_date`, `ticker`)  | `daily_return`    |
//!
//! Each aggregate checks its own column requirements; a missing column makes
//! that aggregate unavailable without affecting the others.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{CLOSE_COL, ColumnKind, DATE_COL, TICKER_COL, Table, VOLUME_COL};

/// Mean close price of one ticker on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAvgClose {
    pub trade_date: NaiveDate,
    pub ticker: String,
    /// `None` when every close for the key was null.
    pub avg_close_price: Option<f64>,
}

impl DailyAvgClose {
    pub const HEADER: [&'static str; 3] = ["trade_date", "ticker", "avg_close_price"];
}

/// Mean volume of one ticker across all dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvgVolume {
    pub ticker: String,
    /// `None` when every volume for the ticker was null.
    pub avg_volume: Option<f64>,
}

impl AvgVolume {
    pub const HEADER: [&'static str; 2] = ["ticker", "avg_volume"];
}

/// Close-to-close fractional change versus the ticker's previous trade date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReturn {
    pub trade_date: NaiveDate,
    pub ticker: String,
    pub daily_return: f64,
}

impl DailyReturn {
    pub const HEADER: [&'static str; 3] = ["trade_date", "ticker", "daily_return"];
}

/// Rows keyed by trade date and ticker, so the dashboard can filter them uniformly.
pub trait DatedTickerRow {
    fn trade_date(&self) -> NaiveDate;
    fn ticker(&self) -> &str;
    fn value(&self) -> Option<f64>;
}

impl DatedTickerRow for DailyAvgClose {
    fn trade_date(&self) -> NaiveDate {
        self.trade_date
    }
    fn ticker(&self) -> &str {
        &self.ticker
    }
    fn value(&self) -> Option<f64> {
        self.avg_close_price
    }
}

impl DatedTickerRow for DailyReturn {
    fn trade_date(&self) -> NaiveDate {
        self.trade_date
    }
    fn ticker(&self) -> &str {
        &self.ticker
    }
    fn value(&self) -> Option<f64> {
        Some(self.daily_return)
    }
}

/// Columns an aggregate needs but the table lacks (or holds with the wrong type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumns {
    pub required: Vec<&'static str>,
    pub problems: Vec<String>,
}

impl fmt::Display for MissingColumns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let required = self
            .required
            .iter()
            .map(|c| format!("'{c}'"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "need columns {required}: {}", self.problems.join("; "))
    }
}

impl std::error::Error for MissingColumns {}

/// Typed borrow of the columns the aggregates read.
struct Columns<'a> {
    dates: Option<&'a [Option<NaiveDate>]>,
    tickers: Option<&'a [Option<String>]>,
    closes: Option<&'a [Option<f64>]>,
    volumes: Option<&'a [Option<f64>]>,
}

impl<'a> Columns<'a> {
    fn resolve(table: &'a Table, required: &[&'static str]) -> Result<Self, MissingColumns> {
        let mut problems = Vec::new();
        for &name in required {
            let expected = expected_kind(name);
            match table.column(name) {
                None => problems.push(format!("`{name}` is missing")),
                Some(col) if col.data.kind() != expected => problems.push(format!(
                    "`{name}` is {} but must be {}",
                    col.data.kind().label(),
                    expected.label()
                )),
                Some(_) => {}
            }
        }
        if !problems.is_empty() {
            return Err(MissingColumns {
                required: required.to_vec(),
                problems,
            });
        }

        Ok(Self {
            dates: table.column(DATE_COL).and_then(|c| c.data.as_dates()),
            tickers: table.column(TICKER_COL).and_then(|c| c.data.as_text()),
            closes: table.column(CLOSE_COL).and_then(|c| c.data.as_numbers()),
            volumes: table.column(VOLUME_COL).and_then(|c| c.data.as_numbers()),
        })
    }
}

fn expected_kind(name: &str) -> ColumnKind {
    match name {
        DATE_COL => ColumnKind::Date,
        CLOSE_COL | VOLUME_COL => ColumnKind::Number,
        _ => ColumnKind::Text,
    }
}

/// Running mean that ignores nulls.
#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn push(&mut self, v: Option<f64>) {
        if let Some(v) = v {
            self.sum += v;
            self.n += 1;
        }
    }

    fn value(self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

/// Aggregate 1: mean close per (date, ticker), ordered by date then ticker.
///
/// Rows with a null date or ticker have no key and are not counted.
pub fn daily_avg_close(table: &Table) -> Result<Vec<DailyAvgClose>, MissingColumns> {
    let cols = Columns::resolve(table, &[DATE_COL, TICKER_COL, CLOSE_COL])?;
    let (Some(dates), Some(tickers), Some(closes)) = (cols.dates, cols.tickers, cols.closes) else {
        return Ok(Vec::new());
    };

    let mut groups: BTreeMap<(NaiveDate, &str), Mean> = BTreeMap::new();
    for row in 0..table.n_rows() {
        if let (Some(date), Some(ticker)) = (dates[row], tickers[row].as_deref()) {
            groups.entry((date, ticker)).or_default().push(closes[row]);
        }
    }

    Ok(groups
        .into_iter()
        .map(|((trade_date, ticker), mean)| DailyAvgClose {
            trade_date,
            ticker: ticker.to_string(),
            avg_close_price: mean.value(),
        })
        .collect())
}

/// Aggregate 2: mean volume per ticker, ordered by ticker.
pub fn avg_volume(table: &Table) -> Result<Vec<AvgVolume>, MissingColumns> {
    let cols = Columns::resolve(table, &[TICKER_COL, VOLUME_COL])?;
    let (Some(tickers), Some(volumes)) = (cols.tickers, cols.volumes) else {
        return Ok(Vec::new());
    };

    let mut groups: BTreeMap<&str, Mean> = BTreeMap::new();
    for row in 0..table.n_rows() {
        if let Some(ticker) = tickers[row].as_deref() {
            groups.entry(ticker).or_default().push(volumes[row]);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(ticker, mean)| AvgVolume {
            ticker: ticker.to_string(),
            avg_volume: mean.value(),
        })
        .collect())
}

/// Aggregate 3: per-ticker sequential close-to-close change.
///
/// Rows are stable-sorted by (ticker, date); each row is compared with the row
/// right before it for the same ticker. The first row of each ticker, and any
/// row whose change is undefined (null close on either side, zero previous
/// close), produce no output.
pub fn daily_return(table: &Table) -> Result<Vec<DailyReturn>, MissingColumns> {
    let cols = Columns::resolve(table, &[DATE_COL, TICKER_COL, CLOSE_COL])?;
    let (Some(dates), Some(tickers), Some(closes)) = (cols.dates, cols.tickers, cols.closes) else {
        return Ok(Vec::new());
    };

    let mut rows: Vec<(&str, NaiveDate, Option<f64>)> = (0..table.n_rows())
        .filter_map(|row| Some((tickers[row].as_deref()?, dates[row]?, closes[row])))
        .collect();
    rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut out = Vec::new();
    for pair in rows.windows(2) {
        let (prev_ticker, _, prev_close) = pair[0];
        let (ticker, trade_date, close) = pair[1];
        if prev_ticker != ticker {
            continue;
        }
        if let Some(r) = pct_change(prev_close, close) {
            out.push(DailyReturn {
                trade_date,
                ticker: ticker.to_string(),
                daily_return: r,
            });
        }
    }
    Ok(out)
}

fn pct_change(prev: Option<f64>, cur: Option<f64>) -> Option<f64> {
    let (prev, cur) = (prev?, cur?);
    if prev == 0.0 {
        return None;
    }
    let r = (cur - prev) / prev;
    r.is_finite().then_some(r)
}

/// All three aggregates, each either computed or skipped with a reason.
#[derive(Debug, Clone)]
pub struct Aggregates {
    pub daily_avg_close: Result<Vec<DailyAvgClose>, MissingColumns>,
    pub avg_volume: Result<Vec<AvgVolume>, MissingColumns>,
    pub daily_return: Result<Vec<DailyReturn>, MissingColumns>,
}

/// Compute every aggregate independently.
pub fn compute_all(table: &Table) -> Aggregates {
    Aggregates {
        daily_avg_close: daily_avg_close(table),
        avg_volume: avg_volume(table),
        daily_return: daily_return(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Column;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn trades(rows: &[(Option<NaiveDate>, Option<&str>, Option<f64>, Option<f64>)]) -> Table {
        Table::new(vec![
            Column::dates(DATE_COL, rows.iter().map(|r| r.0)),
            Column::text(TICKER_COL, rows.iter().map(|r| r.1)),
            Column::numbers(CLOSE_COL, rows.iter().map(|r| r.2)),
            Column::numbers(VOLUME_COL, rows.iter().map(|r| r.3)),
        ])
        .unwrap()
    }

    fn close_enough(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn daily_avg_close_has_one_row_per_date_ticker() {
        let t = trades(&[
            (Some(d(2024, 1, 2)), Some("BBB"), Some(20.0), None),
            (Some(d(2024, 1, 1)), Some("AAA"), Some(10.0), None),
            (Some(d(2024, 1, 1)), Some("AAA"), Some(12.0), None),
            (Some(d(2024, 1, 1)), Some("AAA"), None, None),
            (Some(d(2024, 1, 1)), Some("BBB"), None, None),
            (None, Some("AAA"), Some(99.0), None),
            (Some(d(2024, 1, 1)), None, Some(99.0), None),
        ]);

        let agg = daily_avg_close(&t).unwrap();
        assert_eq!(
            agg,
            vec![
                DailyAvgClose { trade_date: d(2024, 1, 1), ticker: "AAA".into(), avg_close_price: Some(11.0) },
                DailyAvgClose { trade_date: d(2024, 1, 1), ticker: "BBB".into(), avg_close_price: None },
                DailyAvgClose { trade_date: d(2024, 1, 2), ticker: "BBB".into(), avg_close_price: Some(20.0) },
            ]
        );
    }

    #[test]
    fn avg_volume_has_one_row_per_ticker() {
        let t = trades(&[
            (Some(d(2024, 1, 1)), Some("AAA"), None, Some(100.0)),
            (Some(d(2024, 1, 2)), Some("AAA"), None, Some(300.0)),
            (Some(d(2024, 1, 2)), Some("AAA"), None, None),
            (Some(d(2024, 1, 1)), Some("CCC"), None, None),
            (None, Some("BBB"), None, Some(50.0)),
        ]);

        let agg = avg_volume(&t).unwrap();
        assert_eq!(
            agg,
            vec![
                AvgVolume { ticker: "AAA".into(), avg_volume: Some(200.0) },
                AvgVolume { ticker: "BBB".into(), avg_volume: Some(50.0) },
                AvgVolume { ticker: "CCC".into(), avg_volume: None },
            ]
        );
    }

    #[test]
    fn daily_return_skips_first_date_and_follows_sorted_order() {
        let t = trades(&[
            (Some(d(2024, 1, 3)), Some("AAA"), Some(121.0), None),
            (Some(d(2024, 1, 1)), Some("AAA"), Some(100.0), None),
            (Some(d(2024, 1, 2)), Some("BBB"), Some(50.0), None),
            (Some(d(2024, 1, 2)), Some("AAA"), Some(110.0), None),
            (Some(d(2024, 1, 3)), Some("BBB"), Some(40.0), None),
        ]);

        let agg = daily_return(&t).unwrap();
        let keys: Vec<(&str, NaiveDate)> = agg.iter().map(|r| (r.ticker.as_str(), r.trade_date)).collect();
        assert_eq!(
            keys,
            vec![("AAA", d(2024, 1, 2)), ("AAA", d(2024, 1, 3)), ("BBB", d(2024, 1, 3))]
        );
        assert!(close_enough(agg[0].daily_return, 0.1));
        assert!(close_enough(agg[1].daily_return, 0.1));
        assert!(close_enough(agg[2].daily_return, -0.2));
    }

    #[test]
    fn single_date_ticker_has_no_returns() {
        let t = trades(&[
            (Some(d(2024, 1, 1)), Some("AAA"), Some(10.0), None),
            (Some(d(2024, 1, 2)), Some("AAA"), Some(11.0), None),
            (Some(d(2024, 1, 5)), Some("ZZZ"), Some(7.0), None),
        ]);
        let agg = daily_return(&t).unwrap();
        assert!(agg.iter().all(|r| r.ticker != "ZZZ"));
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn undefined_returns_are_dropped() {
        let t = trades(&[
            (Some(d(2024, 1, 1)), Some("AAA"), Some(0.0), None),
            (Some(d(2024, 1, 2)), Some("AAA"), Some(5.0), None),
            (Some(d(2024, 1, 3)), Some("AAA"), None, None),
            (Some(d(2024, 1, 4)), Some("AAA"), Some(6.0), None),
            (Some(d(2024, 1, 5)), Some("AAA"), Some(3.0), None),
        ]);
        let agg = daily_return(&t).unwrap();
        assert_eq!(agg.len(), 1);
        assert_eq!(agg[0].trade_date, d(2024, 1, 5));
        assert!(close_enough(agg[0].daily_return, -0.5));
    }

    #[test]
    fn missing_columns_skip_only_the_dependent_aggregate() {
        let t = Table::new(vec![
            Column::text(TICKER_COL, [Some("AAA")]),
            Column::numbers(VOLUME_COL, [Some(10.0)]),
        ])
        .unwrap();

        let all = compute_all(&t);
        let err = all.daily_avg_close.unwrap_err();
        assert!(err.problems.iter().any(|p| p.contains("trade_date")));
        assert!(err.problems.iter().any(|p| p.contains("close_price")));
        assert!(all.daily_return.is_err());
        assert_eq!(all.avg_volume.unwrap().len(), 1);
    }

    #[test]
    fn wrongly_typed_column_counts_as_missing() {
        let t = Table::new(vec![
            Column::text(TICKER_COL, [Some("AAA")]),
            Column::text(VOLUME_COL, [Some("10")]),
        ])
        .unwrap();
        let err = avg_volume(&t).unwrap_err();
        assert_eq!(err.problems, vec!["`volume` is text but must be number".to_string()]);
        assert!(err.to_string().starts_with("need columns 'ticker', 'volume'"));
    }
}
