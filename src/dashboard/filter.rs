//! Date-range and ticker filters.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::aggregate::{AvgVolume, DatedTickerRow};
use crate::domain::{DATE_COL, DEFAULT_TICKER_COUNT, TICKER_COL, Table};

/// Default ticker selection: the first few tickers in sorted order.
pub fn default_selection(all_tickers: &[String]) -> Vec<String> {
    all_tickers.iter().take(DEFAULT_TICKER_COUNT).cloned().collect()
}

/// A resolved filter: inclusive date range plus the set of tickers to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub start: NaiveDate,
    pub end: NaiveDate,
    tickers: BTreeSet<String>,
}

impl Filter {
    /// Resolve user input into a filter.
    ///
    /// An empty selection means "no ticker filter": every known ticker is kept.
    pub fn new(start: NaiveDate, end: NaiveDate, selected: &[String], all_tickers: &[String]) -> Self {
        let source = if selected.is_empty() { all_tickers } else { selected };
        Self {
            start,
            end,
            tickers: source.iter().cloned().collect(),
        }
    }

    /// Selected tickers, sorted.
    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.tickers.iter().map(String::as_str)
    }

    pub fn in_range(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn selects(&self, ticker: &str) -> bool {
        self.tickers.contains(ticker)
    }

    /// Null dates and null tickers never match.
    pub fn matches(&self, date: Option<NaiveDate>, ticker: Option<&str>) -> bool {
        matches!((date, ticker), (Some(d), Some(t)) if self.in_range(d) && self.selects(t))
    }

    /// Keep cleaned rows in range and selected. Tables without the date or
    /// ticker column yield no rows.
    pub fn apply_table(&self, table: &Table) -> Table {
        let dates = table.column(DATE_COL).and_then(|c| c.data.as_dates());
        let tickers = table.column(TICKER_COL).and_then(|c| c.data.as_text());
        let (Some(dates), Some(tickers)) = (dates, tickers) else {
            return table.take_rows(&[]);
        };

        let keep: Vec<usize> = (0..table.n_rows())
            .filter(|&row| self.matches(dates[row], tickers[row].as_deref()))
            .collect();
        table.take_rows(&keep)
    }

    /// Keep dated aggregate rows in range and selected.
    pub fn apply_rows<R: DatedTickerRow + Clone>(&self, rows: &[R]) -> Vec<R> {
        rows.iter()
            .filter(|r| self.in_range(r.trade_date()) && self.selects(r.ticker()))
            .cloned()
            .collect()
    }

    /// Keep selected tickers, sorted by descending average volume (nulls last).
    pub fn apply_avg_volume(&self, rows: &[AvgVolume]) -> Vec<AvgVolume> {
        let mut out: Vec<AvgVolume> = rows.iter().filter(|r| self.selects(&r.ticker)).cloned().collect();
        out.sort_by(|a, b| match (a.avg_volume, b.avg_volume) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::fixtures::{d, data};
    use crate::domain::Cell;

    fn tickers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_selection_takes_first_three_or_all() {
        assert_eq!(default_selection(&tickers(&["A", "B", "C", "D"])), tickers(&["A", "B", "C"]));
        assert_eq!(default_selection(&tickers(&["A", "B"])), tickers(&["A", "B"]));
        assert!(default_selection(&[]).is_empty());
    }

    #[test]
    fn date_and_ticker_filter_on_cleaned_rows() {
        let data = data();
        let filter = Filter::new(d(2024, 1, 1), d(2024, 1, 2), &tickers(&["AAA"]), data.tickers());

        let out = filter.apply_table(&data.cleaned);
        assert_eq!(out.n_rows(), 2);
        for row in 0..out.n_rows() {
            assert_eq!(out.cell(row, 1), Cell::Text("AAA"));
        }
        assert_eq!(out.cell(0, 0), Cell::Date(d(2024, 1, 1)));
        assert_eq!(out.cell(1, 0), Cell::Date(d(2024, 1, 2)));
    }

    #[test]
    fn cleared_selection_keeps_every_ticker() {
        let data = data();
        let (start, end) = data.date_bounds();
        let cleared = Filter::new(start, end, &[], data.tickers());
        let all = Filter::new(start, end, data.tickers(), data.tickers());

        assert_eq!(cleared, all);
        assert_eq!(cleared.apply_table(&data.cleaned), data.cleaned);
    }

    #[test]
    fn filtering_is_idempotent() {
        let data = data();
        let filter = Filter::new(d(2024, 1, 2), d(2024, 1, 3), &tickers(&["BBB", "DDD"]), data.tickers());

        let once = filter.apply_table(&data.cleaned);
        assert_eq!(filter.apply_table(&once), once);

        let agg1 = filter.apply_rows(&data.daily_avg_close);
        assert_eq!(filter.apply_rows(&agg1), agg1);

        let agg3 = filter.apply_rows(&data.daily_return);
        assert_eq!(filter.apply_rows(&agg3), agg3);
    }

    #[test]
    fn aggregate_rows_respect_inclusive_bounds() {
        let data = data();
        let filter = Filter::new(d(2024, 1, 3), d(2024, 1, 3), &tickers(&["AAA", "DDD"]), data.tickers());

        let agg1 = filter.apply_rows(&data.daily_avg_close);
        let keys: Vec<&str> = agg1.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(keys, vec!["AAA", "DDD"]);

        // DDD traded once, so it has no returns at all.
        let agg3 = filter.apply_rows(&data.daily_return);
        assert_eq!(agg3.len(), 1);
        assert_eq!(agg3[0].ticker, "AAA");
    }

    #[test]
    fn avg_volume_is_ticker_filtered_and_sorted_descending() {
        let rows = vec![
            AvgVolume { ticker: "AAA".into(), avg_volume: Some(10.0) },
            AvgVolume { ticker: "BBB".into(), avg_volume: None },
            AvgVolume { ticker: "CCC".into(), avg_volume: Some(30.0) },
            AvgVolume { ticker: "DDD".into(), avg_volume: Some(20.0) },
        ];
        let all = tickers(&["AAA", "BBB", "CCC", "DDD"]);
        let filter = Filter::new(d(2024, 1, 1), d(2024, 1, 1), &tickers(&["AAA", "BBB", "CCC"]), &all);

        let sorted = filter.apply_avg_volume(&rows);
        let order: Vec<&str> = sorted.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["CCC", "AAA", "BBB"]);
    }
}
