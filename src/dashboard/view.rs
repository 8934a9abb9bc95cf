//! Render-ready view of the dashboard for one filter.
//!
//! `build_view` is the whole filter → pivot pipeline. It owns no state, so the
//! front-end can call it on every input change.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::aggregate::DatedTickerRow;
use crate::domain::{TICKER_COL, Table, VOLUME_COL};

use super::{DashboardData, Filter};

pub const NO_CLOSE_DATA: &str = "No data available for the selected filters.";
pub const NO_VOLUME_DATA: &str = "No volume data for the selected tickers.";
pub const NO_RETURN_DATA: &str = "No daily return data for the selected filters.";

/// Headline numbers over the filtered cleaned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryMetrics {
    pub rows: usize,
    pub unique_tickers: usize,
    /// Sum of non-null volume, truncated. `None` when there is no numeric volume column.
    pub total_volume: Option<i64>,
}

impl SummaryMetrics {
    pub fn of(table: &Table) -> Self {
        let unique_tickers = table
            .column(TICKER_COL)
            .and_then(|c| c.data.as_text())
            .map_or(0, |v| v.iter().flatten().collect::<BTreeSet<_>>().len());

        let total_volume = table
            .column(VOLUME_COL)
            .and_then(|c| c.data.as_numbers())
            .map(|v| v.iter().flatten().sum::<f64>() as i64);

        Self {
            rows: table.n_rows(),
            unique_tickers,
            total_volume,
        }
    }
}

/// A long (date, ticker, value) table pivoted to one series per ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct WideSeries {
    /// Ascending, distinct.
    pub dates: Vec<NaiveDate>,
    /// One entry per ticker, ascending by ticker; `values[i]` aligns with `dates[i]`.
    pub series: Vec<TickerSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerSeries {
    pub ticker: String,
    pub values: Vec<Option<f64>>,
}

impl WideSeries {
    /// Finite (date, value) points of every series, for axis bounds.
    pub fn points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.series.iter().flat_map(move |s| {
            self.dates
                .iter()
                .zip(&s.values)
                .filter_map(|(&d, v)| v.map(|v| (d, v)))
        })
    }
}

/// Pivot dated rows wide: dates × tickers, duplicate cells averaged,
/// series with no values at all dropped.
pub fn pivot<R: DatedTickerRow>(rows: &[R]) -> WideSeries {
    let dates: Vec<NaiveDate> = rows
        .iter()
        .map(|r| r.trade_date())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let date_index: BTreeMap<NaiveDate, usize> = dates.iter().enumerate().map(|(i, &d)| (d, i)).collect();

    let mut cells: BTreeMap<&str, Vec<(f64, usize)>> = BTreeMap::new();
    for r in rows {
        let slot = cells
            .entry(r.ticker())
            .or_insert_with(|| vec![(0.0, 0); dates.len()]);
        if let Some(v) = r.value() {
            let cell = &mut slot[date_index[&r.trade_date()]];
            cell.0 += v;
            cell.1 += 1;
        }
    }

    let series = cells
        .into_iter()
        .filter(|(_, slot)| slot.iter().any(|&(_, n)| n > 0))
        .map(|(ticker, slot)| TickerSeries {
            ticker: ticker.to_string(),
            values: slot
                .into_iter()
                .map(|(sum, n)| (n > 0).then(|| sum / n as f64))
                .collect(),
        })
        .collect();

    WideSeries { dates, series }
}

/// A chart panel: either data to draw or an empty-state notice.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel<T> {
    Ready(T),
    Empty(&'static str),
}

impl<T> Panel<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Panel::Empty(_))
    }
}

/// Everything the dashboard displays for one filter.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub filter: Filter,
    pub summary: SummaryMetrics,
    pub avg_close: Panel<WideSeries>,
    /// (ticker, avg_volume) sorted descending by volume.
    pub avg_volume: Panel<Vec<(String, Option<f64>)>>,
    pub daily_return: Panel<WideSeries>,
    /// Filtered cleaned rows for the raw-data table.
    pub rows: Table,
}

/// Run filter → pivot for every panel.
pub fn build_view(data: &DashboardData, filter: &Filter) -> DashboardView {
    let rows = filter.apply_table(&data.cleaned);
    let summary = SummaryMetrics::of(&rows);

    let agg1 = filter.apply_rows(&data.daily_avg_close);
    let avg_close = if agg1.is_empty() {
        Panel::Empty(NO_CLOSE_DATA)
    } else {
        Panel::Ready(pivot(&agg1))
    };

    let agg2 = filter.apply_avg_volume(&data.avg_volume);
    let avg_volume = if agg2.is_empty() {
        Panel::Empty(NO_VOLUME_DATA)
    } else {
        Panel::Ready(agg2.into_iter().map(|r| (r.ticker, r.avg_volume)).collect())
    };

    let agg3 = filter.apply_rows(&data.daily_return);
    let daily_return = if agg3.is_empty() {
        Panel::Empty(NO_RETURN_DATA)
    } else {
        Panel::Ready(pivot(&agg3))
    };

    DashboardView {
        filter: filter.clone(),
        summary,
        avg_close,
        avg_volume,
        daily_return,
        rows,
    }
}
