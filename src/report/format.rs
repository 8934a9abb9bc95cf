//! Formatted terminal output for operators.
//!
//! We keep formatting code in one place so:
//! - the pipeline stages stay free of printing concerns
//! - output changes are localized (the tests below pin the layouts)

use crate::app::pipeline::{AggregateReport, StageOutcome};
use crate::clean::CleanReport;
use crate::dashboard::{DashboardView, Panel, WideSeries};
use crate::domain::Table;

/// Widest a cell may be in a preview grid before it is truncated.
const MAX_CELL_WIDTH: usize = 16;

pub fn format_shape(table: &Table) -> String {
    format!("Shape: ({}, {})", table.n_rows(), table.n_cols())
}

/// Render a table as an aligned text grid (nulls shown as `<null>`).
pub fn format_table(table: &Table) -> String {
    let headers: Vec<String> = table
        .column_names()
        .iter()
        .map(|n| truncate(n, MAX_CELL_WIDTH))
        .collect();
    let rows: Vec<Vec<String>> = (0..table.n_rows())
        .map(|r| {
            table
                .row(r)
                .iter()
                .map(|c| if c.is_null() { "<null>".to_string() } else { truncate(&c.to_string(), MAX_CELL_WIDTH) })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_grid_line(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    push_grid_line(&mut out, &rule, &widths);
    for row in &rows {
        push_grid_line(&mut out, row, &widths);
    }
    out
}

fn push_grid_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(c, &w)| format!("{c:<w$}"))
        .collect::<Vec<_>>()
        .join(" ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Column name, type, and non-null count per column.
pub fn format_column_info(table: &Table) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<24} {:<8} {:>10}\n", "column", "type", "non-null"));
    for col in table.columns() {
        out.push_str(&format!(
            "{:<24} {:<8} {:>10}\n",
            truncate(&col.name, 24),
            col.data.kind().label(),
            col.data.len() - col.data.null_count()
        ));
    }
    out
}

pub fn format_null_counts(table: &Table) -> String {
    let mut out = String::new();
    for col in table.columns() {
        out.push_str(&format!("{:<24} {:>10}\n", truncate(&col.name, 24), col.data.null_count()));
    }
    out
}

/// Inspection printout after the raw snapshot is loaded.
pub fn format_ingest_summary(table: &Table, preview_rows: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_shape(table)));
    out.push_str(&format!("First {preview_rows} rows:\n"));
    out.push_str(&format_table(&table.head(preview_rows)));
    out.push_str("\nColumn info:\n");
    out.push_str(&format_column_info(table));
    out.push_str("\nNull counts per column:\n");
    out.push_str(&format_null_counts(table));
    out
}

/// What the cleaner did, followed by the final column types.
pub fn format_clean_summary(report: &CleanReport, table: &Table) -> String {
    let mut out = String::new();
    out.push_str(&format!("Columns after normalization: {}\n", report.columns.join(", ")));
    match &report.date_column {
        Some(name) => out.push_str(&format!(
            "Date column: {name} ({} unparseable value(s) set to null)\n",
            report.dates_coerced
        )),
        None => out.push_str("Date column: none\n"),
    }
    out.push_str(&format!(
        "Numeric columns: {} ({} unparseable value(s) set to null)\n",
        if report.numeric_columns.is_empty() {
            "none".to_string()
        } else {
            report.numeric_columns.join(", ")
        },
        report.numbers_coerced
    ));
    out.push_str(&format!("Dropped duplicates: {} row(s) removed\n", report.duplicates_removed));
    out.push_str(&format!("{}\n", format_shape(table)));
    out.push_str("\nFinal column types:\n");
    out.push_str(&format_column_info(table));
    out
}

pub fn format_aggregate_summary(report: &AggregateReport) -> String {
    let mut out = String::new();
    for (name, outcome) in report.outcomes() {
        match outcome {
            StageOutcome::Written { rows, path } => {
                out.push_str(&format!("{name:<18} {rows:>8} rows -> {}\n", path.display()))
            }
            StageOutcome::Skipped(reason) => out.push_str(&format!("{name:<18} skipped: {reason}\n")),
        }
    }
    out
}

/// Text rendition of the dashboard for one filter.
pub fn format_dashboard(view: &DashboardView) -> String {
    let mut out = String::new();
    let f = &view.filter;
    out.push_str("=== Stock Market Dashboard ===\n");
    out.push_str(&format!(
        "Showing data from {} to {} for tickers: {}\n\n",
        f.start,
        f.end,
        f.tickers().collect::<Vec<_>>().join(", ")
    ));

    let s = &view.summary;
    out.push_str(&format!("Rows in filtered data: {}\n", s.rows));
    out.push_str(&format!("Unique tickers:        {}\n", s.unique_tickers));
    out.push_str(&format!(
        "Total volume:          {}\n",
        s.total_volume.map_or_else(|| "n/a".to_string(), |v| v.to_string())
    ));

    out.push_str("\nDaily Average Close Price by Ticker\n");
    out.push_str(&format_wide_panel(&view.avg_close));

    out.push_str("\nAverage Volume by Ticker\n");
    match &view.avg_volume {
        Panel::Ready(rows) => {
            for (ticker, v) in rows {
                out.push_str(&format!("{:<12} {:>16}\n", truncate(ticker, 12), fmt_opt(*v, 2)));
            }
        }
        Panel::Empty(msg) => out.push_str(&format!("{msg}\n")),
    }

    out.push_str("\nDaily Return by Ticker\n");
    out.push_str(&format_wide_panel(&view.daily_return));
    out
}

fn format_wide_panel(panel: &Panel<WideSeries>) -> String {
    let wide = match panel {
        Panel::Ready(wide) => wide,
        Panel::Empty(msg) => return format!("{msg}\n"),
    };

    let mut out = String::new();
    let mut header = format!("{:<10}", "trade_date");
    for s in &wide.series {
        header.push_str(&format!(" {:>12}", truncate(&s.ticker, 12)));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for (i, date) in wide.dates.iter().enumerate() {
        let mut line = format!("{date}");
        for s in &wide.series {
            line.push_str(&format!(" {:>12}", fmt_opt(s.values[i], 4)));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn fmt_opt(v: Option<f64>, decimals: usize) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{v:.decimals$}"))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
