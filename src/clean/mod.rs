//! Raw → cleaned table normalization.
//!
//! Steps, in order:
//! 1. normalize column names to snake_case
//! 2. trim every text value
//! 3. parse the date column (first name containing `date`)
//! 4. coerce the numeric candidate columns
//! 5. drop exact duplicate rows (first occurrence wins)
//!
//! Value-level failures never abort: unparseable dates/numbers become null and
//! the row is kept. Missing columns only produce warnings.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::domain::{Cell, Column, ColumnData, DATE_COLUMN_NEEDLE, NUMERIC_CANDIDATE_COLUMNS, Table};
use crate::error::AppError;

/// What the cleaner did, for operator output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    pub rows_in: usize,
    pub columns: Vec<String>,
    pub date_column: Option<String>,
    /// Non-null raw values in the date column that failed to parse.
    pub dates_coerced: usize,
    pub numeric_columns: Vec<String>,
    /// Non-null raw values in numeric columns that failed to parse.
    pub numbers_coerced: usize,
    pub duplicates_removed: usize,
    pub warnings: Vec<String>,
}

/// Cleaned table plus the report describing how it was produced.
#[derive(Debug, Clone)]
pub struct CleanOutput {
    pub table: Table,
    pub report: CleanReport,
}

/// Run the full cleaning sequence over a raw table.
pub fn clean_table(raw: Table) -> Result<CleanOutput, AppError> {
    let mut report = CleanReport {
        rows_in: raw.n_rows(),
        ..CleanReport::default()
    };

    let mut columns = raw.into_columns();

    for col in &mut columns {
        col.name = normalize_column_name(&col.name);
        trim_text_values(&mut col.data);
    }
    report.columns = columns.iter().map(|c| c.name.clone()).collect();
    warn_on_repeated_names(&columns, &mut report);

    match detect_date_column(&columns) {
        Some(idx) => {
            let col = &mut columns[idx];
            report.date_column = Some(col.name.clone());
            report.dates_coerced = coerce_dates(&mut col.data);
        }
        None => report
            .warnings
            .push(format!("No column with '{DATE_COLUMN_NEEDLE}' in its name; continuing without a date column.")),
    }

    for name in NUMERIC_CANDIDATE_COLUMNS {
        match columns.iter_mut().find(|c| c.name == name) {
            Some(col) => {
                report.numbers_coerced += coerce_numbers(&mut col.data);
                report.numeric_columns.push(name.to_string());
            }
            None => report
                .warnings
                .push(format!("Numeric column `{name}` not found; skipping conversion.")),
        }
    }

    let (table, removed) = drop_duplicate_rows(Table::new(columns)?);
    report.duplicates_removed = removed;

    Ok(CleanOutput { table, report })
}

/// Trim, lowercase, and replace spaces/dashes with underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

/// Index of the first column whose name contains `date`.
pub fn detect_date_column(columns: &[Column]) -> Option<usize> {
    columns.iter().position(|c| c.name.contains(DATE_COLUMN_NEEDLE))
}

fn trim_text_values(data: &mut ColumnData) {
    if let ColumnData::Text(values) = data {
        for v in values.iter_mut().flatten() {
            let trimmed = v.trim();
            if trimmed.len() != v.len() {
                *v = trimmed.to_string();
            }
        }
    }
}

fn warn_on_repeated_names(columns: &[Column], report: &mut CleanReport) {
    let mut seen = HashSet::new();
    for col in columns {
        if !seen.insert(col.name.as_str()) {
            report.warnings.push(format!(
                "Column name `{}` appears more than once after normalization; lookups use the first.",
                col.name
            ));
        }
    }
}

/// Convert a column to dates in place. Returns how many non-null values were lost.
fn coerce_dates(data: &mut ColumnData) -> usize {
    let (parsed, lost) = match data {
        ColumnData::Date(_) => return 0,
        ColumnData::Text(values) => {
            let parsed: Vec<Option<NaiveDate>> = values.iter().map(|v| v.as_deref().and_then(parse_date)).collect();
            let lost = count_lost(values.iter().map(Option::is_some), parsed.iter().map(Option::is_some));
            (parsed, lost)
        }
        ColumnData::Number(values) => {
            let lost = values.iter().filter(|v| v.is_some()).count();
            (vec![None; values.len()], lost)
        }
    };
    *data = ColumnData::Date(parsed);
    lost
}

/// Convert a column to numbers in place. Returns how many non-null values were lost.
fn coerce_numbers(data: &mut ColumnData) -> usize {
    let (parsed, lost) = match data {
        ColumnData::Number(_) => return 0,
        ColumnData::Text(values) => {
            let parsed: Vec<Option<f64>> = values.iter().map(|v| v.as_deref().and_then(parse_number)).collect();
            let lost = count_lost(values.iter().map(Option::is_some), parsed.iter().map(Option::is_some));
            (parsed, lost)
        }
        ColumnData::Date(values) => {
            let lost = values.iter().filter(|v| v.is_some()).count();
            (vec![None; values.len()], lost)
        }
    };
    *data = ColumnData::Number(parsed);
    lost
}

fn count_lost(before: impl Iterator<Item = bool>, after: impl Iterator<Item = bool>) -> usize {
    before.zip(after).filter(|&(had, has)| had && !has).count()
}

/// Best-effort date parsing; `None` when no accepted format matches.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    const DATE_FMTS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%Y%m%d"];
    const DATETIME_FMTS: [&str; 4] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%m/%d/%Y %H:%M:%S"];

    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Best-effort number parsing; non-finite values count as unparseable.
pub fn parse_number(s: &str) -> Option<f64> {
    let v = s.trim().parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Hashable identity of a cell; numbers compare by bit pattern with -0.0 folded into 0.0.
#[derive(Debug, PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Null,
    Text(&'a str),
    Date(NaiveDate),
    Number(u64),
}

impl<'a> From<Cell<'a>> for CellKey<'a> {
    fn from(cell: Cell<'a>) -> Self {
        match cell {
            Cell::Null => CellKey::Null,
            Cell::Text(s) => CellKey::Text(s),
            Cell::Date(d) => CellKey::Date(d),
            Cell::Number(v) => CellKey::Number(if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }),
        }
    }
}

fn drop_duplicate_rows(table: Table) -> (Table, usize) {
    let keep: Vec<usize> = {
        let mut seen: HashSet<Vec<CellKey<'_>>> = HashSet::with_capacity(table.n_rows());
        (0..table.n_rows())
            .filter(|&row| seen.insert(table.row(row).into_iter().map(CellKey::from).collect()))
            .collect()
    };

    let removed = table.n_rows() - keep.len();
    if removed == 0 {
        (table, 0)
    } else {
        (table.take_rows(&keep), removed)
    }
}
