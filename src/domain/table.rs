//! Column-oriented in-memory table.
//!
//! Every pipeline stage works on a `Table`: an ordered list of named, typed
//! columns of equal length. Nulls are `None`. The table is deliberately small:
//! it knows how to look columns up, select rows and render cells, and nothing
//! about cleaning or aggregation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Type tag of a column, as written to the cleaned artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Date,
    Number,
}

impl ColumnKind {
    pub fn label(self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Date => "date",
            ColumnKind::Number => "number",
        }
    }
}

/// Values of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Text(Vec<Option<String>>),
    Date(Vec<Option<NaiveDate>>),
    Number(Vec<Option<f64>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.len(),
            ColumnData::Date(v) => v.len(),
            ColumnData::Number(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Text(_) => ColumnKind::Text,
            ColumnData::Date(_) => ColumnKind::Date,
            ColumnData::Number(_) => ColumnKind::Number,
        }
    }

    /// Cell at `row`. Panics on out-of-range rows, like slice indexing.
    pub fn cell(&self, row: usize) -> Cell<'_> {
        match self {
            ColumnData::Text(v) => v[row].as_deref().map_or(Cell::Null, Cell::Text),
            ColumnData::Date(v) => v[row].map_or(Cell::Null, Cell::Date),
            ColumnData::Number(v) => v[row].map_or(Cell::Null, Cell::Number),
        }
    }

    pub fn null_count(&self) -> usize {
        match self {
            ColumnData::Text(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Date(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Number(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    pub fn as_text(&self) -> Option<&[Option<String>]> {
        match self {
            ColumnData::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dates(&self) -> Option<&[Option<NaiveDate>]> {
        match self {
            ColumnData::Date(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[Option<f64>]> {
        match self {
            ColumnData::Number(v) => Some(v),
            _ => None,
        }
    }

    fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect()),
            ColumnData::Date(v) => ColumnData::Date(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Number(v) => ColumnData::Number(rows.iter().map(|&i| v[i]).collect()),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn text<S: Into<String>>(name: &str, values: impl IntoIterator<Item = Option<S>>) -> Self {
        Self::new(
            name,
            ColumnData::Text(values.into_iter().map(|v| v.map(Into::into)).collect()),
        )
    }

    pub fn dates(name: &str, values: impl IntoIterator<Item = Option<NaiveDate>>) -> Self {
        Self::new(name, ColumnData::Date(values.into_iter().collect()))
    }

    pub fn numbers(name: &str, values: impl IntoIterator<Item = Option<f64>>) -> Self {
        Self::new(name, ColumnData::Number(values.into_iter().collect()))
    }
}

/// Borrowed view of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Null,
    Text(&'a str),
    Date(NaiveDate),
    Number(f64),
}

impl Cell<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl fmt::Display for Cell<'_> {
    /// Renders nulls as the empty string so CSV output round-trips to null.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::Number(v) => write!(f, "{v}"),
        }
    }
}

/// An ordered set of equal-length columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, rejecting columns of unequal length.
    pub fn new(columns: Vec<Column>) -> Result<Self, AppError> {
        let n_rows = columns.first().map_or(0, |c| c.data.len());
        if let Some(bad) = columns.iter().find(|c| c.data.len() != n_rows) {
            return Err(AppError::new(
                2,
                format!(
                    "Column `{}` has {} values, expected {n_rows}.",
                    bad.name,
                    bad.data.len()
                ),
            ));
        }
        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// First column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell<'_> {
        self.columns[col].data.cell(row)
    }

    pub fn row(&self, row: usize) -> Vec<Cell<'_>> {
        self.columns.iter().map(|c| c.data.cell(row)).collect()
    }

    /// New table holding the given rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(rows)))
                .collect(),
            n_rows: rows.len(),
        }
    }

    pub fn head(&self, n: usize) -> Table {
        let rows: Vec<usize> = (0..n.min(self.n_rows)).collect();
        self.take_rows(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn new_rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::text("ticker", [Some("AAA"), Some("BBB")]),
            Column::numbers("volume", [Some(1.0)]),
        ])
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("volume"));
    }

    #[test]
    fn take_rows_reorders_every_column() {
        let table = Table::new(vec![
            Column::dates("trade_date", [Some(d(2024, 1, 1)), None, Some(d(2024, 1, 3))]),
            Column::text("ticker", [Some("AAA"), Some("BBB"), None::<&str>]),
        ])
        .unwrap();

        let picked = table.take_rows(&[2, 0]);
        assert_eq!(picked.n_rows(), 2);
        assert_eq!(picked.cell(0, 0), Cell::Date(d(2024, 1, 3)));
        assert_eq!(picked.cell(0, 1), Cell::Null);
        assert_eq!(picked.cell(1, 1), Cell::Text("AAA"));
    }

    #[test]
    fn column_lookup_returns_first_match() {
        let table = Table::new(vec![
            Column::text("price", [Some("a")]),
            Column::text("price", [Some("b")]),
        ])
        .unwrap();
        let col = table.column("price").unwrap();
        assert_eq!(col.data.cell(0), Cell::Text("a"));
    }

    #[test]
    fn cells_render_nulls_as_empty() {
        assert_eq!(Cell::Null.to_string(), "");
        assert_eq!(Cell::Date(d(2024, 2, 9)).to_string(), "2024-02-09");
        assert_eq!(Cell::Number(12.5).to_string(), "12.5");
    }
}
