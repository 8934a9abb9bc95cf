//! CSV ingest into a text-typed `Table`.
//!
//! This module turns an arbitrary CSV (any header names, any column count)
//! into a `Table` whose columns are all `text`. The only interpretation applied
//! is the missing-value token set: fields equal to one of
//! `MISSING_VALUE_TOKENS` become null. Everything else (trimming, typing,
//! renaming) belongs to the cleaner.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::domain::{Column, ColumnData, MISSING_VALUE_TOKENS, Table};
use crate::error::AppError;
use crate::io::artifact::write_atomically;

/// Read a CSV from any reader.
pub fn read_csv_table<R: Read>(reader: R) -> Result<Table, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix
            // on the first header; it is not part of the column name.
            if idx == 0 {
                name.trim_start_matches('\u{feff}').to_string()
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header line and lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error on line {line}: {e}")))?;

        if record.len() > headers.len() {
            return Err(AppError::new(
                2,
                format!(
                    "CSV parse error on line {line}: expected {} fields, saw {}.",
                    headers.len(),
                    record.len()
                ),
            ));
        }

        for (col, slot) in values.iter_mut().enumerate() {
            slot.push(record.get(col).and_then(parse_field));
        }
    }

    let columns = headers
        .into_iter()
        .zip(values)
        .map(|(name, v)| Column::new(name, ColumnData::Text(v)))
        .collect();

    Table::new(columns)
}

/// Read a CSV file from disk.
pub fn read_csv_path(path: &Path) -> Result<Table, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_csv_table(file)
}

/// Write a table as CSV. Nulls are written as empty fields.
pub fn write_csv_table(path: &Path, table: &Table) -> Result<(), AppError> {
    write_atomically(path, |file| {
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(table.column_names())
            .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;

        for row in 0..table.n_rows() {
            let fields = table.row(row).iter().map(|c| c.to_string()).collect::<Vec<_>>();
            writer
                .write_record(&fields)
                .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
        }

        writer
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to flush CSV: {e}")))
    })
}

fn parse_field(raw: &str) -> Option<String> {
    if MISSING_VALUE_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Cell;

    #[test]
    fn missing_tokens_become_null() {
        let csv = "Ticker,Close Price\nAAA,NA\nBBB,N/A\nCCC,null\nDDD,-\nEEE,\nFFF,12.5\n";
        let table = read_csv_table(csv.as_bytes()).unwrap();

        assert_eq!(table.n_rows(), 6);
        let close = &table.column("Close Price").unwrap().data;
        assert_eq!(close.null_count(), 5);
        assert_eq!(close.cell(5), Cell::Text("12.5"));
    }

    #[test]
    fn tokens_match_exactly_and_whitespace_is_kept() {
        let csv = "ticker,volume\n AAA ,na\n";
        let table = read_csv_table(csv.as_bytes()).unwrap();
        assert_eq!(table.cell(0, 0), Cell::Text(" AAA "));
        assert_eq!(table.cell(0, 1), Cell::Text("na"));
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_fail() {
        let table = read_csv_table("a,b,c\n1,2\n".as_bytes()).unwrap();
        assert_eq!(table.cell(0, 2), Cell::Null);

        let err = read_csv_table("a,b\n1,2,3\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("line 2"));
    }

    #[test]
    fn bom_is_stripped_from_first_header() {
        let table = read_csv_table("\u{feff}Date,Ticker\n2024-01-01,AAA\n".as_bytes()).unwrap();
        assert_eq!(table.column_names(), vec!["Date", "Ticker"]);
    }

    #[test]
    fn csv_file_round_trip_keeps_nulls_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("snapshot.csv");
        let table = read_csv_table("ticker,volume\nAAA,NA\nBBB,10\n".as_bytes()).unwrap();

        write_csv_table(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "ticker,volume\nAAA,\nBBB,10\n");

        let back = read_csv_path(&path).unwrap();
        assert_eq!(back, table);
    }
}
