//! Persist and reload pipeline artifacts.
//!
//! - The cleaned table keeps arbitrary columns, so it is stored as columnar
//!   JSON with a type tag per column (schema-on-write).
//! - Aggregates have fixed schemas and are stored as plain CSV of typed records.
//!
//! All writes go through `write_atomically`: the payload is written to a
//! temporary sibling and renamed into place, so a failing stage never leaves a
//! half-written artifact behind.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{Column, Table};
use crate::error::AppError;

/// On-disk layout of the cleaned table.
#[derive(Debug, Deserialize)]
struct TableFile {
    n_rows: usize,
    columns: Vec<Column>,
}

#[derive(Debug, Serialize)]
struct TableFileRef<'a> {
    n_rows: usize,
    columns: &'a [Column],
}

/// Write `path` via a temporary sibling, creating parent directories.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<(), AppError>
where
    F: FnOnce(&mut File) -> Result<(), AppError>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::new(2, format!("Failed to create directory '{}': {e}", parent.display()))
        })?;
    }

    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", tmp.display())))?;

    let written = write(&mut file).and_then(|()| {
        file.sync_all()
            .map_err(|e| AppError::new(2, format!("Failed to sync '{}': {e}", tmp.display())))
    });
    drop(file);

    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AppError::new(2, format!("Failed to move artifact into '{}': {e}", path.display()))
    })
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write a table as columnar JSON.
pub fn write_table_json(path: &Path, table: &Table) -> Result<(), AppError> {
    let payload = TableFileRef {
        n_rows: table.n_rows(),
        columns: table.columns(),
    };
    write_atomically(path, |file| {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &payload)
            .map_err(|e| AppError::new(2, format!("Failed to write table JSON: {e}")))?;
        writer
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to write table JSON: {e}")))
    })
}

/// Read a table written by `write_table_json`.
pub fn read_table_json(path: &Path) -> Result<Table, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open table JSON '{}': {e}", path.display())))?;
    let payload: TableFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid table JSON '{}': {e}", path.display())))?;

    let table = Table::new(payload.columns)?;
    // A zero-column table cannot carry its row count, so only check when present.
    if table.n_cols() > 0 && table.n_rows() != payload.n_rows {
        return Err(AppError::new(
            2,
            format!(
                "Table JSON '{}' declares {} rows but holds {}.",
                path.display(),
                payload.n_rows,
                table.n_rows()
            ),
        ));
    }
    Ok(table)
}

/// Write typed records as CSV under a fixed header.
///
/// The header is written even when `records` is empty, so an empty aggregate
/// still declares its schema.
pub fn write_records_csv<T: Serialize>(path: &Path, header: &[&str], records: &[T]) -> Result<(), AppError> {
    write_atomically(path, |file| {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record(header)
            .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?;
        for record in records {
            writer
                .serialize(record)
                .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to flush '{}': {e}", path.display())))
    })
}

/// Delete an artifact left by an earlier run. Returns whether one existed.
pub fn remove_artifact(path: &Path) -> Result<bool, AppError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AppError::new(2, format!("Failed to remove '{}': {e}", path.display()))),
    }
}

/// Read typed records from CSV.
pub fn read_records_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open '{}': {e}", path.display())))?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let mut out = Vec::new();
    for (idx, result) in reader.deserialize().enumerate() {
        let record = result.map_err(|e| {
            AppError::new(2, format!("Invalid row {} in '{}': {e}", idx + 2, path.display()))
        })?;
        out.push(record);
    }
    Ok(out)
}
