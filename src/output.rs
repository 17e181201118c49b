//! Output formatting and persistence for tables and run summaries.
//!
//! Supports log previews, CSV export/import, CSV append and gzip copies.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::table::{Table, Value};

/// Logs the first `n` rows of a table, one line per row.
pub fn log_preview(label: &str, table: &Table, n: usize) {
    info!(
        table = label,
        rows = table.len(),
        columns = ?table.column_names(),
        "Table preview"
    );
    for row in table.head(n).rows() {
        let cells: Vec<String> = row.iter().map(Value::to_string).collect();
        debug!(table = label, "{}", cells.join(" | "));
    }
}

/// Writes a table as CSV with a header row and no index column.
/// Parent directories are created as needed.
pub fn write_table_csv(path: impl AsRef<Path>, table: &Table) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    writer.write_record(table.column_names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(Value::to_string))?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = table.len(), "CSV written");
    Ok(())
}

/// Reads a CSV file into an all-text table. Empty cells become nulls.
pub fn read_table_csv(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    Ok(Table::from_text_rows(&headers, &rows)?)
}

/// Appends a serializable record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: impl AsRef<Path>, record: &impl Serialize) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Writes a gzip-compressed copy of `path` next to it (`<name>.gz`).
pub fn gzip_copy(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let contents = std::fs::read(path)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&contents)?;
    let compressed = encoder.finish()?;

    let mut target = path.as_os_str().to_owned();
    target.push(".gz");
    let target = PathBuf::from(target);
    File::create(&target)?.write_all(&compressed)?;

    debug!(
        source = %path.display(),
        target = %target.display(),
        bytes = compressed.len(),
        "Gzip copy written"
    );
    Ok(target)
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}
