// ============================================================
// Layer 4 — Corpus Table
// ============================================================
// Reads the comma-separated input table and writes the labelled
// copy back out.
//
// The table is kept as raw csv::StringRecords rather than being
// parsed into Records up front: the output has to mirror every
// input column exactly (plus the new prediction column), and the
// inference pass may run on tables that have no label column.
//
//   text,label                   text,label,sentiment
//   "Stocks rally",2      →      "Stocks rally",2,LABEL_2
//   "Guidance cut",0             "Guidance cut",0,LABEL_0
//
// Reference: csv crate documentation

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::{
    io::{Read, Write},
    path::Path,
};

use crate::data::error::DataError;
use crate::domain::record::Record;

/// An in-memory copy of a CSV file: header row plus data rows.
#[derive(Debug, Clone)]
pub struct CorpusTable {
    /// Where the table came from, for error messages
    source:  String,
    headers: StringRecord,
    rows:    Vec<StringRecord>,
}

impl CorpusTable {
    /// Read a CSV file with a header row.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open input table '{}'", path.display()))?;
        let table = Self::from_reader(file, path.display().to_string())?;
        tracing::info!(
            "Loaded {} rows x {} columns from '{}'",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse CSV from any reader. `source` names it in error messages.
    pub fn from_reader<R: Read>(reader: R, source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = rdr
            .headers()
            .with_context(|| format!("Cannot read header row of '{source}'"))?
            .clone();

        let rows = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Malformed CSV in '{source}'"))?;

        Ok(Self { source, headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> Vec<&str> {
        self.headers.iter().collect()
    }

    /// Position of a named column.
    pub fn column_index(&self, column: &str) -> std::result::Result<usize, DataError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| DataError::MissingColumn {
                path:   self.source.clone(),
                column: column.to_string(),
                found:  self.headers.iter().collect::<Vec<_>>().join(", "),
            })
    }

    /// Every cell of the text column. An empty cell is an error:
    /// there is nothing to tokenise and no way to skip the row
    /// without breaking row-for-row correspondence in the output.
    pub fn texts(&self, column: &str) -> std::result::Result<Vec<String>, DataError> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cell = row.get(idx).unwrap_or("");
                if cell.trim().is_empty() {
                    Err(DataError::EmptyText { row: i + 1, column: column.to_string() })
                } else {
                    Ok(cell.to_string())
                }
            })
            .collect()
    }

    /// Every cell of the label column, parsed as an integer.
    pub fn labels(&self, column: &str) -> std::result::Result<Vec<i64>, DataError> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| parse_label(row.get(idx).unwrap_or(""), i + 1))
            .collect()
    }

    /// Rows as (text, label) records.
    pub fn records(&self, text_column: &str, label_column: &str) -> Result<Vec<Record>> {
        if self.is_empty() {
            return Err(DataError::EmptyTable(self.source.clone()).into());
        }
        let texts  = self.texts(text_column)?;
        let labels = self.labels(label_column)?;
        Ok(texts
            .into_iter()
            .zip(labels)
            .map(|(text, label)| Record::new(text, label))
            .collect())
    }

    /// A copy of the table with `values` as the named column.
    /// An existing column of that name is overwritten in place;
    /// otherwise the column is appended at the end.
    pub fn with_column(&self, column: &str, values: Vec<String>) -> Result<Self> {
        anyhow::ensure!(
            values.len() == self.rows.len(),
            "column '{}' has {} values but the table has {} rows",
            column,
            values.len(),
            self.rows.len()
        );

        let existing = self.headers.iter().position(|h| h == column);
        let mut headers = self.headers.clone();
        if existing.is_none() {
            headers.push_field(column);
        }

        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| match existing {
                Some(idx) => row
                    .iter()
                    .enumerate()
                    .map(|(i, cell)| if i == idx { value.as_str() } else { cell })
                    .collect::<StringRecord>(),
                None => {
                    let mut row = row.clone();
                    row.push_field(&value);
                    row
                }
            })
            .collect();

        Ok(Self { source: self.source.clone(), headers, rows })
    }

    /// Write the table as CSV, header first, no index column.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create '{}'", parent.display()))?;
            }
        }
        let file = std::fs::File::create(path)
            .with_context(|| format!("Cannot create output table '{}'", path.display()))?;
        self.to_writer(file)?;
        tracing::info!("Wrote {} rows to '{}'", self.len(), path.display());
        Ok(())
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Labels are integers, but spreadsheet exports often write them
/// as `1.0`; accept any float with no fractional part.
fn parse_label(cell: &str, row: usize) -> std::result::Result<i64, DataError> {
    let trimmed = cell.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
        _ => Err(DataError::InvalidLabel { row, value: cell.to_string() }),
    }
}
