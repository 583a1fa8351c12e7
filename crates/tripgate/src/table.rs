//! In-memory delimited tables.
//!
//! Every pipeline stage is a single-pass transform over a [`Table`]: an
//! ordered header row plus string cells, read from and written to CSV
//! files. Cells are kept as text and parsed on demand so that tables with
//! columns outside the telemetry contract (identifier columns in raw data,
//! categorical annotations) pass through untouched.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A delimited table: column names plus rows of string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given column names.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Read a table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TableRead`] if the file cannot be opened or a
    /// record has the wrong number of fields.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|source| Error::TableRead {
            path: path.to_path_buf(),
            source,
        })?;

        let columns = reader
            .headers()
            .map_err(|source| Error::TableRead {
                path: path.to_path_buf(),
                source,
            })?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| Error::TableRead {
                path: path.to_path_buf(),
                source,
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { columns, rows })
    }

    /// Write the table to a CSV file, creating parent directories.
    ///
    /// Output is deterministic: identical tables serialize to identical
    /// bytes, which is what makes pipeline re-runs byte-identical.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DirectoryCreate`] or [`Error::TableWrite`] on
    /// filesystem failures.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let mut writer = csv::Writer::from_path(path).map_err(|source| Error::TableWrite {
            path: path.to_path_buf(),
            source,
        })?;
        writer
            .write_record(&self.columns)
            .and_then(|()| {
                for row in &self.rows {
                    writer.write_record(row)?;
                }
                writer.flush()?;
                Ok(())
            })
            .map_err(|source| Error::TableWrite {
                path: path.to_path_buf(),
                source,
            })
    }

    /// The column names, in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The rows, in order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check whether the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Check whether a column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Append a row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the row arity does not match the
    /// header.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::internal(format!(
                "row has {} cells, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// A column's cells parsed as numbers.
    ///
    /// Empty or unparseable cells become `None`. Returns `None` if the
    /// column does not exist.
    #[must_use]
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| parse_cell(&row[idx])).collect())
    }

    /// Whether a column reads as numeric: at least one non-empty cell, and
    /// every non-empty cell parses as a number.
    ///
    /// Used to decide between interpolation and forward-fill when
    /// resampling.
    #[must_use]
    pub fn is_numeric_column(&self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        let mut saw_value = false;
        for row in &self.rows {
            let cell = row[idx].trim();
            if cell.is_empty() {
                continue;
            }
            if cell.parse::<f64>().is_err() {
                return false;
            }
            saw_value = true;
        }
        saw_value
    }

    /// Remove a column. Returns `false` if it was not present.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        true
    }

    /// Rewrite every cell of a column in place. Returns `false` if the
    /// column was not present.
    pub fn map_column(&mut self, name: &str, mut f: impl FnMut(&str) -> String) -> bool {
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }
}

/// Parse a cell as a number; empty and unparseable cells are `None`.
#[must_use]
pub fn parse_cell(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Render a number with the shortest round-trip representation.
#[must_use]
pub fn format_number(value: f64) -> String {
    value.to_string()
}

/// Resolve an input path to a sorted list of CSV files.
///
/// A file path resolves to itself; a directory resolves to every `*.csv`
/// directly inside it, sorted by name.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be read.
pub fn resolve_csv_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path.is_file()
            && entry_path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            files.push(entry_path);
        }
    }
    files.sort();
    Ok(files)
}
