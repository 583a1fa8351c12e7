//! The de-identification transform.

use std::collections::BTreeMap;
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::policy::DeidPolicy;
use crate::error::{Error, Result, SALT_ENV_VAR};
use crate::table::{parse_cell, Table};

/// Timestamp columns whose median exceeds this read as milliseconds.
const MILLISECONDS_MEDIAN_THRESHOLD: f64 = 1e11;

/// Read the de-identification salt from the environment.
///
/// An unset or empty `TRIPGATE_SALT` yields `None`.
#[must_use]
pub fn load_salt() -> Option<String> {
    std::env::var(SALT_ENV_VAR)
        .ok()
        .filter(|salt| !salt.is_empty())
}

/// Salted one-way hash of an identifier value.
///
/// Deterministic for a given `(salt, value)` pair so hashed identifiers
/// still join across files from the same run.
#[must_use]
pub fn salted_hash(salt: &str, value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Running counters across all files of a de-identification run.
///
/// Written out as the human-readable compliance summary; maps are ordered
/// so the summary is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeidSummary {
    /// Files processed.
    pub files_processed: usize,
    /// Total rows processed.
    pub rows_processed: usize,
    /// Direct-identifier columns dropped, per column name.
    pub columns_dropped: BTreeMap<String, usize>,
    /// Linkable-identifier columns hashed, per column name.
    pub columns_hashed: BTreeMap<String, usize>,
    /// Geospatial columns rounded, per column name.
    pub columns_rounded: BTreeMap<String, usize>,
    /// Timestamp columns normalized to seconds, per column name.
    pub timestamps_normalized: BTreeMap<String, usize>,
    /// Whether hashing was skipped for a dry run.
    pub hashing_skipped: bool,
    /// Output files written.
    pub outputs: Vec<PathBuf>,
}

/// Applies a [`DeidPolicy`] to tables.
#[derive(Debug)]
pub struct Deidentifier {
    policy: DeidPolicy,
    salt: Option<String>,
    hashing_enabled: bool,
}

impl Deidentifier {
    /// Create a de-identifier with hashing enabled.
    ///
    /// The salt may be absent; it is only required once a table actually
    /// contains a linkable-identifier column.
    #[must_use]
    pub fn new(policy: DeidPolicy, salt: Option<String>) -> Self {
        Self {
            policy,
            salt,
            hashing_enabled: true,
        }
    }

    /// Create a dry-run de-identifier that skips hashing entirely.
    ///
    /// Dropping, rounding, and timestamp normalization still apply.
    #[must_use]
    pub fn without_hashing(policy: DeidPolicy) -> Self {
        Self {
            policy,
            salt: None,
            hashing_enabled: false,
        }
    }

    /// De-identify one table, recording what happened into `summary`.
    ///
    /// The output table has the same row count as the input and the same
    /// columns minus the dropped ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSalt`] when hashing is enabled, a linkable
    /// column is present, and no salt is available.
    pub fn apply(&self, table: &Table, summary: &mut DeidSummary) -> Result<Table> {
        let mut out = table.clone();

        for column in &self.policy.drop_columns {
            if out.drop_column(column) {
                debug!(%column, "dropped direct-identifier column");
                *summary.columns_dropped.entry(column.clone()).or_insert(0) += 1;
            }
        }

        let present_hash_columns: Vec<&String> = self
            .policy
            .hash_columns
            .iter()
            .filter(|c| out.has_column(c))
            .collect();
        if !present_hash_columns.is_empty() {
            if !self.hashing_enabled {
                warn!("hashing skipped (dry run); linkable identifiers left in place");
                summary.hashing_skipped = true;
            } else {
                let salt = self.salt.as_deref().ok_or_else(|| Error::MissingSalt {
                    column: present_hash_columns[0].clone(),
                })?;
                for column in present_hash_columns {
                    out.map_column(column, |value| {
                        if value.is_empty() {
                            String::new()
                        } else {
                            salted_hash(salt, value)
                        }
                    });
                    *summary.columns_hashed.entry(column.clone()).or_insert(0) += 1;
                }
            }
        }

        for column in &self.policy.geo_columns {
            if out.map_column(column, |cell| round_cell(cell, self.policy.geo_decimals)) {
                *summary.columns_rounded.entry(column.clone()).or_insert(0) += 1;
            }
        }

        if normalize_timestamp_column(&mut out, &self.policy.timestamp_column) {
            *summary
                .timestamps_normalized
                .entry(self.policy.timestamp_column.clone())
                .or_insert(0) += 1;
        }

        summary.files_processed += 1;
        summary.rows_processed += out.row_count();
        Ok(out)
    }
}

/// Round a numeric cell to `decimals` places; non-numeric cells pass
/// through unchanged.
fn round_cell(cell: &str, decimals: u32) -> String {
    match parse_cell(cell) {
        Some(value) => crate::table::format_number(round_to_decimals(value, decimals)),
        None => cell.to_string(),
    }
}

/// Round a value to a fixed number of decimal places.
#[must_use]
pub(crate) fn round_to_decimals(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
    (value * factor).round() / factor
}

/// Normalize a timestamp column to whole seconds in place.
///
/// A column whose median magnitude exceeds 1e11 is taken as milliseconds
/// since epoch and floor-divided by 1000 first; otherwise sub-second
/// precision is floored away. Returns `false` if the column is absent or
/// has no numeric values.
fn normalize_timestamp_column(table: &mut Table, column: &str) -> bool {
    let Some(values) = table.numeric_column(column) else {
        return false;
    };
    let Some(median) = median(&values) else {
        return false;
    };
    let milliseconds = median > MILLISECONDS_MEDIAN_THRESHOLD;

    table.map_column(column, |cell| match parse_cell(cell) {
        Some(value) => {
            let seconds = if milliseconds { value / 1000.0 } else { value };
            format!("{}", seconds.floor() as i64)
        }
        None => cell.to_string(),
    });
    true
}

/// Median of the present values; `None` when there are none.
fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().copied().flatten().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}
