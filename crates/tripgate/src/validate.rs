//! Schema validation against the frozen contract.
//!
//! Presence and type problems on required fields are fatal; per-row
//! constraint violations are collected in full (every violation, with row
//! indices) and only fail the run when the valid-row ratio drops below
//! the contract's quality gate.

use std::path::Path;

use tracing::warn;

use crate::contract::{Contract, FieldSpec};
use crate::error::{Error, Result};
use crate::table::{parse_cell, Table};

/// A single per-row constraint violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Zero-based row index in the table.
    pub row: usize,
    /// Column the violation is in.
    pub column: String,
    /// What was violated.
    pub reason: String,
}

/// Outcome of validating one table.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Rows in the table.
    pub rows: usize,
    /// Every constraint violation found.
    pub violations: Vec<Violation>,
    /// Rows with at least one violation.
    pub invalid_rows: usize,
    /// Ratio of violation-free rows; 1.0 for an empty table.
    pub valid_ratio: f64,
}

/// Validates tables against a contract.
#[derive(Debug)]
pub struct SchemaValidator<'a> {
    contract: &'a Contract,
}

impl<'a> SchemaValidator<'a> {
    /// Create a validator for the given contract.
    #[must_use]
    pub fn new(contract: &'a Contract) -> Self {
        Self { contract }
    }

    /// Validate one table.
    ///
    /// # Errors
    ///
    /// - [`Error::SchemaViolation`] when a required field is missing, or
    ///   present but unparseable in every non-empty cell (mistyped).
    /// - [`Error::QualityGate`] when the valid-row ratio falls below the
    ///   contract's `valid_rows_ratio_min`. Individual violations are
    ///   logged as warnings either way.
    pub fn validate(&self, table: &Table, path: &Path) -> Result<ValidationReport> {
        // Presence first: a missing required field is fatal regardless of
        // how clean the remaining columns are.
        let missing: Vec<&str> = self
            .contract
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .filter(|name| !table.has_column(name))
            .collect();
        if !missing.is_empty() {
            return Err(Error::schema(
                path,
                format!("missing required field(s): {}", missing.join(", ")),
            ));
        }

        let mut violations = Vec::new();
        for field in &self.contract.fields {
            self.check_field(table, field, path, &mut violations)?;
        }
        violations.sort_by(|a, b| (a.row, &a.column).cmp(&(b.row, &b.column)));

        let mut flagged = vec![false; table.row_count()];
        for violation in &violations {
            flagged[violation.row] = true;
        }
        let invalid_rows = flagged.iter().filter(|f| **f).count();
        let valid_ratio = if table.row_count() == 0 {
            1.0
        } else {
            (table.row_count() - invalid_rows) as f64 / table.row_count() as f64
        };

        for violation in &violations {
            warn!(
                table = %path.display(),
                row = violation.row,
                column = %violation.column,
                "{}",
                violation.reason
            );
        }

        let minimum = self.contract.conformance.valid_rows_ratio_min;
        if valid_ratio < minimum {
            return Err(Error::QualityGate {
                path: path.to_path_buf(),
                ratio: valid_ratio,
                minimum,
            });
        }

        Ok(ValidationReport {
            rows: table.row_count(),
            violations,
            invalid_rows,
            valid_ratio,
        })
    }

    /// Per-field type and constraint checks.
    fn check_field(
        &self,
        table: &Table,
        field: &FieldSpec,
        path: &Path,
        violations: &mut Vec<Violation>,
    ) -> Result<()> {
        if !field.field_type.is_numeric() {
            return Ok(());
        }
        let idx = table
            .column_index(&field.name)
            .ok_or_else(|| Error::internal(format!("field '{}' vanished", field.name)))?;

        let mut non_empty = 0usize;
        let mut parse_failures = 0usize;
        let mut previous: Option<f64> = None;
        for (row, cells) in table.rows().iter().enumerate() {
            let cell = cells[idx].trim();
            if cell.is_empty() {
                violations.push(Violation {
                    row,
                    column: field.name.clone(),
                    reason: "empty value for required field".to_string(),
                });
                continue;
            }
            non_empty += 1;
            let Some(value) = parse_cell(cell) else {
                parse_failures += 1;
                violations.push(Violation {
                    row,
                    column: field.name.clone(),
                    reason: format!("value '{cell}' is not a number"),
                });
                continue;
            };
            if let Some(reason) = field.constraints.check_value(value) {
                violations.push(Violation {
                    row,
                    column: field.name.clone(),
                    reason,
                });
            }
            if field.constraints.monotonic_non_decreasing {
                if let Some(prev) = previous {
                    if value < prev {
                        violations.push(Violation {
                            row,
                            column: field.name.clone(),
                            reason: format!("value {value} decreases from {prev}"),
                        });
                    }
                }
                previous = Some(value);
            }
        }

        // A present column where nothing parses is a mistyped field, not
        // row-level noise.
        if non_empty > 0 && parse_failures == non_empty {
            return Err(Error::schema(
                path,
                format!("field '{}' is mistyped: no value parses as a number", field.name),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::sample_contract;

    fn telemetry_row(t: &str, lat: &str, lon: &str, speed: &str, accel: &str, heading: &str) -> Vec<String> {
        [t, lat, lon, speed, accel, heading]
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn telemetry_table(rows: &[Vec<String>]) -> Table {
        let mut table = Table::new(
            ["timestamp", "lat", "lon", "speed", "accel", "heading"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        );
        for row in rows {
            table.push_row(row.clone()).unwrap();
        }
        table
    }

    #[test]
    fn test_conforming_table_passes() {
        let contract = sample_contract();
        let table = telemetry_table(&[
            telemetry_row("100", "57.7", "11.97", "13.9", "0.2", "350.0"),
            telemetry_row("101", "57.7001", "11.9701", "14.1", "0.1", "10.0"),
        ]);
        let report = SchemaValidator::new(&contract)
            .validate(&table, Path::new("trip.csv"))
            .unwrap();
        assert!(report.violations.is_empty());
        assert_eq!(report.invalid_rows, 0);
        assert!((report.valid_ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_field_is_fatal_and_named() {
        let contract = sample_contract();
        let mut table = telemetry_table(&[telemetry_row(
            "100", "57.7", "11.97", "13.9", "0.2", "350.0",
        )]);
        table.drop_column("heading");

        let err = SchemaValidator::new(&contract)
            .validate(&table, Path::new("trip.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { .. }));
        assert!(err.to_string().contains("heading"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_range_violations_are_warnings_below_gate() {
        let contract = sample_contract();
        // 1 bad row out of 40: ratio 0.975 stays above the 0.95 gate.
        let mut rows: Vec<Vec<String>> = (0..39)
            .map(|i| {
                telemetry_row(
                    &format!("{}", 100 + i),
                    "57.7",
                    "11.97",
                    "13.9",
                    "0.2",
                    "10.0",
                )
            })
            .collect();
        rows.push(telemetry_row("139", "95.0", "11.97", "13.9", "0.2", "10.0"));
        let table = telemetry_table(&rows);

        let report = SchemaValidator::new(&contract)
            .validate(&table, Path::new("trip.csv"))
            .unwrap();
        assert_eq!(report.invalid_rows, 1);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].row, 39);
        assert_eq!(report.violations[0].column, "lat");
    }

    #[test]
    fn test_gate_failure_below_threshold() {
        let contract = sample_contract();
        // 2 bad rows out of 10: ratio 0.8 < 0.95.
        let mut rows: Vec<Vec<String>> = (0..8)
            .map(|i| {
                telemetry_row(
                    &format!("{}", 100 + i),
                    "57.7",
                    "11.97",
                    "13.9",
                    "0.2",
                    "10.0",
                )
            })
            .collect();
        rows.push(telemetry_row("108", "57.7", "11.97", "-3.0", "0.2", "10.0"));
        rows.push(telemetry_row("109", "57.7", "11.97", "13.9", "0.2", "360.0"));
        let table = telemetry_table(&rows);

        let err = SchemaValidator::new(&contract)
            .validate(&table, Path::new("trip.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::QualityGate { .. }));
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn test_every_violation_is_reported_with_row_indices() {
        let contract = sample_contract();
        let mut rows: Vec<Vec<String>> = (0..60)
            .map(|i| {
                telemetry_row(
                    &format!("{}", 100 + i),
                    "57.7",
                    "11.97",
                    "13.9",
                    "0.2",
                    "10.0",
                )
            })
            .collect();
        // Two violations in one row, one in another; 58/60 valid > 0.95.
        rows[5] = telemetry_row("105", "95.0", "11.97", "-1.0", "0.2", "10.0");
        rows[9] = telemetry_row("109", "57.7", "200.0", "13.9", "0.2", "10.0");
        let table = telemetry_table(&rows);

        let report = SchemaValidator::new(&contract)
            .validate(&table, Path::new("trip.csv"))
            .unwrap();
        assert_eq!(report.violations.len(), 3);
        assert_eq!(report.invalid_rows, 2);
        let rows_hit: Vec<usize> = report.violations.iter().map(|v| v.row).collect();
        assert_eq!(rows_hit, [5, 5, 9]);
    }

    #[test]
    fn test_non_monotonic_timestamps_are_violations() {
        let contract = sample_contract();
        let mut rows: Vec<Vec<String>> = (0..40)
            .map(|i| {
                telemetry_row(
                    &format!("{}", 100 + i),
                    "57.7",
                    "11.97",
                    "13.9",
                    "0.2",
                    "10.0",
                )
            })
            .collect();
        rows[20][0] = "90".to_string();

        let table = telemetry_table(&rows);
        let report = SchemaValidator::new(&contract)
            .validate(&table, Path::new("trip.csv"))
            .unwrap();
        // Row 20 drops below row 19; row 21 is above 90 again, so the
        // dip is a single violation.
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].row, 20);
        assert!(report.violations[0].reason.contains("decreases"));
    }

    #[test]
    fn test_fully_unparseable_column_is_mistyped() {
        let contract = sample_contract();
        let table = telemetry_table(&[
            telemetry_row("100", "57.7", "11.97", "fast", "0.2", "10.0"),
            telemetry_row("101", "57.7", "11.97", "slow", "0.2", "10.0"),
        ]);
        let err = SchemaValidator::new(&contract)
            .validate(&table, Path::new("trip.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { .. }));
        assert!(err.to_string().contains("speed"));
        assert!(err.to_string().contains("mistyped"));
    }

    #[test]
    fn test_empty_table_passes_with_ratio_one() {
        let contract = sample_contract();
        let table = telemetry_table(&[]);
        let report = SchemaValidator::new(&contract)
            .validate(&table, Path::new("trip.csv"))
            .unwrap();
        assert!((report.valid_ratio - 1.0).abs() < f64::EPSILON);
    }
}
