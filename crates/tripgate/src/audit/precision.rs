//! Precision audit: rounding and timestamp-granularity policy checks.

use crate::deidentify::DeidPolicy;
use crate::table::Table;

/// Timestamp columns whose median exceeds this read as milliseconds.
const MILLISECONDS_MEDIAN_THRESHOLD: f64 = 1e11;

/// Outcome of a single precision check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecisionCheck {
    /// Column the check ran against.
    pub column: String,
    /// What was checked, e.g. `decimals <= 4`.
    pub requirement: String,
    /// Whether the column conforms.
    pub passed: bool,
    /// Number of rows violating the requirement.
    pub violating_rows: usize,
}

/// Result of auditing one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecisionReport {
    /// Rows in the audited table.
    pub rows: usize,
    /// Per-column check outcomes.
    pub checks: Vec<PrecisionCheck>,
}

impl PrecisionReport {
    /// Whether every check passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// The largest violating-row ratio across checks, in `[0, 1]`.
    #[must_use]
    pub fn worst_violation_ratio(&self) -> f64 {
        if self.rows == 0 {
            return 0.0;
        }
        let worst = self.checks.iter().map(|c| c.violating_rows).max();
        worst.map_or(0.0, |count| count as f64 / self.rows as f64)
    }
}

/// Audits tables against the precision reduction policy.
#[derive(Debug)]
pub struct PrecisionAuditor {
    geo_columns: Vec<String>,
    geo_decimals: u32,
    timestamp_column: String,
}

impl PrecisionAuditor {
    /// Build an auditor that checks the promises a [`DeidPolicy`] makes.
    #[must_use]
    pub fn from_policy(policy: &DeidPolicy) -> Self {
        Self {
            geo_columns: policy.geo_columns.clone(),
            geo_decimals: policy.geo_decimals,
            timestamp_column: policy.timestamp_column.clone(),
        }
    }

    /// Audit one table. Absent columns are skipped, not failed; the schema
    /// validator owns presence checks.
    #[must_use]
    pub fn audit(&self, table: &Table) -> PrecisionReport {
        let mut checks = Vec::new();

        for column in &self.geo_columns {
            if let Some(values) = table.numeric_column(column) {
                let violating = values
                    .iter()
                    .filter(|v| v.is_some_and(|v| decimal_places(v) > self.geo_decimals))
                    .count();
                checks.push(PrecisionCheck {
                    column: column.clone(),
                    requirement: format!("decimals <= {}", self.geo_decimals),
                    passed: violating == 0,
                    violating_rows: violating,
                });
            }
        }

        if let Some(values) = table.numeric_column(&self.timestamp_column) {
            let non_integral = values
                .iter()
                .filter(|v| v.is_some_and(|v| v.fract() != 0.0))
                .count();
            checks.push(PrecisionCheck {
                column: self.timestamp_column.clone(),
                requirement: "integral seconds".to_string(),
                passed: non_integral == 0,
                violating_rows: non_integral,
            });

            // Millisecond-scale columns are integral yet still wrong: every
            // row carries the violation.
            let scale = timestamp_scale(&values);
            let milliseconds = scale == TimestampScale::Milliseconds;
            checks.push(PrecisionCheck {
                column: self.timestamp_column.clone(),
                requirement: "seconds-scale epoch".to_string(),
                passed: !milliseconds,
                violating_rows: if milliseconds { table.row_count() } else { 0 },
            });
        }

        PrecisionReport {
            rows: table.row_count(),
            checks,
        }
    }
}

/// Estimated scale of an epoch timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimestampScale {
    Milliseconds,
    SecondsOrSmaller,
}

fn timestamp_scale(values: &[Option<f64>]) -> TimestampScale {
    let mut present: Vec<f64> = values.iter().copied().flatten().collect();
    if present.is_empty() {
        return TimestampScale::SecondsOrSmaller;
    }
    present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = present[present.len() / 2];
    if median > MILLISECONDS_MEDIAN_THRESHOLD {
        TimestampScale::Milliseconds
    } else {
        TimestampScale::SecondsOrSmaller
    }
}

/// Count the meaningful decimal places of a value.
///
/// The value is rendered with 12 fractional digits and trailing zeros are
/// trimmed, so binary representation noise beyond that width does not
/// count as precision.
#[must_use]
pub(crate) fn decimal_places(value: f64) -> u32 {
    let rendered = format!("{value:.12}");
    let trimmed = rendered.trim_end_matches('0');
    match trimmed.split_once('.') {
        Some((_, fraction)) => u32::try_from(fraction.len()).unwrap_or(u32::MAX),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut table = Table::new(columns.iter().map(ToString::to_string).collect());
        for row in rows {
            table
                .push_row(row.iter().map(ToString::to_string).collect())
                .unwrap();
        }
        table
    }

    #[test]
    fn test_decimal_places() {
        assert_eq!(decimal_places(57.1235), 4);
        assert_eq!(decimal_places(57.123456), 6);
        assert_eq!(decimal_places(57.0), 0);
        assert_eq!(decimal_places(-11.97), 2);
        assert_eq!(decimal_places(57.1), 1);
    }

    #[test]
    fn test_clean_table_passes() {
        let table = table_with(
            &["timestamp", "lat", "lon"],
            &[
                &["1700000000", "57.7", "11.9701"],
                &["1700000001", "57.7001", "11.9702"],
            ],
        );
        let report = PrecisionAuditor::from_policy(&DeidPolicy::default()).audit(&table);
        assert!(report.passed());
        assert!(report.worst_violation_ratio() < f64::EPSILON);
    }

    #[test]
    fn test_over_precise_coordinates_fail_with_counts() {
        let table = table_with(
            &["timestamp", "lat", "lon"],
            &[
                &["1700000000", "57.700012", "11.9701"],
                &["1700000001", "57.7001", "11.970099"],
                &["1700000002", "57.7002", "11.9702"],
            ],
        );
        let report = PrecisionAuditor::from_policy(&DeidPolicy::default()).audit(&table);
        assert!(!report.passed());

        let lat = report.checks.iter().find(|c| c.column == "lat").unwrap();
        assert_eq!(lat.violating_rows, 1);
        let lon = report.checks.iter().find(|c| c.column == "lon").unwrap();
        assert_eq!(lon.violating_rows, 1);
    }

    #[test]
    fn test_fractional_timestamps_fail() {
        let table = table_with(
            &["timestamp"],
            &[&["1700000000.5"], &["1700000001"], &["1700000002.25"]],
        );
        let report = PrecisionAuditor::from_policy(&DeidPolicy::default()).audit(&table);
        let integral = report
            .checks
            .iter()
            .find(|c| c.requirement == "integral seconds")
            .unwrap();
        assert!(!integral.passed);
        assert_eq!(integral.violating_rows, 2);
    }

    #[test]
    fn test_millisecond_scale_fails_even_when_integral() {
        let table = table_with(&["timestamp"], &[&["1700000000123"], &["1700000000456"]]);
        let report = PrecisionAuditor::from_policy(&DeidPolicy::default()).audit(&table);
        assert!(!report.passed());

        let scale = report
            .checks
            .iter()
            .find(|c| c.requirement == "seconds-scale epoch")
            .unwrap();
        assert_eq!(scale.violating_rows, 2);
        assert_eq!(report.worst_violation_ratio(), 1.0);
    }

    #[test]
    fn test_absent_columns_are_skipped() {
        let table = table_with(&["speed"], &[&["1.0"]]);
        let report = PrecisionAuditor::from_policy(&DeidPolicy::default()).audit(&table);
        assert!(report.checks.is_empty());
        assert!(report.passed());
    }

    #[test]
    fn test_empty_table_ratio_is_zero() {
        let table = table_with(&["timestamp", "lat", "lon"], &[]);
        let report = PrecisionAuditor::from_policy(&DeidPolicy::default()).audit(&table);
        assert!(report.worst_violation_ratio().abs() < f64::EPSILON);
    }
}
