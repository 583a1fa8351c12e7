//! Heuristic identifier scan.
//!
//! Flags columns that look like identifying data before de-identification:
//! identifier-shaped column names, email- or phone-shaped values,
//! over-precise coordinates, and millisecond timestamps.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use super::precision::decimal_places;
use crate::table::{parse_cell, Table};

/// A named column-name heuristic.
#[derive(Debug)]
pub struct NamePattern {
    /// Short identifier for the heuristic.
    pub name: &'static str,

    /// What the heuristic matches.
    pub description: &'static str,

    /// The compiled regex, matched against lowercased column names.
    regex: Regex,
}

impl NamePattern {
    fn new(name: &'static str, description: &'static str, pattern: &str) -> Self {
        Self {
            name,
            description,
            regex: Regex::new(pattern).expect("Invalid name pattern"),
        }
    }

    /// Check whether a column name matches this heuristic.
    #[must_use]
    pub fn matches(&self, column: &str) -> bool {
        self.regex.is_match(&column.to_lowercase())
    }
}

/// The built-in identifier column-name heuristics.
#[must_use]
pub fn builtin_name_patterns() -> Vec<NamePattern> {
    vec![
        NamePattern::new("driver_id", "Driver identifiers", r"driver[_\- ]?id"),
        NamePattern::new("person_id", "Person identifiers", r"person[_\- ]?id"),
        NamePattern::new("plate", "License plates", r"plate|license[_\- ]?plate"),
        NamePattern::new("vin", "Vehicle identification numbers", r"\bvin\b"),
        NamePattern::new("phone", "Phone numbers", r"phone|mobile|tel"),
        NamePattern::new("email", "Email addresses", r"email"),
        NamePattern::new(
            "address",
            "Street addresses",
            r"address|street|house|postcode|zip",
        ),
        NamePattern::new("name", "Personal names", r"name|surname|firstname|lastname"),
        NamePattern::new(
            "device_id",
            "Device identifiers",
            r"device[_\- ]?id|imei|imsi|mac",
        ),
        NamePattern::new("ip_address", "IP addresses", r"ip[_\- ]?addr|ipaddress"),
        NamePattern::new(
            "national_id",
            "National identifiers",
            r"ssn|national[_\- ]?id|passport",
        ),
    ]
}

/// One scan finding against a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFinding {
    /// Column the finding is about.
    pub column: String,
    /// Why the column was flagged.
    pub reason: String,
}

/// Result of scanning one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Findings, in column order.
    pub findings: Vec<ScanFinding>,
    /// Precision and granularity metrics, keyed by metric name.
    pub metrics: BTreeMap<String, String>,
    /// Rows actually scanned (bounded by the row limit).
    pub rows_scanned: usize,
}

impl ScanReport {
    /// Whether the scan found anything.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Scans tables for likely identifying data.
#[derive(Debug)]
pub struct IdentifierScanner {
    name_patterns: Vec<NamePattern>,
    email_regex: Regex,
    phone_regex: Regex,
    row_limit: usize,
    value_sample: usize,
    high_precision_decimals: f64,
}

impl IdentifierScanner {
    /// Create a scanner with the given sampling bounds.
    ///
    /// `row_limit` bounds how many rows are examined, `value_sample` how
    /// many values per column feed the value-shape heuristics, and
    /// `high_precision_decimals` is the average decimal count at which
    /// coordinates are flagged as over-precise.
    #[must_use]
    pub fn new(row_limit: usize, value_sample: usize, high_precision_decimals: f64) -> Self {
        Self {
            name_patterns: builtin_name_patterns(),
            email_regex: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email pattern"),
            phone_regex: Regex::new(r"^\+?\d[\d\-\s]{6,}$").expect("Invalid phone pattern"),
            row_limit,
            value_sample,
            high_precision_decimals,
        }
    }

    /// Scan one table.
    #[must_use]
    pub fn scan(&self, table: &Table) -> ScanReport {
        let mut report = ScanReport {
            rows_scanned: table.row_count().min(self.row_limit),
            ..ScanReport::default()
        };

        for column in table.columns() {
            let mut reasons = Vec::new();
            if let Some(pattern) = self.name_patterns.iter().find(|p| p.matches(column)) {
                debug!(%column, pattern = %pattern.name, "column name matches identifier heuristic");
                reasons.push(format!(
                    "column name matches identifier heuristic '{}'",
                    pattern.name
                ));
            }
            reasons.extend(self.value_shape_reasons(table, column));
            if !reasons.is_empty() {
                report.findings.push(ScanFinding {
                    column: column.clone(),
                    reason: reasons.join("; "),
                });
            }
        }

        for column in ["lat", "lon"] {
            if let Some(avg) = self.average_decimals(table, column) {
                report
                    .metrics
                    .insert(format!("{column}_avg_decimal_places"), format!("{avg:.2}"));
                if avg >= self.high_precision_decimals {
                    report.findings.push(ScanFinding {
                        column: column.to_string(),
                        reason: format!(
                            "coordinate precision appears high (avg {avg:.2} decimals); \
                             round to 4"
                        ),
                    });
                }
            }
        }

        if let Some(values) = table.numeric_column("timestamp") {
            let bounded = &values[..values.len().min(self.row_limit)];
            let mut present: Vec<f64> = bounded.iter().copied().flatten().collect();
            if !present.is_empty() {
                present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let median = present[present.len() / 2];
                let granularity = if median > 1e11 { "milliseconds" } else { "seconds" };
                report
                    .metrics
                    .insert("timestamp_granularity".to_string(), granularity.to_string());
                if granularity == "milliseconds" {
                    report.findings.push(ScanFinding {
                        column: "timestamp".to_string(),
                        reason: "timestamp appears to be in milliseconds; convert to seconds"
                            .to_string(),
                    });
                }
            }
        }

        report
    }

    /// Value-shape reasons for one column, over a bounded sample.
    ///
    /// The phone heuristic only fires on cells that do not parse as
    /// numbers; a bare digit string is indistinguishable from a
    /// measurement, while dashes, spaces, or a leading `+` are not.
    fn value_shape_reasons(&self, table: &Table, column: &str) -> Vec<String> {
        let Some(idx) = table.column_index(column) else {
            return Vec::new();
        };
        let sample = table
            .rows()
            .iter()
            .take(self.row_limit)
            .map(|row| row[idx].trim())
            .filter(|cell| !cell.is_empty())
            .take(self.value_sample);

        let mut email = false;
        let mut phone = false;
        for cell in sample {
            email = email || self.email_regex.is_match(cell);
            phone = phone || (parse_cell(cell).is_none() && self.phone_regex.is_match(cell));
        }

        let mut reasons = Vec::new();
        if email {
            reasons.push("contains email-like values".to_string());
        }
        if phone {
            reasons.push("contains phone-like values".to_string());
        }
        reasons
    }

    /// Average decimal places of a numeric column over the row limit.
    fn average_decimals(&self, table: &Table, column: &str) -> Option<f64> {
        let values = table.numeric_column(column)?;
        let bounded: Vec<f64> = values
            .iter()
            .take(self.row_limit)
            .copied()
            .flatten()
            .collect();
        if bounded.is_empty() {
            return None;
        }
        let total: u64 = bounded.iter().map(|v| u64::from(decimal_places(*v))).sum();
        Some(total as f64 / bounded.len() as f64)
    }
}

impl Default for IdentifierScanner {
    fn default() -> Self {
        Self::new(2000, 30, 6.0)
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
    fn test_builtin_name_patterns_have_names() {
        let patterns = builtin_name_patterns();
        assert!(patterns.len() >= 10);
        for pattern in patterns {
            assert!(!pattern.name.is_empty());
            assert!(!pattern.description.is_empty());
        }
    }

    #[test]
    fn test_identifier_column_names_are_flagged() {
        let table = table_with(
            &["driver_id", "speed"],
            &[&["u1", "3.0"], &["u2", "4.0"]],
        );
        let report = IdentifierScanner::default().scan(&table);
        assert!(!report.is_clean());
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].column, "driver_id");
        assert!(report.findings[0].reason.contains("driver_id"));
    }

    #[test]
    fn test_case_insensitive_name_match() {
        let patterns = builtin_name_patterns();
        let plate = patterns.iter().find(|p| p.name == "plate").unwrap();
        assert!(plate.matches("License_Plate"));
        assert!(plate.matches("PLATE"));
        assert!(!plate.matches("speed"));
    }

    #[test]
    fn test_email_values_are_flagged() {
        let table = table_with(
            &["contact"],
            &[&["alice@example.com"], &["bob@example.com"]],
        );
        let report = IdentifierScanner::default().scan(&table);
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].reason.contains("email-like"));
    }

    #[test]
    fn test_phone_values_are_flagged() {
        let table = table_with(&["emergency"], &[&["+46 70-123 4567"]]);
        let report = IdentifierScanner::default().scan(&table);
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].reason.contains("phone-like"));
    }

    #[test]
    fn test_numeric_telemetry_is_not_phone_like() {
        let table = table_with(
            &["timestamp", "speed"],
            &[&["1700000000", "13.9"], &["1700000001", "14.2"]],
        );
        let report = IdentifierScanner::default().scan(&table);
        assert!(report.is_clean());
    }

    #[test]
    fn test_over_precise_coordinates_are_flagged() {
        let table = table_with(
            &["lat", "lon"],
            &[
                &["57.70001234", "11.97000987"],
                &["57.70003456", "11.97009876"],
            ],
        );
        let report = IdentifierScanner::default().scan(&table);
        assert_eq!(report.findings.len(), 2);
        assert!(report.metrics.contains_key("lat_avg_decimal_places"));
        assert!(report.metrics.contains_key("lon_avg_decimal_places"));
    }

    #[test]
    fn test_rounded_coordinates_are_clean() {
        let table = table_with(&["lat", "lon"], &[&["57.7", "11.9701"]]);
        let report = IdentifierScanner::default().scan(&table);
        assert!(report.is_clean());
        assert_eq!(report.metrics["lat_avg_decimal_places"], "1.00");
    }

    #[test]
    fn test_millisecond_timestamps_are_flagged() {
        let table = table_with(&["timestamp"], &[&["1700000000123"]]);
        let report = IdentifierScanner::default().scan(&table);
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].reason.contains("milliseconds"));
        assert_eq!(report.metrics["timestamp_granularity"], "milliseconds");
    }

    #[test]
    fn test_second_timestamps_record_metric_only() {
        let table = table_with(&["timestamp"], &[&["1700000000"]]);
        let report = IdentifierScanner::default().scan(&table);
        assert!(report.is_clean());
        assert_eq!(report.metrics["timestamp_granularity"], "seconds");
    }

    #[test]
    fn test_row_limit_bounds_scanning() {
        let mut table = Table::new(vec!["contact".to_string()]);
        table.push_row(vec!["nothing".to_string()]).unwrap();
        table.push_row(vec!["alice@example.com".to_string()]).unwrap();

        let scanner = IdentifierScanner::new(1, 30, 6.0);
        let report = scanner.scan(&table);
        assert!(report.is_clean());
        assert_eq!(report.rows_scanned, 1);
    }

    #[test]
    fn test_combined_name_and_value_reasons() {
        let table = table_with(&["email"], &[&["alice@example.com"]]);
        let report = IdentifierScanner::default().scan(&table);
        assert_eq!(report.findings.len(), 1);
        let reason = &report.findings[0].reason;
        assert!(reason.contains("identifier heuristic"));
        assert!(reason.contains("email-like"));
    }
}
