//! Human-readable audit summaries.
//!
//! Each pipeline command writes a markdown record of what it did or found,
//! kept for compliance review rather than downstream consumption. Reports
//! carry no generation timestamps: identical runs produce identical bytes.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::audit::precision::PrecisionReport;
use crate::audit::scan::ScanReport;
use crate::deidentify::DeidSummary;
use crate::error::{Error, Result};

/// Write a rendered report, creating parent directories.
fn write_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Render the de-identification summary.
#[must_use]
pub fn render_deidentify_summary(summary: &DeidSummary) -> String {
    let mut out = String::new();
    out.push_str("# De-identification Summary\n\n");
    let _ = writeln!(out, "- Files processed: {}", summary.files_processed);
    let _ = writeln!(out, "- Rows processed: {}", summary.rows_processed);
    if summary.hashing_skipped {
        out.push_str("- Hashing skipped (dry run): linkable identifiers left in place\n");
    }
    out.push('\n');

    let sections = [
        ("Dropped columns", &summary.columns_dropped),
        ("Hashed columns", &summary.columns_hashed),
        ("Geo precision applied", &summary.columns_rounded),
        ("Timestamp normalization", &summary.timestamps_normalized),
    ];
    for (title, counts) in sections {
        let _ = writeln!(out, "## {title}\n");
        if counts.is_empty() {
            out.push_str("None\n\n");
        } else {
            for (column, files) in counts {
                let _ = writeln!(out, "- {column}: {files} file(s)");
            }
            out.push('\n');
        }
    }

    out.push_str("## Outputs\n\n");
    if summary.outputs.is_empty() {
        out.push_str("None\n");
    } else {
        for output in &summary.outputs {
            let _ = writeln!(out, "- {}", output.display());
        }
    }
    out
}

/// Write the de-identification summary to `path`.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub fn write_deidentify_summary(path: &Path, summary: &DeidSummary) -> Result<()> {
    write_report(path, &render_deidentify_summary(summary))
}

/// Render the precision audit report over one or more tables.
#[must_use]
pub fn render_precision_report(reports: &[(PathBuf, PrecisionReport)]) -> String {
    let mut out = String::new();
    out.push_str("# Precision Audit Report\n\n");
    if reports.is_empty() {
        out.push_str("No tables audited.\n");
        return out;
    }

    let mut all_passed = true;
    for (path, report) in reports {
        let _ = writeln!(out, "## {}\n", path.display());
        let _ = writeln!(out, "- Rows: {}", report.rows);
        for check in &report.checks {
            let verdict = if check.passed { "OK" } else { "FAIL" };
            let _ = writeln!(
                out,
                "- `{}` {}: {} ({} violating row(s))",
                check.column, check.requirement, verdict, check.violating_rows
            );
            all_passed = all_passed && check.passed;
        }
        out.push('\n');
    }

    out.push_str("## Result\n\n");
    out.push_str(if all_passed { "PASS\n" } else { "CHECK REQUIRED\n" });
    out
}

/// Write the precision audit report to `path`.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub fn write_precision_report(path: &Path, reports: &[(PathBuf, PrecisionReport)]) -> Result<()> {
    write_report(path, &render_precision_report(reports))
}

/// Render the identifier scan report over one or more tables.
#[must_use]
pub fn render_scan_report(reports: &[(PathBuf, ScanReport)]) -> String {
    let mut out = String::new();
    out.push_str("# Identifier Scan Report\n\n");

    let total_findings: usize = reports.iter().map(|(_, r)| r.findings.len()).sum();
    out.push_str("## Findings\n\n");
    if total_findings == 0 {
        out.push_str("No identifier-like columns detected by the current heuristics.\n\n");
    } else {
        out.push_str("| Table | Column | Reason |\n");
        out.push_str("|-------|--------|--------|\n");
        for (path, report) in reports {
            for finding in &report.findings {
                let _ = writeln!(
                    out,
                    "| {} | {} | {} |",
                    path.display(),
                    finding.column,
                    finding.reason
                );
            }
        }
        out.push('\n');
    }

    out.push_str("## Precision & Granularity Metrics\n\n");
    let has_metrics = reports.iter().any(|(_, r)| !r.metrics.is_empty());
    if has_metrics {
        out.push_str("| Table | Metric | Value |\n");
        out.push_str("|-------|--------|-------|\n");
        for (path, report) in reports {
            for (metric, value) in &report.metrics {
                let _ = writeln!(out, "| {} | {metric} | {value} |", path.display());
            }
        }
    } else {
        out.push_str("No metrics collected.\n");
    }
    out
}

/// Write the identifier scan report to `path`.
///
/// # Errors
///
/// Returns an error if the report cannot be written.
pub fn write_scan_report(path: &Path, reports: &[(PathBuf, ScanReport)]) -> Result<()> {
    write_report(path, &render_scan_report(reports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::precision::PrecisionCheck;
    use crate::audit::scan::ScanFinding;

    fn sample_summary() -> DeidSummary {
        let mut summary = DeidSummary {
            files_processed: 2,
            rows_processed: 200,
            ..DeidSummary::default()
        };
        summary.columns_dropped.insert("name".to_string(), 2);
        summary.columns_hashed.insert("driver_id".to_string(), 1);
        summary.outputs.push(PathBuf::from("data/clean/trip.csv"));
        summary
    }

    #[test]
    fn test_deidentify_summary_sections() {
        let rendered = render_deidentify_summary(&sample_summary());
        assert!(rendered.starts_with("# De-identification Summary"));
        assert!(rendered.contains("- Files processed: 2"));
        assert!(rendered.contains("- name: 2 file(s)"));
        assert!(rendered.contains("- driver_id: 1 file(s)"));
        assert!(rendered.contains("## Geo precision applied\n\nNone"));
        assert!(rendered.contains("data/clean/trip.csv"));
        assert!(!rendered.contains("dry run"));
    }

    #[test]
    fn test_deidentify_summary_notes_dry_run() {
        let summary = DeidSummary {
            hashing_skipped: true,
            ..DeidSummary::default()
        };
        let rendered = render_deidentify_summary(&summary);
        assert!(rendered.contains("Hashing skipped (dry run)"));
    }

    #[test]
    fn test_precision_report_pass_and_fail() {
        let passing = PrecisionReport {
            rows: 10,
            checks: vec![PrecisionCheck {
                column: "lat".to_string(),
                requirement: "decimals <= 4".to_string(),
                passed: true,
                violating_rows: 0,
            }],
        };
        let rendered = render_precision_report(&[(PathBuf::from("a.csv"), passing.clone())]);
        assert!(rendered.contains("`lat` decimals <= 4: OK (0 violating row(s))"));
        assert!(rendered.ends_with("PASS\n"));

        let failing = PrecisionReport {
            rows: 10,
            checks: vec![PrecisionCheck {
                column: "timestamp".to_string(),
                requirement: "integral seconds".to_string(),
                passed: false,
                violating_rows: 3,
            }],
        };
        let rendered = render_precision_report(&[
            (PathBuf::from("a.csv"), passing),
            (PathBuf::from("b.csv"), failing),
        ]);
        assert!(rendered.contains("FAIL (3 violating row(s))"));
        assert!(rendered.ends_with("CHECK REQUIRED\n"));
    }

    #[test]
    fn test_scan_report_with_findings() {
        let mut report = ScanReport::default();
        report.findings.push(ScanFinding {
            column: "driver_id".to_string(),
            reason: "column name matches identifier heuristic 'driver_id'".to_string(),
        });
        report
            .metrics
            .insert("lat_avg_decimal_places".to_string(), "6.20".to_string());

        let rendered = render_scan_report(&[(PathBuf::from("raw.csv"), report)]);
        assert!(rendered.contains("| raw.csv | driver_id |"));
        assert!(rendered.contains("| raw.csv | lat_avg_decimal_places | 6.20 |"));
    }

    #[test]
    fn test_scan_report_clean() {
        let rendered = render_scan_report(&[(PathBuf::from("clean.csv"), ScanReport::default())]);
        assert!(rendered.contains("No identifier-like columns detected"));
        assert!(rendered.contains("No metrics collected."));
    }

    #[test]
    fn test_reports_are_written_and_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("deidentify_summary.md");

        write_deidentify_summary(&path, &sample_summary()).unwrap();
        let first = std::fs::read(&path).unwrap();
        write_deidentify_summary(&path, &sample_summary()).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
