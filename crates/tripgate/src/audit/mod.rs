//! Read-only audits over telemetry tables.
//!
//! Two audits share this module, and neither mutates data:
//!
//! - [`precision`]: checks that coordinates carry at most four decimal
//!   places and that timestamps are whole seconds, with per-check
//!   violating-row counts. Run on raw data it detects the need for
//!   de-identification; run on clean data it confirms compliance.
//!
//! - [`scan`]: heuristic identifier detection: column names that look
//!   like identifiers, values shaped like emails or phone numbers,
//!   over-precise coordinates, millisecond timestamps.

pub mod precision;
pub mod scan;

pub use precision::{PrecisionAuditor, PrecisionCheck, PrecisionReport};
pub use scan::{IdentifierScanner, ScanFinding, ScanReport};
