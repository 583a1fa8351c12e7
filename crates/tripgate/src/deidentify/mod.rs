//! De-identification of raw telemetry tables.
//!
//! Three reductions are applied before any table leaves the raw zone:
//!
//! - **Column removal**: direct-identifier columns (names) are dropped
//!   outright.
//!
//! - **Salted hashing**: linkable-identifier columns (driver or person
//!   ids) are replaced with a salted one-way SHA-256 digest, deterministic
//!   for a given salt so joins across files keep working.
//!
//! - **Precision reduction**: coordinates are rounded to four decimal
//!   places and timestamps normalized to whole seconds.
//!
//! The salt is a secret supplied via the `TRIPGATE_SALT` environment
//! variable. Hashing a linkable column without a salt is a hard failure;
//! a dry run without hashing must be requested explicitly.
//!
//! # Example
//!
//! ```no_run
//! use tripgate::deidentify::{DeidPolicy, DeidSummary, Deidentifier};
//! use tripgate::table::Table;
//!
//! let table = Table::read_csv(std::path::Path::new("data/raw/trip.csv"))?;
//! let deid = Deidentifier::new(DeidPolicy::default(), Some("salt".into()));
//! let mut summary = DeidSummary::default();
//! let clean = deid.apply(&table, &mut summary)?;
//! assert!(!clean.has_column("name"));
//! # Ok::<(), tripgate::Error>(())
//! ```

mod policy;
mod transform;

pub use policy::DeidPolicy;
pub use transform::{load_salt, salted_hash, DeidSummary, Deidentifier};
