//! `tripgate` - contract-driven standardization for driving telemetry.
//!
//! This library implements an offline batch pipeline over delimited
//! telemetry tables: de-identification (drop, hash, reduce precision),
//! read-only audits, schema validation against a frozen data contract,
//! resampling onto the contract's uniform clock, and lock-based drift
//! protection for the contract itself. Every stage is a synchronous,
//! idempotent transform: same input and configuration, same bytes out.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod audit;
pub mod cli;
pub mod config;
pub mod contract;
pub mod deidentify;
pub mod error;
pub mod logging;
pub mod report;
pub mod resample;
pub mod table;
pub mod validate;

pub use config::Config;
pub use contract::Contract;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use table::Table;
