//! The frozen telemetry data contract.
//!
//! A contract is an immutable, versioned TOML document describing the
//! telemetry schema (fields, types, units, constraints), the sampling
//! policy the resampler standardizes to, and the conformance gates the
//! validator enforces. It is owned outside the pipeline: every stage reads
//! it, none writes it.
//!
//! Drift protection comes from a lock file next to the contract holding
//! the SHA-256 of the contract bytes. [`lock::verify`] is the single
//! authority that decides whether the contract in use is the one that was
//! reviewed and frozen.

pub mod lock;
mod schema;

pub use schema::{
    Conformance, Constraints, Contract, FieldSpec, FieldType, FillMethod, GlobalMeta,
    Interpolation, Standardization, WrapBehavior,
};

#[cfg(test)]
pub(crate) use schema::tests::{sample_contract, SAMPLE_CONTRACT};
