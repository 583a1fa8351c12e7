//! Error types for tripgate.
//!
//! This module defines all error types used throughout the tripgate crate.
//! Every failure kind maps to a distinct process exit code so that callers
//! and CI pipelines can tell a contract drift from a quality-gate failure
//! without parsing output.

use std::path::PathBuf;
use thiserror::Error;

/// Environment variable that supplies the de-identification salt.
pub const SALT_ENV_VAR: &str = "TRIPGATE_SALT";

/// The main error type for tripgate operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// The de-identification salt is required but not set.
    #[error(
        "missing de-identification salt: set {SALT_ENV_VAR} before hashing \
         linkable identifier column '{column}' (or pass --no-hash for a dry run)"
    )]
    MissingSalt {
        /// The linkable-identifier column that triggered the requirement.
        column: String,
    },

    /// Failed to load or parse the contract document.
    #[error("failed to load contract at {path}: {message}")]
    ContractLoad {
        /// Path to the contract file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    // === Pipeline Errors ===
    /// A required field is missing or mistyped.
    #[error("schema violation in {path}: {message}")]
    SchemaViolation {
        /// Table the violation was found in.
        path: PathBuf,
        /// Description naming the offending field.
        message: String,
    },

    /// The precision policy is not met beyond the tolerated ratio.
    #[error("precision policy violated in {path}: {message}")]
    PrecisionViolation {
        /// Table the violation was found in.
        path: PathBuf,
        /// Description of the failing check.
        message: String,
    },

    /// The contract content no longer matches its recorded lock.
    #[error("contract drift detected for {path}: lock {expected} != contract {actual}")]
    ContractDrift {
        /// Path to the contract file.
        path: PathBuf,
        /// Digest recorded in the lock file.
        expected: String,
        /// Digest computed from the contract file.
        actual: String,
    },

    /// The valid-row ratio fell below the contract's quality gate.
    #[error(
        "quality gate failed for {path}: valid-row ratio {ratio:.4} \
         below required {minimum:.2}"
    )]
    QualityGate {
        /// Table that failed the gate.
        path: PathBuf,
        /// Observed valid-row ratio.
        ratio: f64,
        /// Minimum ratio required by the contract.
        minimum: f64,
    },

    /// The identifier scan found likely identifying data.
    #[error(
        "identifying data detected in {path}: {findings} finding(s); \
         see the scan report (or pass --allow-findings)"
    )]
    IdentifiersDetected {
        /// Table the findings were raised against.
        path: PathBuf,
        /// Number of findings.
        findings: usize,
    },

    // === I/O Errors ===
    /// Failed to read a delimited table.
    #[error("failed to read table {path}: {source}")]
    TableRead {
        /// Path to the table file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    /// Failed to write a delimited table.
    #[error("failed to write table {path}: {source}")]
    TableWrite {
        /// Path to the table file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for tripgate operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new configuration validation error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a new contract load error.
    #[must_use]
    pub fn contract_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ContractLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new schema violation error.
    #[must_use]
    pub fn schema(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new precision violation error.
    #[must_use]
    pub fn precision(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PrecisionViolation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a contract drift.
    #[must_use]
    pub fn is_contract_drift(&self) -> bool {
        matches!(self, Self::ContractDrift { .. })
    }

    /// Check if this error is a configuration problem (including a missing salt).
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad(_)
                | Self::ConfigValidation { .. }
                | Self::MissingSalt { .. }
                | Self::ContractLoad { .. }
        )
    }

    /// The process exit status for this failure kind.
    ///
    /// Each failure class carries its own code so callers can branch on the
    /// status alone: configuration 2, schema 3, precision 4, drift 5,
    /// quality gate 6, identifier findings 7, everything else 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigLoad(_)
            | Self::ConfigValidation { .. }
            | Self::MissingSalt { .. }
            | Self::ContractLoad { .. } => 2,
            Self::SchemaViolation { .. } => 3,
            Self::PrecisionViolation { .. } => 4,
            Self::ContractDrift { .. } => 5,
            Self::QualityGate { .. } => 6,
            Self::IdentifiersDetected { .. } => 7,
            Self::TableRead { .. }
            | Self::TableWrite { .. }
            | Self::DirectoryCreate { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Internal(_) => 1,
        }
    }
}
