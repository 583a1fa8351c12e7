//! Contract document types and loading.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A frozen telemetry data contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Contract document version, bumped on any reviewed change.
    pub contract_version: String,

    /// When this contract version was frozen.
    pub frozen_at_utc: DateTime<Utc>,

    /// Dataset-wide metadata.
    pub global_meta: GlobalMeta,

    /// Resampling policy for standardized output.
    pub standardization: Standardization,

    /// Conformance gates applied during validation.
    pub conformance: Conformance,

    /// Ordered telemetry fields.
    pub fields: Vec<FieldSpec>,
}

/// Dataset-wide metadata frozen with the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalMeta {
    /// Coordinate reference system for `lat`/`lon` (e.g. `EPSG:4326`).
    pub coordinate_reference_system: String,

    /// Time basis for `timestamp` (e.g. `UTC`).
    pub time_basis: String,

    /// Nominal sampling rate of standardized data in Hz.
    pub sampling_rate_hz: u32,
}

/// Resampling policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardization {
    /// Target rate of the uniform output grid in Hz.
    pub target_rate_hz: u32,

    /// Raw-sample gaps wider than this invalidate the spanned window.
    pub max_gap_seconds: f64,

    /// Interpolation method for numeric fields.
    pub numeric_interpolation: Interpolation,

    /// Fill method for categorical fields.
    pub categorical_fill: FillMethod,
}

/// Interpolation method for numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Linear interpolation between bracketing samples.
    Linear,
}

/// Fill method for categorical fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Carry the last raw value forward onto grid points.
    Forward,
}

/// Conformance gates applied during validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conformance {
    /// Minimum ratio of rows free of constraint violations.
    pub valid_rows_ratio_min: f64,
}

/// One telemetry field: name, type, unit, and value constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column name.
    pub name: String,

    /// Value type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Physical unit (e.g. `m/s`, `degrees`).
    pub unit: String,

    /// Human-readable description.
    pub description: String,

    /// Value constraints checked per row.
    #[serde(default)]
    pub constraints: Constraints,
}

/// Value type of a contract field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Floating-point number.
    Float,
    /// Integer.
    Int,
    /// Free text.
    String,
    /// Boolean.
    Bool,
}

impl FieldType {
    /// Whether values of this type must parse as numbers.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Float | Self::Int)
    }
}

/// Per-value constraints on a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// Values must be finite (no NaN/inf).
    pub finite: bool,

    /// Inclusive `[low, high]` bound; the upper bound becomes exclusive
    /// when `wrap_behavior` is set (a wrapped angle never reaches it).
    pub range: Option<[f64; 2]>,

    /// Inclusive lower bound.
    pub min: Option<f64>,

    /// Values must never decrease down the table (timestamps).
    pub monotonic_non_decreasing: bool,

    /// Angular wrap behavior, if any.
    pub wrap_behavior: Option<WrapBehavior>,
}

/// Angular wrap behavior for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapBehavior {
    /// Values wrap modulo 360 degrees.
    #[serde(rename = "mod_360")]
    Mod360,
}

impl Constraints {
    /// Check a single value against the non-sequential constraints.
    ///
    /// Returns a description of the first violated constraint, or `None`
    /// if the value conforms. Monotonicity is a sequence property and is
    /// checked by the validator across rows instead.
    #[must_use]
    pub fn check_value(&self, value: f64) -> Option<String> {
        if self.finite && !value.is_finite() {
            return Some(format!("value {value} is not finite"));
        }
        if let Some([low, high]) = self.range {
            let in_range = if self.wrap_behavior.is_some() {
                value >= low && value < high
            } else {
                value >= low && value <= high
            };
            if !in_range {
                let bound = if self.wrap_behavior.is_some() {
                    format!("[{low}, {high})")
                } else {
                    format!("[{low}, {high}]")
                };
                return Some(format!("value {value} outside range {bound}"));
            }
        }
        if let Some(min) = self.min {
            if value < min {
                return Some(format!("value {value} below minimum {min}"));
            }
        }
        None
    }
}

impl Contract {
    /// Load and validate a contract document from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractLoad`] if the file is missing, unparseable,
    /// or internally inconsistent.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| Error::contract_load(path, err.to_string()))?;
        let contract: Self = toml::from_str(&text)
            .map_err(|err| Error::contract_load(path, err.to_string()))?;
        contract
            .validate()
            .map_err(|message| Error::contract_load(path, message))?;
        Ok(contract)
    }

    /// Internal consistency checks, independent of any table.
    fn validate(&self) -> std::result::Result<(), String> {
        if self.fields.is_empty() {
            return Err("contract declares no fields".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(format!("duplicate field '{}'", field.name));
            }
        }
        if self.standardization.target_rate_hz == 0 {
            return Err("target_rate_hz must be greater than 0".to_string());
        }
        if self.standardization.max_gap_seconds <= 0.0 {
            return Err("max_gap_seconds must be greater than 0".to_string());
        }
        let ratio = self.conformance.valid_rows_ratio_min;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(format!("valid_rows_ratio_min {ratio} outside [0, 1]"));
        }
        Ok(())
    }

    /// The declared field names, in order. Every one is a required column.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}
