//! De-identification policy: which columns to drop, hash, and reduce.

use serde::{Deserialize, Serialize};

/// Policy describing how a raw table is de-identified.
///
/// Embedded in the application configuration under `[deidentify]`, so
/// deployments with different identifier columns override the lists there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeidPolicy {
    /// Direct-identifier columns removed entirely.
    pub drop_columns: Vec<String>,

    /// Linkable-identifier columns replaced with salted hashes.
    pub hash_columns: Vec<String>,

    /// Geospatial columns rounded to `geo_decimals` places.
    pub geo_columns: Vec<String>,

    /// Decimal places kept for geospatial columns.
    pub geo_decimals: u32,

    /// Column normalized to whole seconds.
    pub timestamp_column: String,
}

impl Default for DeidPolicy {
    fn default() -> Self {
        Self {
            drop_columns: vec!["name".to_string()],
            hash_columns: vec!["driver_id".to_string(), "person_id".to_string()],
            geo_columns: vec!["lat".to_string(), "lon".to_string()],
            geo_decimals: 4,
            timestamp_column: "timestamp".to_string(),
        }
    }
}

impl DeidPolicy {
    /// Basic sanity checks, called during configuration validation.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.geo_decimals == 0 {
            return Err("geo_decimals must be greater than 0".to_string());
        }
        if self.timestamp_column.trim().is_empty() {
            return Err("timestamp_column must not be empty".to_string());
        }
        for drop in &self.drop_columns {
            if self.hash_columns.contains(drop) {
                return Err(format!(
                    "column '{drop}' is listed both for dropping and hashing"
                ));
            }
        }
        Ok(())
    }
}
