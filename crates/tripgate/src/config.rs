//! Configuration management for tripgate.
//!
//! Configuration is loaded with figment from defaults, an optional TOML
//! file, and environment variables. The de-identification salt is
//! deliberately *not* part of this configuration: it is a secret and only
//! ever read from the `TRIPGATE_SALT` environment variable.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::deidentify::DeidPolicy;
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default config directory name.
const CONFIG_DIR_NAME: &str = "tripgate";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TRIPGATE_`)
/// 2. TOML config file at `~/.config/tripgate/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data and contract locations.
    pub paths: PathsConfig,
    /// De-identification policy.
    pub deidentify: DeidPolicy,
    /// Audit and scan tuning.
    pub audit: AuditConfig,
}

/// Data-zone and contract locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw input tables (read-only source of truth).
    pub raw_dir: PathBuf,
    /// De-identified tables.
    pub clean_dir: PathBuf,
    /// Resampled, contract-conformant tables.
    pub standardized_dir: PathBuf,
    /// Audit reports.
    pub reports_dir: PathBuf,
    /// The frozen contract document.
    pub contract_path: PathBuf,
    /// The contract's lock file.
    pub lock_path: PathBuf,
}

/// Audit and scan tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Maximum rows examined per table by the identifier scan.
    pub scan_row_limit: usize,
    /// Values sampled per column for value-shape heuristics.
    pub value_sample: usize,
    /// Average decimal places at which coordinates count as over-precise.
    pub high_precision_decimals: f64,
    /// Violating-row ratio tolerated before a precision audit fails.
    ///
    /// Matches the contract's quality-gate complement: with a 0.95
    /// valid-row requirement, up to 5% violating rows warn instead of
    /// failing.
    pub max_violation_ratio: f64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            clean_dir: PathBuf::from("data/clean"),
            standardized_dir: PathBuf::from("data/standardized"),
            reports_dir: PathBuf::from("reports"),
            contract_path: PathBuf::from("contracts/telemetry_contract.toml"),
            lock_path: PathBuf::from("contracts/telemetry_contract.lock"),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            scan_row_limit: 2000,
            value_sample: 30,
            high_precision_decimals: 6.0,
            max_violation_ratio: 0.05,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("TRIPGATE_").split("_"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.deidentify
            .validate()
            .map_err(|message| Error::ConfigValidation { message })?;

        if self.audit.value_sample == 0 {
            return Err(Error::config("value_sample must be greater than 0"));
        }
        if self.audit.scan_row_limit == 0 {
            return Err(Error::config("scan_row_limit must be greater than 0"));
        }
        if self.audit.high_precision_decimals <= 0.0 {
            return Err(Error::config(
                "high_precision_decimals must be greater than 0",
            ));
        }
        let ratio = self.audit.max_violation_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(Error::config(format!(
                "max_violation_ratio {ratio} outside [0, 1]"
            )));
        }
        Ok(())
    }

    /// The data directories the pipeline writes to or reads from.
    #[must_use]
    pub fn data_dirs(&self) -> [&PathBuf; 4] {
        [
            &self.paths.raw_dir,
            &self.paths.clean_dir,
            &self.paths.standardized_dir,
            &self.paths.reports_dir,
        ]
    }

    /// Default location of the de-identification summary.
    #[must_use]
    pub fn deidentify_summary_path(&self) -> PathBuf {
        self.paths.reports_dir.join("deidentify_summary.md")
    }

    /// Default location of the precision audit report.
    #[must_use]
    pub fn precision_report_path(&self) -> PathBuf {
        self.paths.reports_dir.join("precision_audit_report.md")
    }

    /// Default location of the identifier scan report.
    #[must_use]
    pub fn scan_report_path(&self) -> PathBuf {
        self.paths.reports_dir.join("identifier_scan_report.md")
    }
}
