//! CLI command definitions.
//!
//! Every pipeline stage is its own subcommand so steps stay independently
//! composable; paths default to the configured data zones.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// De-identify raw tables into the clean zone.
#[derive(Debug, Args)]
pub struct DeidentifyCommand {
    /// Input table or directory of tables (default: configured raw dir)
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output directory (default: configured clean dir)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Skip hashing of linkable identifiers (dry run)
    #[arg(long)]
    pub no_hash: bool,

    /// Where to write the summary (default: reports dir)
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

/// Read-only audits.
#[derive(Debug, Subcommand)]
pub enum AuditCommand {
    /// Check rounding and timestamp-granularity policy compliance
    Precision(PrecisionCommand),

    /// Scan for identifier-like columns and values
    Scan(ScanCommand),
}

/// Precision audit arguments.
#[derive(Debug, Args)]
pub struct PrecisionCommand {
    /// Input table or directory of tables (default: configured clean dir)
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Where to write the report (default: reports dir)
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

/// Identifier scan arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Input table or directory of tables (default: configured raw dir)
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Where to write the report (default: reports dir)
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Report findings without failing the run
    #[arg(long)]
    pub allow_findings: bool,
}

/// Validate tables against the frozen contract.
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Input table or directory of tables (default: configured clean dir)
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Contract document (default: configured contract path)
    #[arg(long, value_name = "FILE")]
    pub contract: Option<PathBuf>,
}

/// Resample tables onto the contract's uniform clock.
#[derive(Debug, Args)]
pub struct ResampleCommand {
    /// Input table or directory of tables (default: configured clean dir)
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output directory (default: configured standardized dir)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Override the contract's target rate in Hz (experiments only)
    #[arg(long, value_name = "HZ")]
    pub rate: Option<u32>,

    /// Contract document (default: configured contract path)
    #[arg(long, value_name = "FILE")]
    pub contract: Option<PathBuf>,
}

/// Contract management commands.
#[derive(Debug, Subcommand)]
pub enum ContractCommand {
    /// Verify the contract against its recorded lock
    Verify {
        /// Contract document (default: configured contract path)
        #[arg(long, value_name = "FILE")]
        contract: Option<PathBuf>,

        /// Lock file (default: configured lock path)
        #[arg(long, value_name = "FILE")]
        lock: Option<PathBuf>,
    },

    /// Freeze the contract: record its digest in the lock file
    Freeze {
        /// Contract document (default: configured contract path)
        #[arg(long, value_name = "FILE")]
        contract: Option<PathBuf>,

        /// Lock file (default: configured lock path)
        #[arg(long, value_name = "FILE")]
        lock: Option<PathBuf>,

        /// Overwrite an existing lock
        #[arg(short, long)]
        force: bool,
    },

    /// Show the contract summary
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Contract document (default: configured contract path)
        #[arg(long, value_name = "FILE")]
        contract: Option<PathBuf>,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deidentify_command_debug() {
        let cmd = DeidentifyCommand {
            input: None,
            output: None,
            no_hash: true,
            report: None,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("no_hash"));
    }

    #[test]
    fn test_audit_command_debug() {
        let cmd = AuditCommand::Precision(PrecisionCommand {
            input: Some(PathBuf::from("data/clean")),
            report: None,
        });
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Precision"));
    }

    #[test]
    fn test_contract_command_debug() {
        let cmd = ContractCommand::Freeze {
            contract: None,
            lock: None,
            force: true,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Freeze"));
        assert!(debug_str.contains("force"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
