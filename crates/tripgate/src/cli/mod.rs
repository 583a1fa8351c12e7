//! Command-line interface for tripgate.
//!
//! This module provides the CLI structure and subcommand definitions for
//! the `tripgate` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AuditCommand, ConfigCommand, ContractCommand, DeidentifyCommand, PrecisionCommand,
    ResampleCommand, ScanCommand, ValidateCommand,
};

/// tripgate - contract-driven telemetry standardization
///
/// A batch pipeline that de-identifies driving-telemetry tables, audits
/// them, validates them against a frozen data contract, resamples them to
/// the contract's uniform clock, and guards the contract against silent
/// drift.
#[derive(Debug, Parser)]
#[command(name = "tripgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// De-identify raw tables
    Deidentify(DeidentifyCommand),

    /// Run read-only audits
    #[command(subcommand)]
    Audit(AuditCommand),

    /// Validate tables against the contract
    Validate(ValidateCommand),

    /// Resample tables onto the contract's uniform clock
    Resample(ResampleCommand),

    /// Manage and verify the data contract
    #[command(subcommand)]
    Contract(ContractCommand),

    /// Create the configured data directories
    Init,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
