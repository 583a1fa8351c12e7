//! `tripgate` - CLI for the telemetry standardization pipeline.
//!
//! Each subcommand is one independent pipeline stage; every failure class
//! exits with its own status code (see `error::Error::exit_code`).

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use clap::Parser;
use tracing::{info, warn};

use tripgate::audit::{IdentifierScanner, PrecisionAuditor};
use tripgate::cli::{
    AuditCommand, Cli, Command, ConfigCommand, ContractCommand, DeidentifyCommand,
    PrecisionCommand, ResampleCommand, ScanCommand, ValidateCommand,
};
use tripgate::contract::{lock, Contract};
use tripgate::deidentify::{load_salt, DeidSummary, Deidentifier};
use tripgate::resample::Resampler;
use tripgate::table::resolve_csv_inputs;
use tripgate::validate::SchemaValidator;
use tripgate::{init_logging, report, Config, Error, Result, Table};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Deidentify(cmd) => handle_deidentify(&config, &cmd),
        Command::Audit(AuditCommand::Precision(cmd)) => handle_audit_precision(&config, &cmd),
        Command::Audit(AuditCommand::Scan(cmd)) => handle_scan(&config, &cmd),
        Command::Validate(cmd) => handle_validate(&config, &cmd),
        Command::Resample(cmd) => handle_resample(&config, &cmd),
        Command::Contract(cmd) => handle_contract(&config, &cmd),
        Command::Init => handle_init(&config),
        Command::Config(cmd) => handle_config(&config, &cmd),
    }
}

fn handle_deidentify(config: &Config, cmd: &DeidentifyCommand) -> Result<()> {
    let input = cmd
        .input
        .clone()
        .unwrap_or_else(|| config.paths.raw_dir.clone());
    let output_dir = cmd
        .output
        .clone()
        .unwrap_or_else(|| config.paths.clean_dir.clone());
    let report_path = cmd
        .report
        .clone()
        .unwrap_or_else(|| config.deidentify_summary_path());

    let deidentifier = if cmd.no_hash {
        Deidentifier::without_hashing(config.deidentify.clone())
    } else {
        Deidentifier::new(config.deidentify.clone(), load_salt())
    };

    let files = resolve_csv_inputs(&input)?;
    if files.is_empty() {
        info!(input = %input.display(), "no input tables found");
    }

    let mut summary = DeidSummary::default();
    for file in &files {
        let table = Table::read_csv(file)?;
        let clean = deidentifier.apply(&table, &mut summary)?;
        let out_path = output_dir.join(
            file.file_name()
                .ok_or_else(|| Error::internal(format!("no file name in {}", file.display())))?,
        );
        clean.write_csv(&out_path)?;
        info!(
            input = %file.display(),
            output = %out_path.display(),
            rows = clean.row_count(),
            "table de-identified"
        );
        summary.outputs.push(out_path);
    }

    report::write_deidentify_summary(&report_path, &summary)?;
    println!(
        "De-identified {} file(s). Summary written to {}",
        files.len(),
        report_path.display()
    );
    Ok(())
}

fn handle_audit_precision(config: &Config, cmd: &PrecisionCommand) -> Result<()> {
    let input = cmd
        .input
        .clone()
        .unwrap_or_else(|| config.paths.clean_dir.clone());
    let report_path = cmd
        .report
        .clone()
        .unwrap_or_else(|| config.precision_report_path());

    let auditor = PrecisionAuditor::from_policy(&config.deidentify);
    let mut reports = Vec::new();
    for file in resolve_csv_inputs(&input)? {
        let table = Table::read_csv(&file)?;
        let audit = auditor.audit(&table);
        reports.push((file, audit));
    }
    report::write_precision_report(&report_path, &reports)?;
    println!("Precision report written to {}", report_path.display());

    // Violations under the tolerated ratio warn; anything worse fails
    // with its own exit code.
    for (path, audit) in &reports {
        if audit.passed() {
            continue;
        }
        let failing: Vec<String> = audit
            .checks
            .iter()
            .filter(|c| !c.passed)
            .map(|c| format!("{} {} ({} row(s))", c.column, c.requirement, c.violating_rows))
            .collect();
        if audit.worst_violation_ratio() > config.audit.max_violation_ratio {
            return Err(Error::precision(path, failing.join("; ")));
        }
        warn!(
            table = %path.display(),
            "precision violations below tolerance: {}",
            failing.join("; ")
        );
    }
    Ok(())
}

fn handle_scan(config: &Config, cmd: &ScanCommand) -> Result<()> {
    let input = cmd
        .input
        .clone()
        .unwrap_or_else(|| config.paths.raw_dir.clone());
    let report_path = cmd.report.clone().unwrap_or_else(|| config.scan_report_path());

    let scanner = IdentifierScanner::new(
        config.audit.scan_row_limit,
        config.audit.value_sample,
        config.audit.high_precision_decimals,
    );
    let mut reports = Vec::new();
    for file in resolve_csv_inputs(&input)? {
        let table = Table::read_csv(&file)?;
        let scan = scanner.scan(&table);
        reports.push((file, scan));
    }
    report::write_scan_report(&report_path, &reports)?;
    println!("Scan report written to {}", report_path.display());

    let findings: usize = reports.iter().map(|(_, r)| r.findings.len()).sum();
    if findings > 0 && !cmd.allow_findings {
        return Err(Error::IdentifiersDetected {
            path: input,
            findings,
        });
    }
    if findings > 0 {
        warn!(findings, "identifier findings allowed by --allow-findings");
    }
    Ok(())
}

fn handle_validate(config: &Config, cmd: &ValidateCommand) -> Result<()> {
    let contract_path = cmd
        .contract
        .clone()
        .unwrap_or_else(|| config.paths.contract_path.clone());
    let input = cmd
        .input
        .clone()
        .unwrap_or_else(|| config.paths.clean_dir.clone());

    let contract = Contract::load(&contract_path)?;
    let validator = SchemaValidator::new(&contract);
    let files = resolve_csv_inputs(&input)?;
    for file in &files {
        let table = Table::read_csv(file)?;
        let validation = validator.validate(&table, file)?;
        info!(
            table = %file.display(),
            rows = validation.rows,
            violations = validation.violations.len(),
            valid_ratio = validation.valid_ratio,
            "table validated"
        );
    }
    println!(
        "Validated {} file(s) against contract v{}",
        files.len(),
        contract.contract_version
    );
    Ok(())
}

fn handle_resample(config: &Config, cmd: &ResampleCommand) -> Result<()> {
    let contract_path = cmd
        .contract
        .clone()
        .unwrap_or_else(|| config.paths.contract_path.clone());
    let input = cmd
        .input
        .clone()
        .unwrap_or_else(|| config.paths.clean_dir.clone());
    let output_dir = cmd
        .output
        .clone()
        .unwrap_or_else(|| config.paths.standardized_dir.clone());

    let contract = Contract::load(&contract_path)?;
    let mut resampler = Resampler::from_contract(&contract);
    if let Some(rate) = cmd.rate {
        warn!(rate, contract_rate = contract.standardization.target_rate_hz, "overriding contract rate");
        resampler = resampler.with_rate(rate);
    }

    let files = resolve_csv_inputs(&input)?;
    for file in &files {
        let table = Table::read_csv(file)?;
        let standardized =
            resampler.resample(&table, &config.deidentify.timestamp_column, file)?;
        let out_path = output_dir.join(
            file.file_name()
                .ok_or_else(|| Error::internal(format!("no file name in {}", file.display())))?,
        );
        standardized.write_csv(&out_path)?;
        info!(
            input = %file.display(),
            output = %out_path.display(),
            rows_in = table.row_count(),
            rows_out = standardized.row_count(),
            "table resampled"
        );
    }
    println!(
        "Resampled {} file(s) at {} Hz into {}",
        files.len(),
        resampler.rate_hz(),
        output_dir.display()
    );
    Ok(())
}

fn handle_contract(config: &Config, cmd: &ContractCommand) -> Result<()> {
    match cmd {
        ContractCommand::Verify { contract, lock: lock_path } => {
            let contract_path = contract
                .clone()
                .unwrap_or_else(|| config.paths.contract_path.clone());
            let lock_path = lock_path
                .clone()
                .unwrap_or_else(|| config.paths.lock_path.clone());

            let digest = lock::verify(&contract_path, &lock_path)?;
            println!("Lock matches contract ({digest}).");

            // Opportunistic spot check: derived tables, if any, must carry
            // the contract's required columns.
            let contract = Contract::load(&contract_path)?;
            let mut checked = 0usize;
            for dir in [&config.paths.clean_dir, &config.paths.standardized_dir] {
                if !dir.is_dir() {
                    continue;
                }
                for file in resolve_csv_inputs(dir)? {
                    let table = Table::read_csv(&file)?;
                    let missing: Vec<&str> = contract
                        .field_names()
                        .into_iter()
                        .filter(|name| !table.has_column(name))
                        .collect();
                    if !missing.is_empty() {
                        return Err(Error::schema(
                            &file,
                            format!("missing required field(s): {}", missing.join(", ")),
                        ));
                    }
                    checked += 1;
                }
            }
            if checked > 0 {
                println!("{checked} derived table(s) carry the required columns.");
            } else {
                println!("No derived tables found; lock verified only.");
            }
        }
        ContractCommand::Freeze { contract, lock: lock_path, force } => {
            let contract_path = contract
                .clone()
                .unwrap_or_else(|| config.paths.contract_path.clone());
            let lock_path = lock_path
                .clone()
                .unwrap_or_else(|| config.paths.lock_path.clone());

            // Refuse to freeze a document that does not even parse.
            Contract::load(&contract_path)?;
            let digest = lock::freeze(&contract_path, &lock_path, *force)?;
            println!("Contract frozen. Lock {digest} written to {}", lock_path.display());
        }
        ContractCommand::Show { json, contract } => {
            let contract_path = contract
                .clone()
                .unwrap_or_else(|| config.paths.contract_path.clone());
            let contract = Contract::load(&contract_path)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&contract)?);
            } else {
                print_contract(&contract);
            }
        }
    }
    Ok(())
}

fn print_contract(contract: &Contract) {
    println!("Telemetry Contract v{}", contract.contract_version);
    println!("=========================");
    println!();
    println!("Frozen at:       {}", contract.frozen_at_utc);
    println!(
        "CRS:             {}",
        contract.global_meta.coordinate_reference_system
    );
    println!("Time basis:      {}", contract.global_meta.time_basis);
    println!(
        "Sampling rate:   {} Hz",
        contract.global_meta.sampling_rate_hz
    );
    println!(
        "Max gap:         {} s",
        contract.standardization.max_gap_seconds
    );
    println!(
        "Quality gate:    >= {:.0}% valid rows",
        contract.conformance.valid_rows_ratio_min * 100.0
    );
    println!();
    println!("Fields:");
    for field in &contract.fields {
        println!(
            "  {:<12} {:?} [{}] - {}",
            field.name, field.field_type, field.unit, field.description
        );
    }
}

fn handle_init(config: &Config) -> Result<()> {
    for dir in config.data_dirs() {
        std::fs::create_dir_all(dir).map_err(|source| Error::DirectoryCreate {
            path: dir.clone(),
            source,
        })?;
        println!("Created {}", dir.display());
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                print_config(config);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.clone().unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}

fn print_config(config: &Config) {
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Paths]");
    print_path("Raw dir:", &config.paths.raw_dir);
    print_path("Clean dir:", &config.paths.clean_dir);
    print_path("Standardized dir:", &config.paths.standardized_dir);
    print_path("Reports dir:", &config.paths.reports_dir);
    print_path("Contract:", &config.paths.contract_path);
    print_path("Lock:", &config.paths.lock_path);
    println!();
    println!("[De-identification]");
    println!("  Drop columns:       {}", config.deidentify.drop_columns.join(", "));
    println!("  Hash columns:       {}", config.deidentify.hash_columns.join(", "));
    println!("  Geo columns:        {}", config.deidentify.geo_columns.join(", "));
    println!("  Geo decimals:       {}", config.deidentify.geo_decimals);
    println!("  Timestamp column:   {}", config.deidentify.timestamp_column);
    println!();
    println!("[Audit]");
    println!("  Scan row limit:     {}", config.audit.scan_row_limit);
    println!("  Value sample:       {}", config.audit.value_sample);
    println!("  High precision at:  {} decimals", config.audit.high_precision_decimals);
    println!("  Violation ratio:    {}", config.audit.max_violation_ratio);
}

fn print_path(label: &str, path: &Path) {
    println!("  {label:<19} {}", path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// The shipped v1 contract document.
    const CONTRACT_TOML: &str = include_str!("../../../contracts/telemetry_contract.toml");

    fn test_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.paths.raw_dir = root.join("raw");
        config.paths.clean_dir = root.join("clean");
        config.paths.standardized_dir = root.join("standardized");
        config.paths.reports_dir = root.join("reports");
        config.paths.contract_path = root.join("contract.toml");
        config.paths.lock_path = root.join("contract.lock");
        config
    }

    fn write_raw_trip(config: &Config) -> PathBuf {
        std::fs::create_dir_all(&config.paths.raw_dir).unwrap();
        let path = config.paths.raw_dir.join("trip_001.csv");
        std::fs::write(
            &path,
            "timestamp,lat,lon,speed,accel,heading,name,driver_id\n\
             1700000000.0,57.700012,11.970001,13.9,0.2,350.0,Alice,u1\n\
             1700000000.5,57.700034,11.970099,14.1,0.1,355.0,Alice,u1\n\
             1700000001.0,57.700051,11.970150,14.3,0.1,2.0,Alice,u1\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_init_creates_data_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        handle_init(&config).unwrap();
        for data_dir in config.data_dirs() {
            assert!(data_dir.is_dir());
        }
        // Idempotent.
        handle_init(&config).unwrap();
    }

    #[test]
    fn test_deidentify_pipeline_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_raw_trip(&config);

        // Dry run first: no salt needed.
        let cmd = DeidentifyCommand {
            input: None,
            output: None,
            no_hash: true,
            report: None,
        };
        handle_deidentify(&config, &cmd).unwrap();

        let clean = Table::read_csv(&config.paths.clean_dir.join("trip_001.csv")).unwrap();
        assert!(!clean.has_column("name"));
        assert_eq!(clean.row_count(), 3);
        // Dry run leaves the linkable identifier alone.
        let idx = clean.column_index("driver_id").unwrap();
        assert_eq!(clean.rows()[0][idx], "u1");

        let summary = std::fs::read_to_string(config.deidentify_summary_path()).unwrap();
        assert!(summary.contains("Hashing skipped"));
    }

    #[test]
    fn test_precision_audit_flags_raw_but_passes_clean() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let raw = write_raw_trip(&config);

        // Raw data: over-precise coordinates and fractional timestamps in
        // every row fail beyond tolerance.
        let cmd = PrecisionCommand {
            input: Some(raw),
            report: None,
        };
        let err = handle_audit_precision(&config, &cmd).unwrap_err();
        assert!(matches!(err, Error::PrecisionViolation { .. }));
        assert_eq!(err.exit_code(), 4);

        // De-identified data passes.
        let deid = DeidentifyCommand {
            input: None,
            output: None,
            no_hash: true,
            report: None,
        };
        handle_deidentify(&config, &deid).unwrap();
        let cmd = PrecisionCommand {
            input: None,
            report: None,
        };
        handle_audit_precision(&config, &cmd).unwrap();

        let report = std::fs::read_to_string(config.precision_report_path()).unwrap();
        assert!(report.ends_with("PASS\n"));
    }

    #[test]
    fn test_scan_fails_on_raw_identifiers_unless_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_raw_trip(&config);

        let cmd = ScanCommand {
            input: None,
            report: None,
            allow_findings: false,
        };
        let err = handle_scan(&config, &cmd).unwrap_err();
        assert!(matches!(err, Error::IdentifiersDetected { .. }));
        assert_eq!(err.exit_code(), 7);

        let cmd = ScanCommand {
            input: None,
            report: None,
            allow_findings: true,
        };
        handle_scan(&config, &cmd).unwrap();
        assert!(config.scan_report_path().is_file());
    }

    #[test]
    fn test_contract_freeze_verify_and_drift() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::write(
            &config.paths.contract_path,
            CONTRACT_TOML,
        )
        .unwrap();

        let freeze = ContractCommand::Freeze {
            contract: None,
            lock: None,
            force: false,
        };
        handle_contract(&config, &freeze).unwrap();

        let verify = ContractCommand::Verify {
            contract: None,
            lock: None,
        };
        handle_contract(&config, &verify).unwrap();

        // Any edit to the contract must block verification.
        let mut text = std::fs::read_to_string(&config.paths.contract_path).unwrap();
        text.push('\n');
        std::fs::write(&config.paths.contract_path, text).unwrap();
        let err = handle_contract(&config, &verify).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_validate_and_resample_clean_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        std::fs::write(
            &config.paths.contract_path,
            CONTRACT_TOML,
        )
        .unwrap();
        write_raw_trip(&config);
        handle_deidentify(
            &config,
            &DeidentifyCommand {
                input: None,
                output: None,
                no_hash: true,
                report: None,
            },
        )
        .unwrap();

        handle_validate(
            &config,
            &ValidateCommand {
                input: None,
                contract: None,
            },
        )
        .unwrap();

        handle_resample(
            &config,
            &ResampleCommand {
                input: None,
                output: None,
                rate: None,
                contract: None,
            },
        )
        .unwrap();

        let standardized =
            Table::read_csv(&config.paths.standardized_dir.join("trip_001.csv")).unwrap();
        // De-identification floors the three samples onto one second:
        // 1700000000 and 1700000001 survive as distinct grid endpoints.
        assert!(standardized.row_count() > 0);
        assert!(standardized.has_column("heading"));
    }

    #[test]
    fn test_validate_missing_contract_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        write_raw_trip(&config);

        let err = handle_validate(
            &config,
            &ValidateCommand {
                input: None,
                contract: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
