//! DDR5/LPDDR5 power estimator CLI.
//!
//! This binary replays one workload against one device specification. It performs:
//! 1. **Loading:** Parses the spec, workload and optional configuration JSON files.
//! 2. **Replay:** Runs the engine with the violation policy and formulas chosen on the command line.
//! 3. **Reporting:** Prints the selected report sections and optionally writes the full report as JSON.
//!
//! The process exits with status 1 on any error, and also when violations were
//! collected, so scripted runs can gate on trace legality.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use ddrpower_core::config::{ActFormula, ViolationPolicy};
use ddrpower_core::sim::{loader, simulate};
use ddrpower_core::stats::REPORT_SECTIONS;
use ddrpower_core::{PowerReport, SimConfig, SimError};

#[derive(Parser, Debug)]
#[command(
    name = "ddrpower",
    author,
    version,
    about = "DDR5/LPDDR5 command-trace energy and power estimator",
    long_about = "Replay a timestamped DRAM command trace against a datasheet specification and report energy, power, bandwidth and efficiency.\n\nExamples:\n  ddrpower ddr5_16gb.json trace.json\n  ddrpower lpddr5.json trace.json --collect-violations -o report.json\n  ddrpower ddr5_16gb.json trace.json --sections summary,core -v"
)]
struct Cli {
    /// Device specification (JSON).
    spec: PathBuf,

    /// Workload: command trace plus metadata (JSON).
    workload: PathBuf,

    /// Write the full report as JSON to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Replay configuration (JSON); command-line flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Record violations and keep replaying instead of stopping at the first.
    #[arg(long)]
    collect_violations: bool,

    /// ACT/PRE energy formula.
    #[arg(long, value_enum)]
    act_formula: Option<FormulaArg>,

    /// Postponed refreshes allowed before a deadline warning.
    #[arg(long)]
    max_postponed: Option<u32>,

    /// Include every energy credit in the JSON report.
    #[arg(long)]
    energy_log: bool,

    /// Report sections to print (comma separated).
    #[arg(long, value_delimiter = ',')]
    sections: Vec<String>,

    /// Print nothing to stdout.
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormulaArg {
    Simple,
    Weighted,
}

impl From<FormulaArg> for ActFormula {
    fn from(arg: FormulaArg) -> Self {
        match arg {
            FormulaArg::Simple => Self::Simple,
            FormulaArg::Weighted => Self::Weighted,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(unknown) = cli.sections.iter().find(|s| !REPORT_SECTIONS.contains(&s.as_str())) {
        eprintln!("Error: unknown section `{unknown}` (expected one of {})", REPORT_SECTIONS.join(", "));
        process::exit(2);
    }

    match run(&cli) {
        Ok(report) => {
            if !cli.quiet {
                report.print_sections(&cli.sections);
            }
            if !report.is_clean() {
                eprintln!("[!] {} constraint violation(s) recorded", report.violations.len());
                process::exit(1);
            }
        }
        Err(e) => {
            error!("{e}");
            eprintln!("\n[!] FATAL: {e}");
            process::exit(1);
        }
    }
}

/// Loads inputs, applies command-line overrides and replays the trace.
///
/// Writes the JSON report when `--output` is given, before the caller decides the exit status.
fn run(cli: &Cli) -> Result<PowerReport, SimError> {
    let mut config = match &cli.config {
        Some(path) => loader::load_config(path)?,
        None => SimConfig::default(),
    };
    if cli.collect_violations {
        config.violation_policy = ViolationPolicy::Collect;
    }
    if let Some(formula) = cli.act_formula {
        config.act_formula = formula.into();
    }
    if let Some(max) = cli.max_postponed {
        config.max_postponed_refreshes = max;
    }
    if cli.energy_log {
        config.record_energy_log = true;
    }

    let spec = loader::load_spec(&cli.spec)?;
    let workload = loader::load_workload(&cli.workload)?;
    let report = simulate(&spec, &workload, config)?;

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(&report).map_err(|source| SimError::Parse {
            what: "report".to_string(),
            source,
        })?;
        fs::write(path, json).map_err(|source| SimError::Io {
            path: path.clone(),
            source,
        })?;
        if !cli.quiet {
            println!("[*] Report written to {}", path.display());
        }
    }
    Ok(report)
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
