//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::config_validation::{parse_codes, parse_date, validate_scan_config};
use crate::domain::criteria::ScanCriteria;
use crate::domain::error::ScanError;
use crate::domain::ohlcv::TimeSeries;
use crate::domain::registry::{default_registry, IndicatorRegistry};
use crate::domain::result::ScanResult;
use crate::domain::scanner::Scanner;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_OUTPUT: &str = "scan_results.json";

#[derive(Parser, Debug)]
#[command(name = "fundscan", about = "Composite-score indicator scanner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scan instruments and write a ranked JSON report
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of <CODE>.csv files
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        code: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only print the first N ranked results
        #[arg(long)]
        top: Option<usize>,
        /// JSON criteria file replacing the [scan]/[weights] sections
        #[arg(long)]
        criteria: Option<PathBuf>,
    },
    /// List registered indicators and their parameters
    Indicators {
        #[arg(long)]
        json: bool,
    },
    /// Validate a scan configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instrument codes in a data directory
    ListSymbols {
        #[arg(short, long)]
        data: PathBuf,
    },
    /// Show data range for symbol(s)
    Info {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Scan {
            config,
            data,
            code,
            output,
            top,
            criteria,
        } => run_scan(
            &config,
            &data,
            code.as_deref(),
            output.as_deref(),
            top,
            criteria.as_deref(),
        ),
        Command::Indicators { json } => run_indicators(default_registry(), json),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data } => run_list_symbols(&data),
        Command::Info { data, code } => run_info(&data, code.as_deref()),
    }
}

fn fail(err: &ScanError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Criteria from a JSON file when given, otherwise from the INI sections.
pub fn build_criteria(
    config: &dyn ConfigPort,
    criteria_path: Option<&Path>,
    registry: &IndicatorRegistry,
) -> Result<ScanCriteria, ScanError> {
    match criteria_path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            let criteria = ScanCriteria::from_json_str(&json)?;
            criteria.resolve(registry)?;
            Ok(criteria)
        }
        None => ScanCriteria::from_config(config, registry),
    }
}

/// `--code` wins, then `[scan] codes`, then every symbol the data port has.
pub fn resolve_codes(
    code_override: Option<&str>,
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
) -> Result<Vec<String>, ScanError> {
    if let Some(c) = code_override {
        return Ok(vec![c.trim().to_uppercase()]);
    }
    let codes = parse_codes(config);
    if !codes.is_empty() {
        return Ok(codes);
    }
    data_port.list_symbols()
}

/// Fetch every code, skipping (with a warning) those that fail to load.
pub fn fetch_instruments(
    data_port: &dyn DataPort,
    codes: &[String],
    config: &dyn ConfigPort,
) -> Result<BTreeMap<String, TimeSeries>, ScanError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;

    let mut instruments = BTreeMap::new();
    for code in codes {
        match data_port.fetch_series(code, start, end) {
            Ok(series) => {
                instruments.insert(code.clone(), series);
            }
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "skipping instrument");
                eprintln!("warning: skipping {} ({})", code, e);
            }
        }
    }

    if instruments.is_empty() {
        return Err(ScanError::NoData {
            code: codes.join(","),
        });
    }
    Ok(instruments)
}

/// Fetch, scan against `registry` and report. Returns the ranked results.
pub fn run_scan_pipeline(
    registry: &IndicatorRegistry,
    data_port: &dyn DataPort,
    report: &dyn ReportPort,
    config: &dyn ConfigPort,
    criteria: &ScanCriteria,
    codes: &[String],
    output_path: &Path,
) -> Result<Vec<ScanResult>, ScanError> {
    let instruments = fetch_instruments(data_port, codes, config)?;
    eprintln!(
        "Scanning {} instruments with {} indicators",
        instruments.len(),
        criteria.enabled().count()
    );

    let results = Scanner::new(registry).scan(&instruments, criteria)?;
    report.write(&results, &output_path.to_string_lossy())?;
    Ok(results)
}

/// Ranked one-line-per-instrument summary.
pub fn format_summary(results: &[ScanResult], top: Option<usize>) -> String {
    let shown = top.unwrap_or(results.len()).min(results.len());
    let mut out = String::new();
    out.push_str(&format!("{:<4} {:<10} {:<5} {:>8}\n", "#", "CODE", "REC", "SCORE"));
    for (rank, r) in results.iter().take(shown).enumerate() {
        out.push_str(&format!(
            "{:<4} {:<10} {:<5} {:>8.4}\n",
            rank + 1,
            r.code,
            r.recommendation,
            r.composite_score
        ));
    }
    if shown < results.len() {
        out.push_str(&format!("... {} more\n", results.len() - shown));
    }
    out
}

fn run_scan(
    config_path: &Path,
    data_dir: &Path,
    code_override: Option<&str>,
    output_path: Option<&Path>,
    top: Option<usize>,
    criteria_path: Option<&Path>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let registry = default_registry();
    let criteria = match build_criteria(&config, criteria_path, registry) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if criteria.enabled().next().is_none() {
        eprintln!("warning: no indicator has a non-zero weight; every result will be HOLD");
    }

    let data_port = CsvAdapter::new(data_dir.to_path_buf());
    let codes = match resolve_codes(code_override, &config, &data_port) {
        Ok(c) if c.is_empty() => {
            eprintln!("error: no codes configured and no data files found");
            return ExitCode::from(5);
        }
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let output = output_path.unwrap_or(Path::new(DEFAULT_OUTPUT));
    let report = JsonReportAdapter::new();
    match run_scan_pipeline(registry, &data_port, &report, &config, &criteria, &codes, output) {
        Ok(results) => {
            print!("{}", format_summary(&results, top));
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Human-readable listing of every registered indicator.
pub fn format_indicators(registry: &IndicatorRegistry) -> String {
    let mut out = String::new();
    for (id, schema) in registry.list_all() {
        out.push_str(&format!("{} - {}\n", id, schema.label));
        out.push_str(&format!("    {}\n", schema.description));
        for p in &schema.params {
            let range = match p.max {
                Some(max) => format!("[{}, {}]", p.min, max),
                None => format!(">= {}", p.min),
            };
            out.push_str(&format!(
                "    {:<18} {:<8} default {:<6} {}  {}\n",
                p.name,
                p.kind.as_str(),
                p.default,
                range,
                p.description
            ));
        }
    }
    out
}

fn run_indicators(registry: &IndicatorRegistry, json: bool) -> ExitCode {
    if json {
        let listing: Vec<_> = registry
            .list_all()
            .map(|(id, schema)| schema.to_json(id))
            .collect();
        match serde_json::to_string_pretty(&listing) {
            Ok(s) => println!("{}", s),
            Err(e) => return fail(&ScanError::from(e)),
        }
    } else {
        print!("{}", format_indicators(registry));
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_scan_config(&config) {
        return fail(&e);
    }
    let registry = default_registry();
    let criteria = match ScanCriteria::from_config(&config, registry) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let resolved = match criteria.resolve(registry) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    eprintln!("\nThresholds:");
    eprintln!("  buy:  >= {}", criteria.buy_threshold());
    eprintln!("  sell: <= -{}", criteria.sell_threshold());
    eprintln!("  price column: {}", criteria.price_column());
    eprintln!("  adx scaling:  {}", criteria.adx_scaling());

    eprintln!("\nIndicators:");
    for (id, weight) in criteria.weights() {
        let params = resolved
            .configs
            .get(id)
            .map(|c| {
                c.values()
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        let state = if *weight == 0.0 { " (disabled)" } else { "" };
        eprintln!("  {:<12} weight {:>6}{}  {}", id, weight, state, params);
    }

    let codes = parse_codes(&config);
    if !codes.is_empty() {
        eprintln!("\nCodes: {}", codes.join(", "));
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_symbols(data_dir: &Path) -> ExitCode {
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = match adapter.list_symbols() {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    ExitCode::SUCCESS
}

fn run_info(data_dir: &Path, code: Option<&str>) -> ExitCode {
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    let codes = match code {
        Some(c) => vec![c.trim().to_uppercase()],
        None => match adapter.list_symbols() {
            Ok(s) => s,
            Err(e) => return fail(&e),
        },
    };

    for c in &codes {
        match adapter.get_data_range(c) {
            Ok(Some((first, last, count))) => {
                println!("{}: {} bars, {} to {}", c, count, first, last);
            }
            Ok(None) => eprintln!("{}: no data found", c),
            Err(e) => eprintln!("error reading {}: {}", c, e),
        }
    }
    ExitCode::SUCCESS
}
