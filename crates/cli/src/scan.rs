//! `dupguard scan` and `dupguard fix`: duplicate detection across a main
//! dataset and its auxiliary series, with optional cleanup.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;

use dupguard_dedup::engine::{run, Collaborators, RunInput, RunOutcome};
use dupguard_dedup::{
    AggregateReport, AlwaysProceed, Aggregator, AuxiliarySeries, ConsentProvider, DedupConfig,
    DedupError, LogProgress, RemediationReport, MAIN_LABEL,
};
use dupguard_io::{discover_auxiliary, load_dataset_with, CsvSink};

use crate::consent::StdinConsent;
use crate::exit_codes::{
    dedup_exit_code, EXIT_CRITICAL, EXIT_DUPLICATES, EXIT_ERROR, EXIT_INPUT, EXIT_INVALID_CONFIG,
    EXIT_PERSIST, EXIT_USAGE,
};
use crate::CliError;

/// Inputs shared by `scan` and `fix`.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Main dataset (CSV/TSV, delimiter is detected)
    pub main: PathBuf,

    /// Auxiliary series as LABEL=PATH (repeatable, order is kept)
    #[arg(long = "aux", value_name = "LABEL=PATH", value_parser = parse_aux_spec)]
    pub aux: Vec<(String, PathBuf)>,

    /// Also pick up <stem>_<LABEL>.csv files next to the main file
    #[arg(long)]
    pub discover: bool,

    /// TOML config file (defaults apply when omitted)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Output switches shared by `scan` and `fix`.
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Output JSON to stdout instead of only the human summary
    #[arg(long)]
    pub json: bool,

    /// Write JSON output to file
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub fn parse_aux_spec(spec: &str) -> Result<(String, PathBuf), String> {
    let (label, path) = spec
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=PATH, got \"{spec}\""))?;
    let label = label.trim();
    if label.is_empty() {
        return Err(format!("empty label in \"{spec}\""));
    }
    if label == MAIN_LABEL {
        return Err(format!("\"{MAIN_LABEL}\" is reserved for the main dataset"));
    }
    if path.is_empty() {
        return Err(format!("empty path in \"{spec}\""));
    }
    Ok((label.to_string(), PathBuf::from(path)))
}

fn cli_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

impl From<DedupError> for CliError {
    fn from(err: DedupError) -> Self {
        let code = dedup_exit_code(&err);
        let hint = match code {
            EXIT_INVALID_CONFIG => Some("run `dupguard config` to see the expected layout".to_string()),
            EXIT_INPUT => Some("inputs must be delimited text with a header row".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

// ============================================================================
// Loading
// ============================================================================

pub fn load_config(path: Option<&Path>) -> Result<DedupConfig, CliError> {
    let Some(path) = path else {
        return Ok(DedupConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        cli_err(EXIT_INVALID_CONFIG, format!("cannot read config {}: {e}", path.display()))
    })?;
    Ok(DedupConfig::from_toml(&text)?)
}

/// Load the main dataset and every auxiliary series.
///
/// Explicit `--aux` entries come first, in the order given, then discovered
/// companions not already named. A missing auxiliary file is recorded as an
/// absent dataset; any other read or parse failure aborts the run.
fn load_input(args: &InputArgs, config: &DedupConfig) -> Result<RunInput, CliError> {
    let classification = &config.classification;
    let main = load_dataset_with(&args.main, MAIN_LABEL, classification)?;

    let mut sources = args.aux.clone();
    if args.discover {
        let dir = match args.main.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let stem = args
            .main
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| cli_err(EXIT_USAGE, format!("cannot derive a stem from {}", args.main.display())))?;
        for (label, path) in discover_auxiliary(dir, stem)? {
            if !sources.iter().any(|(l, _)| *l == label) {
                sources.push((label, path));
            }
        }
    }

    let mut auxiliary = AuxiliarySeries::new();
    for (label, path) in sources {
        if !path.exists() {
            log::warn!("{label}: {} does not exist, treating as absent", path.display());
            auxiliary.insert_absent(label);
            continue;
        }
        let dataset = load_dataset_with(&path, &label, classification)?;
        auxiliary.insert(label, dataset);
    }

    Ok(RunInput { main, auxiliary })
}

// ============================================================================
// Output
// ============================================================================

fn emit_json<T: Serialize>(value: &T, out: &OutputArgs) -> Result<(), CliError> {
    if !out.json && out.output.is_none() {
        return Ok(());
    }
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| cli_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = out.output {
        std::fs::write(path, &json_str)
            .map_err(|e| cli_err(EXIT_ERROR, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }
    if out.json {
        println!("{json_str}");
    }
    Ok(())
}

pub fn print_aggregate(report: &AggregateReport) {
    for findings in &report.datasets {
        let s = &findings.summary;
        eprintln!(
            "{}: {} rows, {} duplicate(s) ({:.2}%); timestamp-based {}, ohlcv-based {}",
            findings.label,
            s.row_count,
            s.total_duplicates,
            s.duplicate_percent,
            s.timestamp_based_duplicates,
            s.ohlcv_based_duplicates,
        );
        for key in &s.key_columns {
            eprintln!("  {} [{}]: {}", key.column, key.kind, key.duplicate_count);
        }
        if !s.skipped_columns.is_empty() {
            eprintln!("  not compared: {}", s.skipped_columns.join(", "));
        }
    }
    if !report.skipped.is_empty() {
        eprintln!("skipped (absent or empty): {}", report.skipped.join(", "));
    }
    eprintln!(
        "overall: {} duplicate(s) in {} rows ({:.2}%) across {} dataset(s)",
        report.total_duplicates,
        report.total_rows,
        report.overall_duplicate_percent,
        report.datasets.len(),
    );
    for issue in &report.critical_issues {
        eprintln!("critical: {issue}");
    }
}

fn print_remediation(report: &RemediationReport) {
    for entry in &report.per_dataset {
        match (&entry.output_path, &entry.error) {
            (Some(path), _) => eprintln!(
                "{}: removed {} of {} rows -> {}",
                entry.label,
                entry.removed,
                entry.original_rows,
                path.display()
            ),
            (None, Some(err)) => eprintln!("{}: removed {} rows but not saved: {err}", entry.label, entry.removed),
            (None, None) => eprintln!("{}: removed {} rows", entry.label, entry.removed),
        }
    }
    eprintln!("fixed {} duplicate row(s) in total", report.fixed_count);
    for issue in &report.unresolved_critical_issues {
        eprintln!("unresolved: {issue}");
    }
}

// ============================================================================
// Commands
// ============================================================================

pub fn cmd_scan(
    input: InputArgs,
    out: OutputArgs,
    fail_on_duplicates: bool,
    fail_on_critical: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let config = load_config(input.config.as_deref())?;
    let run_input = load_input(&input, &config)?;

    let observer = LogProgress;
    let report = Aggregator::new(&config)
        .with_observer(&observer)
        .aggregate(&run_input.main, &run_input.auxiliary);

    emit_json(&report, &out)?;
    if !quiet {
        print_aggregate(&report);
    }

    if fail_on_critical && report.has_critical_issues() {
        return Err(cli_err(
            EXIT_CRITICAL,
            format!("{} critical timestamp issue(s) found", report.critical_issues.len()),
        ));
    }
    if fail_on_duplicates && report.has_duplicates() {
        return Err(cli_err(
            EXIT_DUPLICATES,
            format!("{} duplicate row(s) found", report.total_duplicates),
        ));
    }
    Ok(())
}

pub fn cmd_fix(
    input: InputArgs,
    out: OutputArgs,
    yes: bool,
    out_dir: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let config = load_config(input.config.as_deref())?;
    let run_input = load_input(&input, &config)?;

    let sink = CsvSink::new(config.remediation.extension.clone());
    let observer = LogProgress;
    let ask = PrintThenAsk { quiet };
    let consent: &dyn ConsentProvider = if yes { &AlwaysProceed } else { &ask };

    let outcome: RunOutcome = run(
        &config,
        &run_input,
        &Collaborators {
            consent,
            sink: &sink,
            observer: &observer,
            output_dir: out_dir,
        },
    );

    emit_json(&outcome, &out)?;

    match outcome.remediation {
        Some(ref remediation) => {
            if !quiet {
                if yes {
                    print_aggregate(&outcome.aggregate);
                }
                print_remediation(remediation);
            }
            if !remediation.is_complete() {
                return Err(CliError {
                    code: EXIT_PERSIST,
                    message: format!("could not save: {}", remediation.failed.join(", ")),
                    hint: Some("check that the output directory is writable".into()),
                });
            }
        }
        None => {
            if !quiet {
                eprintln!("no changes made");
            }
        }
    }
    Ok(())
}

/// Show the findings, then ask on the terminal.
struct PrintThenAsk {
    quiet: bool,
}

impl ConsentProvider for PrintThenAsk {
    fn confirm(&self, report: &AggregateReport) -> bool {
        if !self.quiet {
            print_aggregate(report);
        }
        StdinConsent.confirm(report)
    }
}

pub fn cmd_config(config: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let text = config.to_toml()?;
    print!("{text}");
    Ok(())
}
