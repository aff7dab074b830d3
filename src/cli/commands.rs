//! CLI command definitions for scenario-bench.
//!
//! The commands work on results saved with `BenchmarkResult::dump`. Running a
//! benchmark needs a simulation backend, so that part lives in library code.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::export::{write_json_lines, write_parquet};
use crate::runner::{
    display_value, BenchmarkResult, ConfigDescriptor, EvaluationSummary, ResultRecord, BEHAVIOR,
    SCEN_IDX, SCEN_SET, STEP, TERMINAL,
};

/// Scenario benchmark result tooling.
#[derive(Parser)]
#[command(name = "scenario-bench")]
#[command(about = "Inspect and export scenario benchmark results")]
#[command(version)]
#[command(
    long_about = "scenario-bench reads benchmark results written by the runner.\n\nExample usage:\n  scenario-bench inspect ./results/highway.bench --criteria collision,goal_reached\n  scenario-bench export ./results/highway.bench -o ./results/highway.parquet"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Summarize a saved result: counts, terminal reasons and grouped means.
    Inspect(InspectArgs),

    /// Print one config and the record it produced.
    Show(ShowArgs),

    /// Export the tabular view of a saved result.
    Export(ExportArgs),
}

/// Arguments for `scenario-bench inspect`.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Saved result file.
    pub result: PathBuf,

    /// Comma-separated criteria to average (default: every evaluation field plus step).
    #[arg(short, long)]
    pub criteria: Option<String>,

    /// Output JSON to stdout instead of a table.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `scenario-bench show`.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Saved result file.
    pub result: PathBuf,

    /// Index of the config to show.
    pub config_idx: usize,
}

/// Export formats.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Parquet,
    Jsonl,
}

/// Arguments for `scenario-bench export`.
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Saved result file.
    pub result: PathBuf,

    /// Output file.
    #[arg(short = 'o', long)]
    pub output: PathBuf,

    /// Output format.
    #[arg(short = 'f', long, value_enum, default_value = "parquet")]
    pub format: ExportFormat,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Inspect(args) => run_inspect_command(args),
        Commands::Show(args) => run_show_command(args),
        Commands::Export(args) => run_export_command(args),
    }
}

fn load_result(path: &Path) -> anyhow::Result<BenchmarkResult> {
    BenchmarkResult::load(path)
        .with_context(|| format!("Failed to load benchmark result from {}", path.display()))
}

// ============================================================================
// Inspect
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct InspectOutput {
    run_id: String,
    records: usize,
    configs: Option<usize>,
    terminal_reasons: BTreeMap<String, usize>,
    summary: EvaluationSummary,
}

/// Every field that is not part of an episode's identity, plus `step`.
fn default_criteria(records: &[ResultRecord]) -> Vec<String> {
    let mut criteria: Vec<String> = records
        .iter()
        .flat_map(|record| record.keys())
        .filter(|key| ![SCEN_SET, SCEN_IDX, STEP, BEHAVIOR, TERMINAL].contains(&key.as_str()))
        .cloned()
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    criteria.push(STEP.to_string());
    criteria
}

fn parse_criteria(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn terminal_histogram(records: &[ResultRecord]) -> BTreeMap<String, usize> {
    let mut histogram = BTreeMap::new();
    for record in records {
        let reason = record.get(TERMINAL).map(display_value).unwrap_or_default();
        *histogram.entry(reason).or_insert(0) += 1;
    }
    histogram
}

fn inspect(result: &BenchmarkResult, criteria: Option<&str>) -> InspectOutput {
    let records = result.get_result_dict();
    let criteria = match criteria {
        Some(raw) => parse_criteria(raw),
        None => default_criteria(records),
    };
    InspectOutput {
        run_id: result.run_id().to_string(),
        records: records.len(),
        configs: result.get_benchmark_configs().map(<[ConfigDescriptor]>::len),
        terminal_reasons: terminal_histogram(records),
        summary: result.summarize(&criteria),
    }
}

fn run_inspect_command(args: InspectArgs) -> anyhow::Result<()> {
    let result = load_result(&args.result)?;
    let output = inspect(&result, args.criteria.as_deref());

    if args.json {
        let json_output = serde_json::to_string_pretty(&output)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
        return Ok(());
    }

    println!("\n=== Benchmark Result {} ===", output.run_id);
    println!("Records: {}", output.records);
    match output.configs {
        Some(n) => println!("Configs: {}", n),
        None => println!("Configs: (not stored)"),
    }
    println!("\nTerminal reasons:");
    for (reason, count) in &output.terminal_reasons {
        println!("  {:<40} {}", reason, count);
    }
    println!();
    print!("{}", output.summary);
    Ok(())
}

// ============================================================================
// Show
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct ShowOutput {
    config: Option<ConfigDescriptor>,
    record: Option<ResultRecord>,
}

/// Looks up a config and its record. Records are stored in config order.
fn show(result: &mut BenchmarkResult, config_idx: usize) -> anyhow::Result<ShowOutput> {
    let record = result.get_result_dict().get(config_idx).cloned();
    let config = if result.get_benchmark_configs().is_some() {
        Some(result.get_benchmark_config(config_idx)?.clone())
    } else {
        None
    };
    if config.is_none() && record.is_none() {
        anyhow::bail!("No config or record with index {}", config_idx);
    }

    if let (Some(config), Some(record)) = (&config, &record) {
        let matches = record.get(SCEN_SET) == Some(&Value::from(config.scenario_set_name.clone()))
            && record.get(SCEN_IDX) == Some(&Value::from(config.scenario_idx));
        if !matches {
            tracing::warn!(
                "Record {} does not belong to scenario {} of set \"{}\"",
                config_idx,
                config.scenario_idx,
                config.scenario_set_name
            );
        }
    }
    Ok(ShowOutput { config, record })
}

fn run_show_command(args: ShowArgs) -> anyhow::Result<()> {
    let mut result = load_result(&args.result)?;
    let output = show(&mut result, args.config_idx)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// ============================================================================
// Export
// ============================================================================

fn run_export_command(args: ExportArgs) -> anyhow::Result<()> {
    let mut result = load_result(&args.result)?;
    let table = result
        .get_data_frame()
        .context("Failed to build the tabular view")?;

    let written = match args.format {
        ExportFormat::Parquet => write_parquet(table, &args.output),
        ExportFormat::Jsonl => write_json_lines(table, &args.output),
    };
    written.with_context(|| format!("Failed to export to {}", args.output.display()))?;

    info!(
        "Exported {} records to {}",
        table.num_rows(),
        args.output.display()
    );
    Ok(())
}
