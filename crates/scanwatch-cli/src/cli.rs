//! scanwatch - full-table-scan advisor for Oracle
//!
//! ```text
//! scanwatch analyze --snapshot catalog.json [--threshold 25] [--no-scripts] [--json]
//! scanwatch schedule
//! ```

mod ledger;
mod logging;
mod output;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use ledger::ExecutionLedger;
use scanwatch_analyzer::{AdvisorPipeline, AdvisorReport};
use scanwatch_core::{AdvisorConfig, ScanwatchError};
use scanwatch_monitor::CatalogSnapshot;
use scanwatch_scripts::{ReportRenderer, ScriptGenerator, write_scripts};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "scanwatch")]
#[command(about = "Finds full-table-scan statements and plans index and refactoring work", long_about = None)]
#[command(version)]
struct Cli {
    /// Advisor configuration file (TOML)
    #[arg(short, long, global = true, env = "SCANWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the rolling JSON log
    #[arg(long, global = true, env = "SCANWATCH_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Verbose console logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a captured catalog snapshot
    Analyze(AnalyzeArgs),
    /// Show when the advisor last ran and when it is due again
    Schedule,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Catalog snapshot (JSON) to analyze
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Tier boundary in megabytes, overrides the configuration
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Directory for generated scripts, overrides the configuration
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Skip script and report generation
    #[arg(long)]
    no_scripts: bool,

    /// Print the report as JSON instead of tables
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logging_config = logging::LoggingConfig::default();
    if cli.verbose {
        logging_config = logging_config.verbose();
    }
    if let Some(dir) = &cli.log_dir {
        logging_config = logging_config.with_log_dir(dir);
    }
    let _guard = match logging::init(logging_config) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("warning: logging disabled: {:#}", err);
            None
        }
    };

    let result = match &cli.command {
        Command::Analyze(args) => analyze(cli.config.as_deref(), args).await,
        Command::Schedule => schedule(cli.config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if matches!(
                err.downcast_ref::<ScanwatchError>(),
                Some(ScanwatchError::Cancelled)
            ) {
                tracing::warn!("run cancelled, nothing was written");
                eprintln!("cancelled");
                return ExitCode::from(130);
            }
            tracing::error!(error = %format!("{:#}", err), "scanwatch failed");
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AdvisorConfig> {
    match path {
        Some(path) => AdvisorConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(AdvisorConfig::default()),
    }
}

async fn analyze(config_path: Option<&Path>, args: &AnalyzeArgs) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(threshold) = args.threshold {
        config = config.with_size_threshold_mb(threshold);
    }
    if let Some(dir) = &args.output_dir {
        config = config.with_output_dir(dir);
    }
    config.validate()?;

    let mut ledger = ExecutionLedger::load(&config.schedule.ledger_path)
        .with_context(|| format!("reading {}", config.schedule.ledger_path.display()))?;
    if ledger.is_first_run() {
        tracing::info!("first run, no execution ledger found");
    }

    let snapshot = CatalogSnapshot::from_file(&args.snapshot)
        .with_context(|| format!("loading snapshot {}", args.snapshot.display()))?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling run");
            on_interrupt.cancel();
        }
    });

    let pipeline = AdvisorPipeline::new(config.clone());
    let report = pipeline.run(&snapshot, &snapshot, &cancel).await?;
    let now = Utc::now();

    if !args.no_scripts {
        write_outputs(&config, &report, now)?;
    }

    ledger.record_run(now, config.schedule.interval_hours);
    ledger
        .save(&config.schedule.ledger_path)
        .with_context(|| format!("writing {}", config.schedule.ledger_path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_report(&report);
    }
    Ok(())
}

fn write_outputs(
    config: &AdvisorConfig,
    report: &AdvisorReport,
    now: chrono::DateTime<Utc>,
) -> anyhow::Result<()> {
    let generator =
        ScriptGenerator::new()?.with_default_index_column(&config.scripts.default_index_column);
    let scripts = generator.generate(&report.suggestions, &report.groups, now)?;
    if scripts.is_empty() {
        tracing::info!("no suggestion calls for a script");
    } else {
        let paths = write_scripts(&config.scripts.output_dir, &scripts)
            .with_context(|| format!("writing scripts to {}", config.scripts.output_dir.display()))?;
        eprintln!(
            "Wrote {} scripts to {}",
            paths.len(),
            config.scripts.output_dir.display()
        );
    }

    let report_path = ReportRenderer::new()?
        .write_report(&config.scripts.report_dir, report, now)
        .with_context(|| format!("writing report to {}", config.scripts.report_dir.display()))?;
    eprintln!("Report: {}", report_path.display());
    Ok(())
}

fn schedule(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let ledger = ExecutionLedger::load(&config.schedule.ledger_path)
        .with_context(|| format!("reading {}", config.schedule.ledger_path.display()))?;
    println!("{}", output::ledger_table(&ledger, Utc::now()));
    Ok(())
}
