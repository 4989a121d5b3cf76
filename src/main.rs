//! Agent Query Harness - data-driven checks for agent message APIs
//!
//! Loads natural-language queries from a CSV/TSV dataset, sends each one to
//! the agent message endpoint and checks the HTTP response against the
//! row's expectation.
//!
//! ## Features
//!
//! - Per-row expectations: status expression, body substring, JSON field
//! - Malformed rows and transport failures reported per case
//! - Optional bounded concurrency with deterministic reporting order
//! - JSON and CSV run reports, combinable across runs
//!
//! ## Usage
//!
//! ```bash
//! # Run a dataset
//! agent-query-harness run --dataset data/testcases.csv --token $AGENT_JWT
//!
//! # Run four requests at a time, starting at row 20
//! agent-query-harness run --concurrent 4 --start 20
//!
//! # Check the API is up
//! agent-query-harness health --base-url http://10.0.0.5:8000
//!
//! # Merge reports from earlier runs
//! agent-query-harness combine --reports-dir reports
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use tracing::warn;

mod cli;
mod config;
mod dataset;
mod executor;
mod http;
mod models;
mod output;
mod results;
mod utils;

use cli::Args;
use config::AppConfig;
use dataset::{DatasetLoader, RowResult};
use executor::{ParallelExecutor, QueryRunner};
use output::{OutputFormat, ResultFormatter};
use results::{ReportStorage, StoredRun};
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match &args.log_level {
        Some(name) => LogLevel::from_str(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown log level: {name}"))?,
        None => {
            let verbose = args.verbose || config::EnvConfig::load().verbose.unwrap_or(false);
            LogLevel::from_verbose(verbose)
        }
    };
    init_logger(level);

    match args.command {
        cli::Command::Run(run_args) => {
            let mut config = AppConfig::resolve(args.config.as_deref())?;
            run_args.apply_to(&mut config);
            run_queries(config).await?;
        }
        cli::Command::Health(health_args) => {
            let mut config = AppConfig::resolve(args.config.as_deref())?;
            health_args.apply_to(&mut config);
            check_health(config).await?;
        }
        cli::Command::Combine(combine_args) => {
            let config = AppConfig::resolve(args.config.as_deref())?;
            combine(combine_args, config)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, args.config.as_deref())?;
        }
    }

    Ok(())
}

async fn run_queries(config: AppConfig) -> Result<()> {
    let format: OutputFormat = config
        .run
        .format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    // fail fast on an incomplete config, before touching the dataset
    let runner = QueryRunner::new(&config.client)?
        .with_dataset_label(config.dataset.path.display().to_string());

    let rows = dataset::skip_rows(load_rows(&config)?, config.run.start_index);

    let summary = if config.run.max_concurrent > 1 {
        ParallelExecutor::new(config.run.max_concurrent)
            .run_all(&runner, &rows)
            .await
    } else {
        runner.run_all(&rows).await
    };

    let mut formatter = ResultFormatter::new(format);
    if !std::io::stdout().is_terminal() {
        formatter = formatter.no_color();
    }
    println!("{}", formatter.format_summary(&summary));

    if config.run.write_reports {
        let storage = ReportStorage::new(&config.run.reports_dir);
        let run = StoredRun::new(summary.clone(), &config.client);
        let paths = storage.save(&run).context("Failed to write run reports")?;
        println!("Reports: {} {}", paths.json.display(), paths.csv.display());
    }

    if !summary.is_all_passed() {
        anyhow::bail!(
            "{} of {} cases did not pass",
            summary.total - summary.passed,
            summary.total
        );
    }

    Ok(())
}

fn load_rows(config: &AppConfig) -> Result<Vec<RowResult>> {
    let mut loader = DatasetLoader::new(&config.dataset.path);
    if let Some(delimiter) = config.dataset.delimiter {
        let byte = u8::try_from(delimiter)
            .with_context(|| format!("Delimiter must be ASCII: {delimiter:?}"))?;
        loader = loader.with_delimiter(byte);
    }

    if config.run.strict {
        let records = loader
            .load()
            .with_context(|| format!("Dataset rejected: {}", loader.path().display()))?;
        return Ok(records.into_iter().map(Ok).collect());
    }

    let rows = loader
        .load_rows()
        .with_context(|| format!("Failed to load dataset: {}", loader.path().display()))?;
    let malformed = rows.iter().filter(|r| r.is_err()).count();
    if malformed > 0 {
        warn!("{} malformed rows will be reported without a request", malformed);
    }
    Ok(rows)
}

async fn check_health(config: AppConfig) -> Result<()> {
    config.client.validate_connection()?;
    let client = http::ApiClient::new(config.client)?;

    let response = client
        .health()
        .await
        .context("Health check could not reach the API")?;

    let status = if response.is_success() { "✓" } else { "✗" };
    println!(
        "{} {} -> {} ({}ms)",
        status,
        client.config().health_path,
        response.status_code,
        response.duration_ms
    );
    println!("{}", response.body_text());

    if !response.is_success() {
        anyhow::bail!("Health check returned status {}", response.status_code);
    }
    Ok(())
}

fn combine(args: cli::CombineArgs, config: AppConfig) -> Result<()> {
    let reports_dir = args.reports_dir.unwrap_or(config.run.reports_dir);
    let storage = ReportStorage::new(reports_dir);

    let result = results::combine_reports(&storage, args.output)?;
    println!(
        "✓ Combined {} rows from {} reports into {}",
        result.rows,
        result.files,
        result.output.display()
    );
    Ok(())
}

fn manage_config(args: cli::ConfigArgs, explicit: Option<&Path>) -> Result<()> {
    use config::{print_env_help, ConfigFile, EnvConfig};

    match args.action {
        cli::ConfigAction::Init { output, force } => {
            if output.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {}. Use --force to overwrite.",
                    output.display()
                );
            }

            ConfigFile::example().save(&output)?;
            println!("✓ Configuration file created: {}", output.display());
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { env, format } => {
            if env {
                EnvConfig::load().print_summary();
            } else {
                let mut resolved = AppConfig::resolve(explicit)?;
                resolved.client = resolved.client.redacted();
                let output = if format == "json" {
                    serde_json::to_string_pretty(&resolved)?
                } else {
                    serde_yaml::to_string(&resolved)?
                };
                println!("{output}");
            }
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .or_else(|| explicit.map(Path::to_path_buf))
                .or_else(ConfigFile::find)
                .context("No configuration file found; pass --file")?;

            match ConfigFile::load(&path) {
                Ok(_) => println!("✓ Configuration file is valid: {}", path.display()),
                Err(e) => {
                    println!("✗ Configuration file is invalid: {}", path.display());
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Env => print_env_help(),
    }

    Ok(())
}
