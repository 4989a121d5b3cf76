//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;

/// Data-driven query harness for agent message APIs
#[derive(Parser, Debug)]
#[command(name = "agent-query-harness")]
#[command(version)]
#[command(about = "Send dataset queries to an agent message API and check the responses")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error); overrides --verbose
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every query in a dataset
    Run(RunArgs),

    /// Check that the API is reachable
    Health(HealthArgs),

    /// Merge per-run CSV reports
    Combine(CombineArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Dataset file (CSV, or TSV by extension)
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    /// API base URL
    #[arg(short, long)]
    pub base_url: Option<String>,

    /// Bearer token
    #[arg(short, long)]
    pub token: Option<String>,

    /// Message endpoint path
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum requests in flight
    #[arg(short = 'n', long)]
    pub concurrent: Option<usize>,

    /// Skip the first N data rows
    #[arg(long)]
    pub start: Option<usize>,

    /// Abort before sending anything if any row is malformed
    #[arg(long)]
    pub strict: bool,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Directory for run reports
    #[arg(long)]
    pub reports_dir: Option<PathBuf>,

    /// Do not write report files
    #[arg(long)]
    pub no_report: bool,
}

impl RunArgs {
    /// Apply flags over the resolved configuration
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(v) = &self.dataset {
            config.dataset.path = v.clone();
        }
        if let Some(v) = &self.base_url {
            config.client.base_url = v.clone();
        }
        if let Some(v) = &self.token {
            config.client.auth_token = v.clone();
        }
        if let Some(v) = &self.endpoint {
            config.client.endpoint = v.clone();
        }
        if let Some(v) = self.timeout {
            config.client.timeout_secs = v;
        }
        if let Some(v) = self.concurrent {
            config.run.max_concurrent = v;
        }
        if let Some(v) = self.start {
            config.run.start_index = v;
        }
        if self.strict {
            config.run.strict = true;
        }
        if let Some(v) = &self.format {
            config.run.format = v.clone();
        }
        if let Some(v) = &self.reports_dir {
            config.run.reports_dir = v.clone();
        }
        if self.no_report {
            config.run.write_reports = false;
        }
    }
}

/// Arguments for health command
#[derive(Parser, Debug, Default)]
pub struct HealthArgs {
    /// API base URL
    #[arg(short, long)]
    pub base_url: Option<String>,

    /// Health endpoint path
    #[arg(short, long)]
    pub path: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl HealthArgs {
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(v) = &self.base_url {
            config.client.base_url = v.clone();
        }
        if let Some(v) = &self.path {
            config.client.health_path = v.clone();
        }
        if let Some(v) = self.timeout {
            config.client.timeout_secs = v;
        }
    }
}

/// Arguments for combine command
#[derive(Parser, Debug)]
pub struct CombineArgs {
    /// Directory holding query_results_*.csv reports
    #[arg(long)]
    pub reports_dir: Option<PathBuf>,

    /// Output file (defaults to combined_query_results_<timestamp>.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "query-harness.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the resolved configuration
    Show {
        /// Show environment variables instead
        #[arg(short, long)]
        env: bool,

        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Validate a configuration file
    Validate {
        /// File to validate (defaults to the first file found)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List supported environment variables
    Env,
}
