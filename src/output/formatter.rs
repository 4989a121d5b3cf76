//! Output formatters for run results
//!
//! Provides JSON, Table, CSV and summary output formats.

use std::str::FromStr;
use tracing::warn;

use crate::models::{CaseOutcome, CaseStatus, RunSummary};

const QUERY_WIDTH: usize = 40;
const ID_WIDTH: usize = 14;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "csv" => Ok(OutputFormat::Csv),
            "summary" => Ok(OutputFormat::Summary),
            other => Err(format!(
                "unknown output format '{other}' (table, json, json-pretty, csv, summary)"
            )),
        }
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    fn status_label(&self, status: CaseStatus) -> String {
        let label = format!("{} {}", status.symbol(), status);
        if !self.colorize {
            return label;
        }
        let color = match status {
            CaseStatus::Pass => "32",
            CaseStatus::Fail | CaseStatus::Transport => "31",
            CaseStatus::Malformed => "33",
        };
        format!("\x1b[{color}m{label}\x1b[0m")
    }

    fn format_outcome_table(&self, outcome: &CaseOutcome) -> String {
        let http = outcome
            .http_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());

        let mut line = format!(
            "{:4}. {:idw$} {:qw$} {:>3} [{:>6}ms] {}",
            outcome.row,
            truncate(&outcome.id, ID_WIDTH),
            truncate(&outcome.query, QUERY_WIDTH),
            http,
            outcome.duration_ms,
            self.status_label(outcome.status),
            idw = ID_WIDTH,
            qw = QUERY_WIDTH,
        );

        if let Some(message) = outcome.message.as_deref().filter(|_| !outcome.status.is_success()) {
            line.push_str(&format!("\n      └─ {message}"));
        }
        line
    }

    /// Format a run summary
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json => serde_json::to_string(summary).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(summary).unwrap_or_default(),
            OutputFormat::Csv => csv_lines(&summary.outcomes).unwrap_or_else(|e| {
                warn!("Failed to format CSV output: {}", e);
                String::new()
            }),
            OutputFormat::Summary => self.format_summary_brief(summary),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        output.push_str("\n══════════════════════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(" Run {} - {}\n", summary.run_id, summary.dataset));
        output.push_str("══════════════════════════════════════════════════════════════════════════════\n");

        for outcome in &summary.outcomes {
            output.push_str(&self.format_outcome_table(outcome));
            output.push('\n');
        }

        output.push_str("──────────────────────────────────────────────────────────────────────────────\n");

        let pass_str = if self.colorize {
            format!("\x1b[32m{}\x1b[0m", summary.passed)
        } else {
            summary.passed.to_string()
        };
        let fail_str = if self.colorize && summary.failed > 0 {
            format!("\x1b[31m{}\x1b[0m", summary.failed)
        } else {
            summary.failed.to_string()
        };

        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} | Malformed: {} | Transport: {}\n",
            summary.total, pass_str, fail_str, summary.malformed, summary.transport_errors
        ));
        output.push_str(&format!(
            " Pass Rate: {:5.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));

        output
    }

    fn format_summary_brief(&self, summary: &RunSummary) -> String {
        format!(
            "{} - Run {}: {}/{} passed ({:.1}%) in {}ms",
            summary.dataset,
            summary.run_id,
            summary.passed,
            summary.total,
            summary.pass_rate(),
            summary.total_duration_ms
        )
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

fn csv_lines(outcomes: &[CaseOutcome]) -> csv::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record([
        "row",
        "id",
        "status",
        "http_status",
        "duration_ms",
        "query",
        "message",
    ])?;
    for outcome in outcomes {
        writer.write_record([
            outcome.row.to_string(),
            outcome.id.clone(),
            outcome.status.to_string(),
            outcome.http_status.map(|s| s.to_string()).unwrap_or_default(),
            outcome.duration_ms.to_string(),
            outcome.query.clone(),
            outcome.message.clone().unwrap_or_default(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).trim_end().to_string())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}
