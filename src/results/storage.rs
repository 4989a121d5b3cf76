//! Run report storage
//!
//! Every run is written twice: a JSON document with the full summary and a
//! flat CSV with one row per case.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

use crate::config::ClientConfig;
use crate::models::{CaseOutcome, RunSummary};

/// File name prefix of per-run reports
pub const REPORT_PREFIX: &str = "query_results_";

/// One CSV report line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub id: String,
    pub row: usize,
    pub query: String,
    /// Case outcome (PASS, FAIL, MALFORMED, TRANSPORT)
    pub outcome: String,
    /// HTTP status, empty when no response arrived
    pub status: String,
    pub date: String,
    pub timestamp: String,
    pub duration_ms: u64,
    pub resp_text: String,
    pub message: String,
    pub body: String,
}

impl ReportRow {
    pub fn from_outcome(outcome: &CaseOutcome) -> Self {
        Self {
            id: outcome.id.clone(),
            row: outcome.row,
            query: outcome.query.clone(),
            outcome: outcome.status.to_string(),
            status: outcome
                .http_status
                .map(|s| s.to_string())
                .unwrap_or_default(),
            date: outcome.recorded_at.format("%Y-%m-%d").to_string(),
            timestamp: outcome.recorded_at.format("%H:%M:%S").to_string(),
            duration_ms: outcome.duration_ms,
            resp_text: outcome.reply_text.clone().unwrap_or_default(),
            message: outcome.message.clone().unwrap_or_default(),
            body: outcome.body.clone().unwrap_or_default(),
        }
    }
}

/// JSON report document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRun {
    /// Tool version that produced the report
    pub tool_version: String,

    /// API base URL
    pub base_url: String,

    /// Message endpoint path
    pub endpoint: String,

    /// Time the report was written
    pub completed_at: DateTime<Local>,

    #[serde(flatten)]
    pub summary: RunSummary,
}

impl StoredRun {
    pub fn new(summary: RunSummary, client: &ClientConfig) -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            base_url: client.base_url.clone(),
            endpoint: client.endpoint.clone(),
            completed_at: Local::now(),
            summary,
        }
    }
}

/// Paths written for one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

/// Report storage manager
pub struct ReportStorage {
    /// Directory holding the reports
    base_dir: PathBuf,
}

impl ReportStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Ensure storage directory exists
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create reports directory: {}",
                self.base_dir.display()
            )
        })
    }

    fn report_path(&self, run_id: &str, extension: &str) -> PathBuf {
        self.base_dir
            .join(format!("{REPORT_PREFIX}{run_id}.{extension}"))
    }

    /// Write the JSON and CSV reports for a run
    pub fn save(&self, run: &StoredRun) -> Result<ReportPaths> {
        self.ensure_dir()?;

        let paths = ReportPaths {
            json: self.report_path(&run.summary.run_id, "json"),
            csv: self.report_path(&run.summary.run_id, "csv"),
        };

        let file = File::create(&paths.json).context("Failed to create JSON report")?;
        serde_json::to_writer_pretty(BufWriter::new(file), run)
            .context("Failed to write JSON report")?;

        let rows: Vec<ReportRow> = run.summary.outcomes.iter().map(ReportRow::from_outcome).collect();
        write_csv(&paths.csv, &rows)?;

        info!(
            "Saved reports to {} and {}",
            paths.json.display(),
            paths.csv.display()
        );
        Ok(paths)
    }

    /// Per-run CSV reports, oldest first by modification time
    pub fn list_csv_reports(&self) -> Result<Vec<PathBuf>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut reports: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            let is_report = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(REPORT_PREFIX) && n.ends_with(".csv"))
                .unwrap_or(false);

            if is_report {
                let modified = fs::metadata(&path)?
                    .modified()
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                reports.push((modified, path));
            }
        }

        reports.sort();
        Ok(reports.into_iter().map(|(_, path)| path).collect())
    }
}

/// Read report rows from a CSV file
pub fn read_csv(path: &Path) -> Result<Vec<ReportRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open report: {}", path.display()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<ReportRow>, _>>()
        .with_context(|| format!("Failed to parse report: {}", path.display()))
}

/// Write report rows to a CSV file
pub fn write_csv(path: &Path, rows: &[ReportRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create report: {}", path.display()))?;

    if rows.is_empty() {
        // serde only emits the header alongside the first record
        writer.write_record(REPORT_COLUMNS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

const REPORT_COLUMNS: [&str; 11] = [
    "id",
    "row",
    "query",
    "outcome",
    "status",
    "date",
    "timestamp",
    "duration_ms",
    "resp_text",
    "message",
    "body",
];
