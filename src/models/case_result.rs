//! Per-case outcomes and run summaries

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dataset::{MalformedRow, TestCaseRecord};
use crate::http::{ApiResponse, TransportError};

/// Outcome kind of one case
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    /// Response met every expectation
    Pass,
    /// Response arrived but did not match
    Fail,
    /// Row could not be parsed; no request was sent
    Malformed,
    /// Request never completed
    Transport,
}

impl CaseStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            CaseStatus::Pass => "✓",
            CaseStatus::Fail => "✗",
            CaseStatus::Malformed => "?",
            CaseStatus::Transport => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CaseStatus::Pass)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseStatus::Pass => write!(f, "PASS"),
            CaseStatus::Fail => write!(f, "FAIL"),
            CaseStatus::Malformed => write!(f, "MALFORMED"),
            CaseStatus::Transport => write!(f, "TRANSPORT"),
        }
    }
}

/// Result of evaluating one dataset row
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub row: usize,
    pub id: String,
    pub query: String,
    pub status: CaseStatus,
    pub http_status: Option<u16>,
    pub duration_ms: u64,
    pub reply_text: Option<String>,
    pub body: Option<String>,
    pub message: Option<String>,
    pub recorded_at: DateTime<Local>,
}

impl CaseOutcome {
    fn base(row: usize, id: String, query: String, status: CaseStatus) -> Self {
        Self {
            row,
            id,
            query,
            status,
            http_status: None,
            duration_ms: 0,
            reply_text: None,
            body: None,
            message: None,
            recorded_at: Local::now(),
        }
    }

    /// Evaluate a completed exchange against the record's expectation
    pub fn evaluated(record: &TestCaseRecord, response: &ApiResponse) -> Self {
        let reasons = record.expected.mismatches(response);
        let status = if reasons.is_empty() {
            CaseStatus::Pass
        } else {
            CaseStatus::Fail
        };

        let mut outcome = Self::base(record.row, record.id.clone(), record.query.clone(), status);
        outcome.http_status = Some(response.status_code);
        outcome.duration_ms = response.duration_ms;
        outcome.reply_text = Some(response.reply_text());
        outcome.body = Some(response.body_text());
        if !reasons.is_empty() {
            outcome.message = Some(reasons.join("; "));
        }
        outcome
    }

    pub fn transport_error(record: &TestCaseRecord, error: &TransportError, duration_ms: u64) -> Self {
        let mut outcome = Self::base(
            record.row,
            record.id.clone(),
            record.query.clone(),
            CaseStatus::Transport,
        );
        outcome.duration_ms = duration_ms;
        outcome.message = Some(error.to_string());
        outcome
    }

    pub fn malformed(error: &MalformedRow) -> Self {
        let mut outcome = Self::base(error.row, error.display_id(), String::new(), CaseStatus::Malformed);
        outcome.message = Some(error.to_string());
        outcome
    }
}

impl fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] row {} {} [{}ms]",
            self.status.symbol(),
            self.id,
            self.row,
            self.status,
            self.duration_ms
        )?;
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Summary of one run over a dataset
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub dataset: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub malformed: usize,
    pub transport_errors: usize,
    pub total_duration_ms: u64,
    pub outcomes: Vec<CaseOutcome>,
}

impl RunSummary {
    pub fn new(run_id: impl Into<String>, dataset: impl Into<String>, outcomes: Vec<CaseOutcome>) -> Self {
        let count = |status: CaseStatus| outcomes.iter().filter(|o| o.status == status).count();

        Self {
            run_id: run_id.into(),
            dataset: dataset.into(),
            total: outcomes.len(),
            passed: count(CaseStatus::Pass),
            failed: count(CaseStatus::Fail),
            malformed: count(CaseStatus::Malformed),
            transport_errors: count(CaseStatus::Transport),
            total_duration_ms: outcomes.iter().map(|o| o.duration_ms).sum(),
            outcomes,
        }
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.passed == self.total
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} - {}", self.run_id, self.dataset)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for outcome in &self.outcomes {
            writeln!(f, "  {outcome}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Malformed: {} | Transport: {}",
            self.total, self.passed, self.failed, self.malformed, self.transport_errors
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}

/// Run id of the form `20261018-142501_0427`
pub fn generate_run_id() -> String {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let random: u32 = rand::random::<u32>() % 10000;
    format!("{timestamp}_{random:04}")
}
