//! Query runner
//!
//! Sends each dataset row to the API and turns the exchange into a
//! [`CaseOutcome`]. A failing row never stops the rows after it.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::ClientConfig;
use crate::dataset::{RowResult, TestCaseRecord};
use crate::http::{ApiClient, ReqwestTransport, Transport};
use crate::models::{generate_run_id, CaseOutcome, RunSummary};
use crate::utils::Timer;

/// Runs dataset rows against the message endpoint
pub struct QueryRunner<T: Transport = ReqwestTransport> {
    client: ApiClient<T>,
    dataset_label: String,
}

impl QueryRunner<ReqwestTransport> {
    /// Create a runner backed by reqwest; the config must be fully populated
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate().context("Client configuration is incomplete")?;
        let client = ApiClient::new(config.clone())?;
        Ok(Self::with_client(client))
    }
}

impl<T: Transport> QueryRunner<T> {
    pub fn with_client(client: ApiClient<T>) -> Self {
        Self {
            client,
            dataset_label: String::from("dataset"),
        }
    }

    /// Name recorded in the run summary
    pub fn with_dataset_label(mut self, label: impl Into<String>) -> Self {
        self.dataset_label = label.into();
        self
    }

    /// Send one record and evaluate the response
    pub async fn run_record(&self, record: &TestCaseRecord) -> CaseOutcome {
        info!("Running {}", record);
        let timer = Timer::start(format!("row {}", record.row));

        match self.client.send_case(record).await {
            Ok(response) => {
                let outcome = CaseOutcome::evaluated(record, &response);
                if !outcome.status.is_success() {
                    warn!(
                        "[{}] unexpected response: {}",
                        record.id,
                        outcome.message.as_deref().unwrap_or_default()
                    );
                }
                outcome
            }
            Err(e) => {
                error!("[{}] {} error: {}", record.id, e.kind(), e);
                CaseOutcome::transport_error(record, &e, timer.stop())
            }
        }
    }

    /// Evaluate one loaded row; malformed rows are reported without a request
    pub async fn run_case(&self, row: &RowResult) -> CaseOutcome {
        match row {
            Ok(record) => self.run_record(record).await,
            Err(malformed) => {
                warn!("Skipping request: {}", malformed);
                CaseOutcome::malformed(malformed)
            }
        }
    }

    /// Run every row in order, one request at a time
    pub async fn run_all(&self, rows: &[RowResult]) -> RunSummary {
        info!("Starting sequential run of {} rows", rows.len());

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            outcomes.push(self.run_case(row).await);
        }

        self.summarize(outcomes)
    }

    pub(super) fn summarize(&self, outcomes: Vec<CaseOutcome>) -> RunSummary {
        let summary = RunSummary::new(generate_run_id(), self.dataset_label.clone(), outcomes);
        info!(
            "Run {} completed - Pass: {}/{} ({:.1}%)",
            summary.run_id,
            summary.passed,
            summary.total,
            summary.pass_rate()
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetLoader;
    use crate::http::stub::StubTransport;
    use crate::http::TransportError;
    use crate::models::CaseStatus;
    use serde_json::json;
    use std::io::Write;

    fn stub_runner(transport: StubTransport) -> QueryRunner<StubTransport> {
        let config = ClientConfig::new("http://stub", "token");
        QueryRunner::with_client(ApiClient::with_transport(config, transport))
    }

    #[test]
    fn test_new_rejects_missing_token() {
        let config = ClientConfig::new("http://localhost:8000", "");
        assert!(QueryRunner::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_malformed_row_does_not_stop_run() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(
            file,
            "id,query,expect_substring\nA,list hosts,ok\nB,,\nC,show disks,ok\n"
        )
        .unwrap();
        file.flush().unwrap();

        let rows = DatasetLoader::new(file.path()).load_rows().unwrap();
        let runner = stub_runner(StubTransport::json(200, json!({"result": "ok"})))
            .with_dataset_label("three-rows");
        let summary = runner.run_all(&rows).await;

        assert_eq!(summary.total, 3);
        let statuses: Vec<_> = summary.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            [CaseStatus::Pass, CaseStatus::Malformed, CaseStatus::Pass]
        );
        assert_eq!(summary.outcomes[1].row, 2);
        assert_eq!(summary.dataset, "three-rows");

        let sent: Vec<_> = runner.client.transport().requests();
        assert_eq!(sent.len(), 2);
    }

    #[tokio::test]
    async fn test_start_offset_keeps_original_rows() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "id,query\nA,first\nB,second\nC,\nD,fourth\n").unwrap();
        file.flush().unwrap();

        let rows = DatasetLoader::new(file.path()).load_rows().unwrap();
        let rows = crate::dataset::skip_rows(rows, 2);

        let runner = stub_runner(StubTransport::json(200, json!({"result": "ok"})));
        let summary = runner.run_all(&rows).await;

        let outcomes: Vec<_> = summary
            .outcomes
            .iter()
            .map(|o| (o.row, o.id.as_str(), o.status))
            .collect();
        assert_eq!(
            outcomes,
            [(3, "C", CaseStatus::Malformed), (4, "D", CaseStatus::Pass)]
        );
        assert_eq!(runner.client.transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_flagged_per_case() {
        let runner = stub_runner(StubTransport::new(|request| {
            if request.body.as_deref().unwrap_or_default().contains("slow") {
                Err(TransportError::Timeout(5))
            } else {
                Ok(crate::http::RawResponse::json(200, &json!({"message": "done"})))
            }
        }));

        let rows: Vec<RowResult> = ["fast one", "slow one", "fast two"]
            .iter()
            .enumerate()
            .map(|(i, q)| {
                Ok(TestCaseRecord {
                    row: i + 1,
                    id: TestCaseRecord::fallback_id(i + 1),
                    query: q.to_string(),
                    expected: Default::default(),
                    thread_id: None,
                    session_id: None,
                    device_id: None,
                })
            })
            .collect();

        let summary = runner.run_all(&rows).await;
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.transport_errors, 1);
        assert_eq!(summary.outcomes[1].status, CaseStatus::Transport);
        assert_eq!(summary.outcomes[2].reply_text.as_deref(), Some("done"));
    }

    #[tokio::test]
    async fn test_unexpected_response_is_failure() {
        let runner = stub_runner(StubTransport::json(401, json!({"error": "unauthorized"})));
        let record = TestCaseRecord {
            row: 1,
            id: "TC-1".to_string(),
            query: "hello".to_string(),
            expected: Default::default(),
            thread_id: None,
            session_id: None,
            device_id: None,
        };

        let outcome = runner.run_record(&record).await;
        assert_eq!(outcome.status, CaseStatus::Fail);
        assert_eq!(outcome.http_status, Some(401));
        assert!(outcome.message.unwrap().contains("401"));
    }
}
