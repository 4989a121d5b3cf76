//! Parallel query execution
//!
//! Runs rows concurrently with at most `max_concurrent` requests in flight.

use futures::future::join_all;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::QueryRunner;
use crate::dataset::RowResult;
use crate::http::Transport;
use crate::models::{CaseOutcome, RunSummary};

/// Bounded parallel executor
pub struct ParallelExecutor {
    max_concurrent: usize,
}

impl ParallelExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run rows concurrently; outcomes come back sorted by row number
    pub async fn run_rows<T: Transport>(
        &self,
        runner: &QueryRunner<T>,
        rows: &[RowResult],
    ) -> Vec<CaseOutcome> {
        let semaphore = Semaphore::new(self.max_concurrent);

        let tasks = rows.iter().map(|row| {
            let semaphore = &semaphore;
            async move {
                // never closed
                let _permit = semaphore.acquire().await.ok();
                debug!("Starting parallel execution of row {}", row_number(row));
                runner.run_case(row).await
            }
        });

        let mut outcomes = join_all(tasks).await;
        outcomes.sort_by_key(|o| o.row);
        outcomes
    }

    /// Run all rows and summarize
    pub async fn run_all<T: Transport>(
        &self,
        runner: &QueryRunner<T>,
        rows: &[RowResult],
    ) -> RunSummary {
        info!(
            "Running {} rows in parallel (max {} concurrent)",
            rows.len(),
            self.max_concurrent
        );

        let start = Instant::now();
        let outcomes = self.run_rows(runner, rows).await;
        debug!(
            "Parallel execution completed in {}ms",
            start.elapsed().as_millis()
        );

        runner.summarize(outcomes)
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(4)
    }
}

fn row_number(row: &RowResult) -> usize {
    match row {
        Ok(record) => record.row,
        Err(malformed) => malformed.row,
    }
}
