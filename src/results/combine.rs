//! Report combination
//!
//! Merges per-run CSV reports into one file with a single line per
//! `(id, query)` pair.

use anyhow::Result;
use chrono::Local;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

use super::storage::{read_csv, write_csv, ReportRow, ReportStorage};

/// Outcome of a combine pass
#[derive(Clone, Debug)]
pub struct CombineResult {
    pub output: PathBuf,
    pub files: usize,
    pub rows: usize,
}

/// Latest row per `(id, query)`, in first-seen order
pub fn dedupe_rows(rows: impl IntoIterator<Item = ReportRow>) -> Vec<ReportRow> {
    let mut combined: Vec<ReportRow> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for row in rows {
        let key = (row.id.clone(), row.query.clone());
        match index.get(&key) {
            Some(&slot) => combined[slot] = row,
            None => {
                index.insert(key, combined.len());
                combined.push(row);
            }
        }
    }

    combined
}

/// Combine every per-run CSV report in the storage directory.
///
/// Files are read oldest first so later runs win. Unreadable files are
/// skipped with a warning.
pub fn combine_reports(storage: &ReportStorage, output: Option<PathBuf>) -> Result<CombineResult> {
    let reports = storage.list_csv_reports()?;
    if reports.is_empty() {
        anyhow::bail!(
            "No query_results_*.csv reports found in {}",
            storage.base_dir().display()
        );
    }

    let mut all_rows = Vec::new();
    let mut files = 0;
    for path in &reports {
        match read_csv(path) {
            Ok(rows) => {
                files += 1;
                all_rows.extend(rows);
            }
            Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
        }
    }

    let rows = dedupe_rows(all_rows);
    let output = output.unwrap_or_else(|| {
        let timestamp = Local::now().format("%Y%m%d-%H%M%S");
        storage
            .base_dir()
            .join(format!("combined_query_results_{timestamp}.csv"))
    });

    write_csv(&output, &rows)?;
    info!(
        "Combined {} rows from {} reports into {}",
        rows.len(),
        files,
        output.display()
    );

    Ok(CombineResult {
        output,
        files,
        rows: rows.len(),
    })
}
