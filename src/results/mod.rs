//! Results storage module
//!
//! Writes per-run reports and combines them across runs.

mod combine;
mod storage;

pub use combine::combine_reports;
pub use storage::{ReportStorage, StoredRun};
