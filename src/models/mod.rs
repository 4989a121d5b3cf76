//! Data models for query runs
//!
//! Expectations evaluated against responses and the per-case outcomes they
//! produce.

mod case_result;
mod expectation;

pub use case_result::{generate_run_id, CaseOutcome, CaseStatus, RunSummary};
pub use expectation::{Expectation, StatusExpectation};
