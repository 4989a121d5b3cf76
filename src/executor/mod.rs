//! Query execution engine
//!
//! Provides sequential and bounded-parallel execution of dataset rows.

mod parallel;
mod runner;

pub use parallel::ParallelExecutor;
pub use runner::QueryRunner;
