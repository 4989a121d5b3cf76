//! Query dataset loading
//!
//! Reads a delimited file of test cases into ordered [`TestCaseRecord`]s.

mod loader;
mod record;

pub use loader::{skip_rows, DatasetLoader, RowResult};
pub use record::{MalformedRow, TestCaseRecord};
