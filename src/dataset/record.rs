//! Dataset record types

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::models::Expectation;

/// One data row of the input file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TestCaseRecord {
    /// 1-based data row number, header excluded
    pub row: usize,
    pub id: String,
    pub query: String,
    pub expected: Expectation,
    pub thread_id: Option<String>,
    pub session_id: Option<String>,
    pub device_id: Option<String>,
}

impl TestCaseRecord {
    /// Identifier used when the id column is absent or blank
    pub fn fallback_id(row: usize) -> String {
        format!("row-{row}")
    }
}

impl fmt::Display for TestCaseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] row {}: {}", self.id, self.row, self.query)
    }
}

/// A data row that cannot become a [`TestCaseRecord`]
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[error("malformed row {row}{}: {reason}", line_suffix(.line))]
pub struct MalformedRow {
    pub row: usize,
    /// Physical line in the file, when known
    pub line: Option<u64>,
    pub id: Option<String>,
    pub reason: String,
}

fn line_suffix(line: &Option<u64>) -> String {
    line.map(|l| format!(" (line {l})")).unwrap_or_default()
}

impl MalformedRow {
    pub fn new(row: usize, reason: impl Into<String>) -> Self {
        Self {
            row,
            line: None,
            id: None,
            reason: reason.into(),
        }
    }

    pub fn at_line(mut self, line: Option<u64>) -> Self {
        self.line = line;
        self
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    /// Id to report the row under
    pub fn display_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| TestCaseRecord::fallback_id(self.row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_row_message() {
        let err = MalformedRow::new(2, "empty query").at_line(Some(3));
        assert_eq!(err.to_string(), "malformed row 2 (line 3): empty query");
        assert_eq!(err.display_id(), "row-2");

        let err = MalformedRow::new(5, "bad").with_id(Some("TC-5".into()));
        assert_eq!(err.to_string(), "malformed row 5: bad");
        assert_eq!(err.display_id(), "TC-5");
    }
}
