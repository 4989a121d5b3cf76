//! CSV/TSV dataset loader
//!
//! The whole file is parsed before any request is made, so malformed rows
//! surface at load time.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::record::{MalformedRow, TestCaseRecord};
use crate::models::{Expectation, StatusExpectation};

const QUERY_COLUMNS: &[&str] = &["query", "text"];
const ID_COLUMNS: &[&str] = &["id", "testcaseid", "test_id"];
const STATUS_COLUMNS: &[&str] = &["expect_status", "expected_status"];
const SUBSTRING_COLUMNS: &[&str] = &["expect_substring", "expected", "expect_err_substring"];
const FIELD_COLUMNS: &[&str] = &["expect_field", "expected_field"];

/// Outcome of parsing one data row
pub type RowResult = Result<TestCaseRecord, MalformedRow>;

/// File-level dataset failures
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read dataset header: {0}")]
    Header(#[source] csv::Error),

    #[error("dataset has no query column (expected one of: {})", QUERY_COLUMNS.join(", "))]
    MissingQueryColumn,

    #[error("failed to read dataset: {0}")]
    Read(#[source] csv::Error),

    #[error(transparent)]
    Malformed(#[from] MalformedRow),
}

/// Header positions of the recognised columns
#[derive(Debug)]
struct ColumnMap {
    query: usize,
    id: Option<usize>,
    status: Option<usize>,
    substring: Option<usize>,
    field: Option<usize>,
    thread_id: Option<usize>,
    session_id: Option<usize>,
    device_id: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, DatasetError> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();

        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| names.iter().position(|n| n == alias))
        };

        Ok(Self {
            query: find(QUERY_COLUMNS).ok_or(DatasetError::MissingQueryColumn)?,
            id: find(ID_COLUMNS),
            status: find(STATUS_COLUMNS),
            substring: find(SUBSTRING_COLUMNS),
            field: find(FIELD_COLUMNS),
            thread_id: find(&["thread_id"]),
            session_id: find(&["session_id"]),
            device_id: find(&["device_id"]),
        })
    }

    fn get<'r>(&self, record: &'r csv::StringRecord, index: Option<usize>) -> Option<&'r str> {
        index
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn parse(&self, row: usize, record: &csv::StringRecord) -> RowResult {
        let line = record.position().map(|p| p.line());
        let id = self.get(record, self.id).map(str::to_string);
        let malformed = |reason: String| {
            MalformedRow::new(row, reason)
                .at_line(line)
                .with_id(id.clone())
        };

        let query = self
            .get(record, Some(self.query))
            .ok_or_else(|| malformed("empty query".to_string()))?;

        let status = match self.get(record, self.status) {
            Some(expr) => expr
                .parse::<StatusExpectation>()
                .map_err(|e| malformed(e.to_string()))?,
            None => StatusExpectation::default(),
        };

        Ok(TestCaseRecord {
            row,
            id: id
                .clone()
                .unwrap_or_else(|| TestCaseRecord::fallback_id(row)),
            query: query.to_string(),
            expected: Expectation {
                status,
                substring: self.get(record, self.substring).map(str::to_string),
                field: self.get(record, self.field).map(str::to_string),
            },
            thread_id: self.get(record, self.thread_id).map(str::to_string),
            session_id: self.get(record, self.session_id).map(str::to_string),
            device_id: self.get(record, self.device_id).map(str::to_string),
        })
    }
}

/// Loads test cases from a delimited file
#[derive(Clone, Debug)]
pub struct DatasetLoader {
    path: PathBuf,
    delimiter: u8,
}

impl DatasetLoader {
    /// Create a loader; `.tsv` files are tab-delimited, everything else comma
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_tsv = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("tsv"))
            .unwrap_or(false);

        Self {
            path,
            delimiter: if is_tsv { b'\t' } else { b',' },
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every row, failing on the first malformed one
    pub fn load(&self) -> Result<Vec<TestCaseRecord>, DatasetError> {
        let rows = self.load_rows()?;
        let records = rows.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Load every row, keeping malformed rows as per-row errors
    pub fn load_rows(&self) -> Result<Vec<RowResult>, DatasetError> {
        let file = File::open(&self.path).map_err(|source| DatasetError::Io {
            path: self.path.clone(),
            source,
        })?;

        let rows = read_rows(file, self.delimiter)?;
        let malformed = rows.iter().filter(|r| r.is_err()).count();
        info!(
            "Loaded {} rows from {} ({} malformed)",
            rows.len(),
            self.path.display(),
            malformed
        );
        Ok(rows)
    }
}

/// Parse rows from any reader
pub fn read_rows<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RowResult>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = reader.headers().map_err(DatasetError::Header)?.clone();
    let columns = ColumnMap::from_headers(&headers)?;
    debug!("Dataset columns: {:?}", columns);

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = index + 1;
        match result {
            Ok(record) => rows.push(columns.parse(row, &record)),
            Err(err) if err.is_io_error() => return Err(DatasetError::Read(err)),
            Err(err) => {
                let line = err.position().map(|p| p.line());
                let reason = describe_csv_error(&err);
                warn!("Row {} is malformed: {}", row, reason);
                rows.push(Err(MalformedRow::new(row, reason).at_line(line)));
            }
        }
    }

    Ok(rows)
}

/// Drop the first `start` data rows; the rest keep their original row numbers
pub fn skip_rows(rows: Vec<RowResult>, start: usize) -> Vec<RowResult> {
    if start == 0 {
        return rows;
    }
    let rows: Vec<RowResult> = rows.into_iter().skip(start).collect();
    info!("Skipping first {} rows, {} remaining", start, rows.len());
    rows
}

fn describe_csv_error(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::Utf8 { .. } => "row is not valid UTF-8".to_string(),
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => format!("expected {expected_len} fields, found {len}"),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(content: &str) -> Vec<RowResult> {
        read_rows(content.as_bytes(), b',').unwrap()
    }

    fn write_file(suffix: &str, content: &[u8]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_rows_in_file_order() {
        let rows = parse("id,query\nA,first\nB,second\nC,third\n");
        let ids: Vec<_> = rows.iter().map(|r| r.as_ref().unwrap().id.as_str()).collect();
        let numbers: Vec<_> = rows.iter().map(|r| r.as_ref().unwrap().row).collect();
        assert_eq!(ids, ["A", "B", "C"]);
        assert_eq!(numbers, [1, 2, 3]);
    }

    #[test]
    fn test_empty_query_is_malformed() {
        let rows = parse("id,query\nA,first\nB,   \nC,third\n");
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        assert!(rows[2].is_ok());

        let err = rows[1].as_ref().unwrap_err();
        assert_eq!(err.row, 2);
        assert_eq!(err.id.as_deref(), Some("B"));
        assert_eq!(err.line, Some(3));
        assert!(err.reason.contains("empty query"));
    }

    #[test]
    fn test_unequal_field_count_is_malformed() {
        let rows = parse("id,query\nA,first\nB,second,extra\n");
        assert!(rows[0].is_ok());
        let err = rows[1].as_ref().unwrap_err();
        assert_eq!(err.row, 2);
        assert!(err.reason.contains("expected 2 fields"));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let mut content = b"id,query\nA,first\nB,".to_vec();
        content.extend_from_slice(&[0xff, 0xfe, b'x']);
        content.extend_from_slice(b"\nC,third\n");

        let rows = read_rows(content.as_slice(), b',').unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].as_ref().unwrap_err().reason.contains("UTF-8"));
        assert_eq!(rows[2].as_ref().unwrap().query, "third");
    }

    #[test]
    fn test_missing_query_column() {
        let err = read_rows("id,prompt\nA,hello\n".as_bytes(), b',').unwrap_err();
        assert!(matches!(err, DatasetError::MissingQueryColumn));
    }

    #[test]
    fn test_column_aliases_and_expectations() {
        let rows = parse(
            "\u{feff}TestCaseID,Text,Expected_Status,Expected,Expect_Field,Device_ID\n\
             TC-1,list vms,200|201,running,data.items,dev-9\n\
             ,show disks,,,,\n",
        );

        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.id, "TC-1");
        assert_eq!(first.query, "list vms");
        assert_eq!(first.expected.status, "200|201".parse::<StatusExpectation>().unwrap());
        assert_eq!(first.expected.substring.as_deref(), Some("running"));
        assert_eq!(first.expected.field.as_deref(), Some("data.items"));
        assert_eq!(first.device_id.as_deref(), Some("dev-9"));
        assert!(first.thread_id.is_none());

        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.id, "row-2");
        assert_eq!(second.expected, Expectation::default());
        assert!(second.device_id.is_none());
    }

    #[test]
    fn test_invalid_status_expression_is_malformed() {
        let rows = parse("id,query,expect_status\nA,hello,two hundred\n");
        let err = rows[0].as_ref().unwrap_err();
        assert!(err.reason.contains("two hundred"));
    }

    #[test]
    fn test_tsv_by_extension() {
        let file = write_file(".tsv", b"id\tquery\nA\thello, world\n");
        let records = DatasetLoader::new(file.path()).load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].query, "hello, world");
    }

    #[test]
    fn test_strict_load_fails_on_malformed_row() {
        let file = write_file(".csv", b"id,query\nA,hello\nB,\n");
        let err = DatasetLoader::new(file.path()).load().unwrap_err();
        match err {
            DatasetError::Malformed(row) => assert_eq!(row.row, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_is_idempotent() {
        let file = write_file(
            ".csv",
            b"id,query,expect_substring\nA,hello,hi\nB,\"quoted, text\",\n",
        );
        let loader = DatasetLoader::new(file.path());
        let first = loader.load_rows().unwrap();
        let second = loader.load_rows().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let err = DatasetLoader::new("/nonexistent/queries.csv")
            .load_rows()
            .unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }

    #[test]
    fn test_skip_rows_keeps_row_numbers() {
        let data = "id,query\nA,first\nB,\nC,third\nD,fourth\n";
        let rows = read_rows(data.as_bytes(), b',').unwrap();

        let rows = skip_rows(rows, 1);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].as_ref().unwrap_err().row, 2);
        assert_eq!(rows[1].as_ref().unwrap().row, 3);
        assert_eq!(rows[2].as_ref().unwrap().id, "D");

        assert!(skip_rows(rows.clone(), 10).is_empty());
        assert_eq!(skip_rows(rows, 0).len(), 3);
    }
}
