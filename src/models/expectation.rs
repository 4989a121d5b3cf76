//! Response expectations
//!
//! A row may constrain the status code, require a substring in the body and
//! require a JSON field to be present. Every constraint that is set must
//! hold for the case to pass.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::http::ApiResponse;

/// One alternative of a status expression
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusMatcher {
    /// Exact code, e.g. `404`
    Exact(u16),
    /// Status class by leading digit, e.g. `2xx`
    Class(u8),
    Any,
}

impl StatusMatcher {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            StatusMatcher::Exact(code) => *code == status,
            StatusMatcher::Class(class) => status / 100 == u16::from(*class),
            StatusMatcher::Any => true,
        }
    }
}

impl fmt::Display for StatusMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMatcher::Exact(code) => write!(f, "{code}"),
            StatusMatcher::Class(class) => write!(f, "{class}xx"),
            StatusMatcher::Any => write!(f, "any"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid status expectation '{0}' (use a code like 200, a class like 2xx, or any)")]
pub struct InvalidStatus(pub String);

impl FromStr for StatusMatcher {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        let invalid = || InvalidStatus(s.trim().to_string());

        if token == "any" || token == "*" {
            return Ok(StatusMatcher::Any);
        }

        if let Some(digit) = token.strip_suffix("xx") {
            return match digit.parse::<u8>() {
                Ok(class @ 1..=5) if digit.len() == 1 => Ok(StatusMatcher::Class(class)),
                _ => Err(invalid()),
            };
        }

        match token.parse::<u16>() {
            Ok(code @ 100..=599) => Ok(StatusMatcher::Exact(code)),
            _ => Err(invalid()),
        }
    }
}

/// `|`-separated status alternatives; defaults to `2xx`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusExpectation {
    alternatives: Vec<StatusMatcher>,
}

impl StatusExpectation {
    pub fn new(alternatives: Vec<StatusMatcher>) -> Self {
        Self { alternatives }
    }

    pub fn matches(&self, status: u16) -> bool {
        self.alternatives.iter().any(|m| m.matches(status))
    }
}

impl Default for StatusExpectation {
    fn default() -> Self {
        Self::new(vec![StatusMatcher::Class(2)])
    }
}

impl FromStr for StatusExpectation {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let alternatives = s
            .split('|')
            .map(str::parse)
            .collect::<Result<Vec<StatusMatcher>, _>>()
            .map_err(|_| InvalidStatus(s.trim().to_string()))?;
        Ok(Self::new(alternatives))
    }
}

impl fmt::Display for StatusExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, matcher) in self.alternatives.iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            write!(f, "{matcher}")?;
        }
        Ok(())
    }
}

impl Serialize for StatusExpectation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Expected outcome of one dataset row
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Expectation {
    pub status: StatusExpectation,
    /// Must occur in the body text, ignoring case
    pub substring: Option<String>,
    /// Dotted path or JSON pointer that must resolve to a non-null value
    pub field: Option<String>,
}

impl Expectation {
    /// Every unmet constraint, in evaluation order; empty when the response passes
    pub fn mismatches(&self, response: &ApiResponse) -> Vec<String> {
        let mut reasons = Vec::new();

        if !self.status.matches(response.status_code) {
            reasons.push(format!(
                "expected status {}, got {}",
                self.status, response.status_code
            ));
        }

        if let Some(needle) = &self.substring {
            if !response.body_contains_ignore_case(needle) {
                reasons.push(format!("body does not contain '{needle}'"));
            }
        }

        if let Some(path) = &self.field {
            if response.field(path).is_none() {
                reasons.push(format!("field '{path}' is missing or null"));
            }
        }

        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ApiBody;
    use serde_json::json;

    fn response(status_code: u16, body: ApiBody) -> ApiResponse {
        ApiResponse {
            status_code,
            body,
            content_type: None,
            duration_ms: 1,
        }
    }

    #[test]
    fn test_status_expression_parsing() {
        let expr: StatusExpectation = " 200 | 4XX ".parse().unwrap();
        assert!(expr.matches(200));
        assert!(expr.matches(404));
        assert!(!expr.matches(201));
        assert!(!expr.matches(500));
        assert_eq!(expr.to_string(), "200|4xx");

        assert_eq!("".parse::<StatusExpectation>().unwrap(), StatusExpectation::default());
        assert!("any".parse::<StatusExpectation>().unwrap().matches(503));
    }

    #[test]
    fn test_invalid_status_expressions() {
        for bad in ["ok", "6xx", "20x", "99", "200|", "12xx"] {
            assert!(bad.parse::<StatusExpectation>().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_default_expectation_requires_2xx() {
        let expectation = Expectation::default();
        assert!(expectation.mismatches(&response(204, ApiBody::Text(String::new()))).is_empty());

        let reasons = expectation.mismatches(&response(500, ApiBody::Text("boom".into())));
        assert_eq!(reasons, ["expected status 2xx, got 500"]);
    }

    #[test]
    fn test_all_mismatches_reported() {
        let expectation = Expectation {
            status: "200".parse().unwrap(),
            substring: Some("Running".to_string()),
            field: Some("data.vms".to_string()),
        };

        let ok = response(200, ApiBody::Json(json!({"data": {"vms": ["vm-1 RUNNING"]}})));
        assert!(expectation.mismatches(&ok).is_empty());

        let bad = response(401, ApiBody::Json(json!({"error": "unauthorized"})));
        let reasons = expectation.mismatches(&bad);
        assert_eq!(reasons.len(), 3);
        assert!(reasons[1].contains("Running"));
        assert!(reasons[2].contains("data.vms"));
    }

    #[test]
    fn test_field_check_on_text_body() {
        let expectation = Expectation {
            field: Some("output".to_string()),
            ..Default::default()
        };
        let reasons = expectation.mismatches(&response(200, ApiBody::Text("output".into())));
        assert_eq!(reasons.len(), 1);
    }

    #[test]
    fn test_quoted_substring_matches_json_value() {
        let expectation = Expectation {
            substring: Some("\"running\"".to_string()),
            ..Default::default()
        };
        let body = ApiBody::Json(json!({"output": "VM state is \"running\""}));
        assert!(expectation.mismatches(&response(200, body)).is_empty());
    }

    #[test]
    fn test_serializes_as_expression() {
        let expectation = Expectation {
            status: "201|any".parse().unwrap(),
            ..Default::default()
        };
        let value = serde_json::to_value(&expectation).unwrap();
        assert_eq!(value["status"], json!("201|any"));
        assert_eq!(value["substring"], json!(null));
    }
}
