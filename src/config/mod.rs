//! Configuration module
//!
//! Handles loading and layering configuration. Precedence, lowest first:
//! built-in defaults, config file, environment variables, CLI flags.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Connection settings for the API under test
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the API
    pub base_url: String,

    /// Bearer token sent in the Authorization header
    pub auth_token: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Message endpoint path
    pub endpoint: String,

    /// Health endpoint path
    pub health_path: String,

    /// Default thread id embedded in message payloads
    pub thread_id: String,

    /// Default session id embedded in message payloads
    pub session_id: String,

    /// Default device id embedded in message payloads
    pub device_id: Option<String>,

    /// Accept invalid TLS certificates
    pub insecure_tls: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            auth_token: String::new(),
            timeout_secs: 300,
            endpoint: "/api/v1/agent/message".to_string(),
            health_path: "/api/health".to_string(),
            thread_id: "1".to_string(),
            session_id: "1".to_string(),
            device_id: None,
            insecure_tls: false,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: auth_token.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the settings needed to reach the server at all
    pub fn validate_connection(&self) -> Result<()> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Base URL must use http or https: {}", self.base_url);
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("Timeout must be greater than zero");
        }
        Ok(())
    }

    /// Check that every setting needed for message calls is populated
    pub fn validate(&self) -> Result<()> {
        self.validate_connection()?;
        if self.auth_token.trim().is_empty() {
            anyhow::bail!(
                "No auth token configured (set QUERY_HARNESS_TOKEN, pass --token or add client.auth_token to the config file)"
            );
        }
        if self.endpoint.trim().is_empty() {
            anyhow::bail!("Endpoint path must not be empty");
        }
        Ok(())
    }

    /// Copy with the token masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.auth_token.is_empty() {
            copy.auth_token = "[REDACTED]".to_string();
        }
        copy
    }
}

/// Input dataset settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Path to the CSV/TSV file
    pub path: PathBuf,

    /// Field delimiter; inferred from the file extension when unset
    pub delimiter: Option<char>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/testcases.csv"),
            delimiter: None,
        }
    }
}

/// Run behaviour settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum requests in flight; 1 runs sequentially
    pub max_concurrent: usize,

    /// Abort before any request when the dataset has malformed rows
    pub strict: bool,

    /// Number of leading data rows to skip
    pub start_index: usize,

    /// Directory for run reports
    pub reports_dir: PathBuf,

    /// Write JSON and CSV reports after a run
    pub write_reports: bool,

    /// Console output format
    pub format: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            strict: false,
            start_index: 0,
            reports_dir: PathBuf::from("reports"),
            write_reports: true,
            format: "table".to_string(),
        }
    }
}

/// Fully resolved application configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub dataset: DatasetConfig,
    pub run: RunConfig,
}

impl AppConfig {
    /// Layer environment variables over a config file
    pub fn layered(file: ConfigFile, env: &EnvConfig) -> Self {
        let mut config = file.into_app_config();
        env.apply(&mut config);
        config
    }

    /// Resolve configuration from the file system and environment.
    ///
    /// The file is `explicit` if given, else `QUERY_HARNESS_CONFIG`, else the
    /// first file found in the standard locations.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let env = EnvConfig::load();

        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| env.config_file.as_ref().map(PathBuf::from))
            .or_else(ConfigFile::find);

        let file = match &path {
            Some(path) => {
                debug!("Loading config file {}", path.display());
                ConfigFile::load(path)?
            }
            None => ConfigFile::default(),
        };

        Ok(Self::layered(file, &env))
    }
}
