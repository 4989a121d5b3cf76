//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;
use std::path::PathBuf;

use super::AppConfig;

/// Environment variable prefix
const ENV_PREFIX: &str = "QUERY_HARNESS";

/// Token variable honoured when the prefixed one is unset
const LEGACY_TOKEN_VAR: &str = "AGENT_JWT";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Base URL from QUERY_HARNESS_BASE_URL
    pub base_url: Option<String>,
    /// Token from QUERY_HARNESS_TOKEN or AGENT_JWT
    pub token: Option<String>,
    /// Endpoint from QUERY_HARNESS_ENDPOINT
    pub endpoint: Option<String>,
    /// Timeout from QUERY_HARNESS_TIMEOUT
    pub timeout: Option<u64>,
    /// Thread id from QUERY_HARNESS_THREAD_ID
    pub thread_id: Option<String>,
    /// Session id from QUERY_HARNESS_SESSION_ID
    pub session_id: Option<String>,
    /// Device id from QUERY_HARNESS_DEVICE_ID
    pub device_id: Option<String>,
    /// Dataset path from QUERY_HARNESS_DATASET
    pub dataset: Option<String>,
    /// Concurrency from QUERY_HARNESS_CONCURRENT
    pub concurrent: Option<usize>,
    /// Reports directory from QUERY_HARNESS_REPORTS_DIR
    pub reports_dir: Option<String>,
    /// Output format from QUERY_HARNESS_FORMAT
    pub format: Option<String>,
    /// Config file from QUERY_HARNESS_CONFIG
    pub config_file: Option<String>,
    /// Verbose from QUERY_HARNESS_VERBOSE
    pub verbose: Option<bool>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            base_url: get_env("BASE_URL"),
            token: get_env("TOKEN").or_else(|| non_empty(env::var(LEGACY_TOKEN_VAR).ok())),
            endpoint: get_env("ENDPOINT"),
            timeout: get_env_parse("TIMEOUT"),
            thread_id: get_env("THREAD_ID"),
            session_id: get_env("SESSION_ID"),
            device_id: get_env("DEVICE_ID"),
            dataset: get_env("DATASET"),
            concurrent: get_env_parse("CONCURRENT"),
            reports_dir: get_env("REPORTS_DIR"),
            format: get_env("FORMAT"),
            config_file: get_env("CONFIG"),
            verbose: get_env_bool("VERBOSE"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.base_url.is_some()
            || self.token.is_some()
            || self.endpoint.is_some()
            || self.timeout.is_some()
            || self.thread_id.is_some()
            || self.session_id.is_some()
            || self.device_id.is_some()
            || self.dataset.is_some()
            || self.concurrent.is_some()
            || self.reports_dir.is_some()
            || self.format.is_some()
            || self.config_file.is_some()
            || self.verbose.is_some()
    }

    /// Override `config` with every variable that is set
    pub fn apply(&self, config: &mut AppConfig) {
        let client = &mut config.client;
        if let Some(v) = &self.base_url {
            client.base_url = v.clone();
        }
        if let Some(v) = &self.token {
            client.auth_token = v.clone();
        }
        if let Some(v) = &self.endpoint {
            client.endpoint = v.clone();
        }
        if let Some(v) = self.timeout {
            client.timeout_secs = v;
        }
        if let Some(v) = &self.thread_id {
            client.thread_id = v.clone();
        }
        if let Some(v) = &self.session_id {
            client.session_id = v.clone();
        }
        if let Some(v) = &self.device_id {
            client.device_id = Some(v.clone());
        }
        if let Some(v) = &self.dataset {
            config.dataset.path = PathBuf::from(v);
        }
        if let Some(v) = self.concurrent {
            config.run.max_concurrent = v;
        }
        if let Some(v) = &self.reports_dir {
            config.run.reports_dir = PathBuf::from(v);
        }
        if let Some(v) = &self.format {
            config.run.format = v.clone();
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        let token = self.token.as_ref().map(|_| "[REDACTED]");
        println!("Environment Configuration:");
        if !self.has_any() {
            println!("  (no {ENV_PREFIX}_* variables set)");
            return;
        }
        println!("  {}_BASE_URL:    {:?}", ENV_PREFIX, self.base_url);
        println!("  {}_TOKEN:       {:?}", ENV_PREFIX, token);
        println!("  {}_ENDPOINT:    {:?}", ENV_PREFIX, self.endpoint);
        println!("  {}_TIMEOUT:     {:?}", ENV_PREFIX, self.timeout);
        println!("  {}_THREAD_ID:   {:?}", ENV_PREFIX, self.thread_id);
        println!("  {}_SESSION_ID:  {:?}", ENV_PREFIX, self.session_id);
        println!("  {}_DEVICE_ID:   {:?}", ENV_PREFIX, self.device_id);
        println!("  {}_DATASET:     {:?}", ENV_PREFIX, self.dataset);
        println!("  {}_CONCURRENT:  {:?}", ENV_PREFIX, self.concurrent);
        println!("  {}_REPORTS_DIR: {:?}", ENV_PREFIX, self.reports_dir);
        println!("  {}_FORMAT:      {:?}", ENV_PREFIX, self.format);
        println!("  {}_CONFIG:      {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_VERBOSE:     {:?}", ENV_PREFIX, self.verbose);
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    non_empty(env::var(format!("{ENV_PREFIX}_{name}")).ok())
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

/// Builder for setting environment variables in tests
#[cfg(test)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

#[cfg(test)]
impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    /// Set a prefixed variable
    pub fn var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_{name}"), value.into()));
        self
    }

    pub fn base_url(self, url: impl Into<String>) -> Self {
        self.var("BASE_URL", url)
    }

    pub fn token(self, token: impl Into<String>) -> Self {
        self.var("TOKEN", token)
    }

    pub fn timeout(self, timeout: u64) -> Self {
        self.var("TIMEOUT", timeout.to_string())
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        for (key, value) in self.vars {
            env::set_var(key, value);
        }

        EnvGuard { previous }
    }
}

/// Guard that restores environment variables on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Serializes tests that mutate the process environment
#[cfg(test)]
pub static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Print all QUERY_HARNESS environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_BASE_URL     Base URL of the API under test");
    println!("  {ENV_PREFIX}_TOKEN        Bearer token (falls back to {LEGACY_TOKEN_VAR})");
    println!("  {ENV_PREFIX}_ENDPOINT     Message endpoint path");
    println!("  {ENV_PREFIX}_TIMEOUT      Request timeout in seconds");
    println!("  {ENV_PREFIX}_THREAD_ID    Default thread id in payloads");
    println!("  {ENV_PREFIX}_SESSION_ID   Default session id in payloads");
    println!("  {ENV_PREFIX}_DEVICE_ID    Default device id in payloads");
    println!("  {ENV_PREFIX}_DATASET      Path to the query dataset (CSV/TSV)");
    println!("  {ENV_PREFIX}_CONCURRENT   Maximum requests in flight");
    println!("  {ENV_PREFIX}_REPORTS_DIR  Directory for run reports");
    println!("  {ENV_PREFIX}_FORMAT       Output format (table, json, json-pretty, csv, summary)");
    println!("  {ENV_PREFIX}_CONFIG       Path to configuration file");
    println!("  {ENV_PREFIX}_VERBOSE      Enable verbose output (true/false)");
    println!();
    println!("Environment variables override the configuration file; CLI flags override both.");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_BASE_URL=http://10.0.0.5:8000");
    println!("  export {ENV_PREFIX}_TOKEN=eyJhbGciOi...");
    println!("  agent-query-harness run --dataset data/testcases.csv");
}
