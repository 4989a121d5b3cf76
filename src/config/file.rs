//! Configuration file management
//!
//! Handles finding, loading, and validating configuration files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{AppConfig, ClientConfig, DatasetConfig, RunConfig};

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./query-harness.yaml",
    "./query-harness.yml",
    "./.query-harness.yaml",
    "~/.config/query-harness/config.yaml",
];

const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Full configuration file structure
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Version of config file format
    #[serde(default = "default_version")]
    pub version: String,

    /// API connection settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Dataset settings
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Run settings
    #[serde(default)]
    pub run: RunConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: default_version(),
            client: ClientConfig::default(),
            dataset: DatasetConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl ConfigFile {
    /// Find configuration file in standard locations
    pub fn find() -> Option<PathBuf> {
        CONFIG_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            anyhow::bail!("Unsupported config version: {}", self.version);
        }

        self.client
            .validate_connection()
            .context("Invalid client section")?;

        if self.run.max_concurrent == 0 {
            anyhow::bail!("run.max_concurrent must be at least 1");
        }

        if let Some(delimiter) = self.dataset.delimiter {
            if !delimiter.is_ascii() {
                anyhow::bail!("dataset.delimiter must be a single ASCII character");
            }
        }

        Ok(())
    }

    /// Generate example configuration
    pub fn example() -> Self {
        Self {
            version: default_version(),
            client: ClientConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                auth_token: String::new(),
                timeout_secs: 300,
                device_id: Some("00000000-0000-0000-0000-000000000000".to_string()),
                ..ClientConfig::default()
            },
            dataset: DatasetConfig::default(),
            run: RunConfig {
                max_concurrent: 1,
                ..RunConfig::default()
            },
        }
    }

    pub fn into_app_config(self) -> AppConfig {
        AppConfig {
            client: self.client,
            dataset: self.dataset,
            run: self.run,
        }
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_default() {
        let config = ConfigFile::default();
        assert_eq!(config.version, "1.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_save_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = ConfigFile::example();
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_file_save_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = ConfigFile::default();
        config.client.endpoint = "/api/v1/agent/stream".to_string();
        config.save(&path).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.client.endpoint, "/api/v1/agent/stream");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            "client:\n  base_url: http://api.internal:8000\n  auth_token: abc\nrun:\n  max_concurrent: 3\n",
        )
        .unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.client.base_url, "http://api.internal:8000");
        assert_eq!(loaded.client.auth_token, "abc");
        assert_eq!(loaded.client.endpoint, "/api/v1/agent/message");
        assert_eq!(loaded.run.max_concurrent, 3);
        assert_eq!(loaded.run.reports_dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_validate_config() {
        let mut config = ConfigFile::default();
        config.version = "9.9".to_string();
        assert!(config.validate().is_err());

        let mut config = ConfigFile::default();
        config.run.max_concurrent = 0;
        assert!(config.validate().is_err());

        let mut config = ConfigFile::default();
        config.client.base_url = "nowhere".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }
}
