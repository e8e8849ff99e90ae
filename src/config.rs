//! Configuration types for Mockwire

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::registry::Origin;
use crate::{MockwireError, Result};

/// How captured exchanges are named on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingStrategy {
    /// `{base}[_{version}].json`, version chosen by content comparison
    #[default]
    Versioned,
    /// `{base}_{fingerprint}.json`, no pre-read of existing files
    RequestHash,
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory holding `<scenario>/<service>/*.json` mappings
    #[serde(default = "default_mock_data_dir")]
    pub mock_data_dir: PathBuf,
    /// File naming strategy for captured exchanges
    #[serde(default)]
    pub naming: NamingStrategy,
    /// Redaction applied to every service
    #[serde(default)]
    pub defaults: RedactionDefaults,
    /// Upstream services under test
    pub services: Vec<ServiceConfig>,
}

/// Upstream service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Logical service name, also the directory name under each scenario
    pub name: String,
    /// Base URL of the real upstream
    pub real_url: String,
    /// Base URL of the stand-in server; usually assigned at runtime
    #[serde(default)]
    pub mock_url: Option<String>,
    /// Request headers never written to recordings
    #[serde(default)]
    pub ignored_request_headers: Vec<String>,
    /// Response headers never written to recordings
    #[serde(default)]
    pub ignored_response_headers: Vec<String>,
}

/// Redaction shared by all services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionDefaults {
    /// Request headers never written to recordings
    #[serde(default = "default_ignored_request_headers")]
    pub ignored_request_headers: Vec<String>,
    /// Response headers never written to recordings
    #[serde(default)]
    pub ignored_response_headers: Vec<String>,
}

impl Default for RedactionDefaults {
    fn default() -> Self {
        Self {
            ignored_request_headers: default_ignored_request_headers(),
            ignored_response_headers: Vec::new(),
        }
    }
}

fn default_mock_data_dir() -> PathBuf {
    PathBuf::from("MockData")
}

fn default_ignored_request_headers() -> Vec<String> {
    vec!["traceparent".to_string(), "authorization".to_string()]
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MockwireError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| MockwireError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.services.is_empty() {
            return Err(MockwireError::ConfigError(
                "At least one service must be configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for (i, service) in self.services.iter().enumerate() {
            if service.name.trim().is_empty() {
                return Err(MockwireError::ConfigError(format!(
                    "Service {i}: name cannot be empty"
                )));
            }

            if !names.insert(service.name.as_str()) {
                return Err(MockwireError::ConfigError(format!(
                    "Service {i}: duplicate name '{}'",
                    service.name
                )));
            }

            Origin::parse(&service.real_url).map_err(|e| {
                MockwireError::ConfigError(format!("Service '{}': real_url: {e}", service.name))
            })?;

            if let Some(mock_url) = &service.mock_url {
                Origin::parse(mock_url).map_err(|e| {
                    MockwireError::ConfigError(format!(
                        "Service '{}': mock_url: {e}",
                        service.name
                    ))
                })?;
            }
        }

        Ok(())
    }
}
