//! Harness configuration, loaded from TOML.
//!
//! Every section is optional and falls back to the defaults below. CLI flags
//! override individual fields after loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stratbench_core::scenario::{DEFAULT_RANDOM_COUNT, DEFAULT_SEED};
use stratbench_core::{SandboxPolicy, DEFAULT_EXTENSION};
use thiserror::Error;

use crate::aggregate::{default_groups, GroupRule};
use crate::score::ScoringPolicy;

/// Errors from loading or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("weight '{name}' must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("sandbox timeout must be greater than zero")]
    ZeroTimeout,
    #[error("unit file extension must not be empty")]
    EmptyExtension,
    #[error("group '{0}' has no patterns")]
    EmptyGroup(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub root: PathBuf,
    pub extension: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("strategies"),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub seed: u64,
    pub random_count: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            random_count: DEFAULT_RANDOM_COUNT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub report_path: PathBuf,
    pub csv_path: PathBuf,
    /// Full JSON dump; off unless set.
    pub json_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_path: PathBuf::from("reports/strategy_report.txt"),
            csv_path: PathBuf::from("reports/strategy_scores.csv"),
            json_path: None,
        }
    }
}

/// Top-level harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub discovery: DiscoveryConfig,
    pub scenarios: ScenarioConfig,
    pub sandbox: SandboxPolicy,
    pub policy: ScoringPolicy,
    pub output: OutputConfig,
    pub groups: Vec<GroupRule>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            scenarios: ScenarioConfig::default(),
            sandbox: SandboxPolicy::default(),
            policy: ScoringPolicy::default(),
            output: OutputConfig::default(),
            groups: default_groups(),
        }
    }
}

impl HarnessConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.policy.named_weights() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        if self.sandbox.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.discovery.extension.trim().is_empty() {
            return Err(ConfigError::EmptyExtension);
        }
        if let Some(group) = self.groups.iter().find(|g| g.patterns.is_empty()) {
            return Err(ConfigError::EmptyGroup(group.tag.clone()));
        }
        Ok(())
    }

    /// Canonical TOML, used for the run fingerprint.
    pub fn to_canonical_toml(&self) -> String {
        // Every field is a plain value, table or array; serialization cannot fail
        toml::to_string(self).unwrap_or_default()
    }
}
