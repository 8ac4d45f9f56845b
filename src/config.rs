//! YAML Configuration File Support for dom6api
//!
//! Loads the lookup service configuration (which tables to serve, where the
//! data lives, and how the fuzzy matcher is tuned) from a single YAML file.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! # dom6api configuration
//! version: "1.0"
//!
//! tables: [items, spells, units, sites, mercs, events]
//! data_root: "Data"
//!
//! database:
//!   backend: "sqlite_snapshot"
//!   path: "Data/dom6api.db"
//!   create_if_missing: true
//!
//! matcher:
//!   ratio_threshold: 70
//!   partial_ratio_threshold: 85
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use catalog::BackendConfig;
use matcher::ScorerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("missing required field: {0}")]
    MissingField(String),
}

/// Top-level YAML configuration for the lookup service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ApiConfig {
    /// Configuration format version
    pub version: String,

    /// Tables registered at startup; every one must exist in the data source
    #[serde(default = "default_tables")]
    pub tables: Vec<String>,

    /// Directory image references are rooted at
    #[serde(default = "default_data_root")]
    pub data_root: String,

    #[serde(default)]
    pub database: DatabaseYamlConfig,

    #[serde(default)]
    pub matcher: MatcherYamlConfig,
}

impl ApiConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: ApiConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        if self.tables.is_empty() {
            return Err(ConfigLoadError::MissingField("tables".to_string()));
        }
        let mut seen = HashSet::new();
        for table in &self.tables {
            if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ConfigLoadError::Validation(format!(
                    "table name '{table}' must be non-empty and use only [A-Za-z0-9_]"
                )));
            }
            if !seen.insert(table.as_str()) {
                return Err(ConfigLoadError::Validation(format!(
                    "table '{table}' is listed more than once"
                )));
            }
        }
        if self.data_root.trim().is_empty() {
            return Err(ConfigLoadError::MissingField("data_root".to_string()));
        }

        self.database.validate()?;
        self.matcher.validate()?;
        Ok(())
    }

    /// Backend selection derived from the `database` section.
    pub fn backend_config(&self) -> BackendConfig {
        self.database.to_backend_config()
    }

    pub fn scorer_config(&self) -> ScorerConfig {
        self.matcher.to_scorer_config()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            tables: default_tables(),
            data_root: default_data_root(),
            database: DatabaseYamlConfig::default(),
            matcher: MatcherYamlConfig::default(),
        }
    }
}

/// Data source YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseYamlConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub create_if_missing: bool,
}

impl DatabaseYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_backends = ["in_memory", "sqlite", "sqlite_snapshot"];
        if !valid_backends.contains(&self.backend.as_str()) {
            return Err(ConfigLoadError::Validation(format!(
                "database.backend must be one of: {valid_backends:?}"
            )));
        }

        if self.backend != "in_memory" && self.path.is_none() {
            return Err(ConfigLoadError::Validation(format!(
                "database.path is required when backend is '{}'",
                self.backend
            )));
        }

        Ok(())
    }

    fn to_backend_config(&self) -> BackendConfig {
        let path = self.path.clone().unwrap_or_default();
        match self.backend.as_str() {
            "sqlite" => BackendConfig::sqlite(path),
            "sqlite_snapshot" => BackendConfig::sqlite_snapshot(path),
            _ => BackendConfig::in_memory(),
        }
        .with_create_if_missing(self.create_if_missing)
    }
}

impl Default for DatabaseYamlConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: Some(default_database_path()),
            create_if_missing: false,
        }
    }
}

/// Matcher YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherYamlConfig {
    #[serde(default = "default_ratio_threshold")]
    pub ratio_threshold: u32,

    #[serde(default = "default_partial_ratio_threshold")]
    pub partial_ratio_threshold: u32,
}

impl MatcherYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.to_scorer_config()
            .validate()
            .map_err(|err| ConfigLoadError::Validation(format!("matcher: {err}")))
    }

    fn to_scorer_config(&self) -> ScorerConfig {
        ScorerConfig {
            ratio_threshold: self.ratio_threshold,
            partial_ratio_threshold: self.partial_ratio_threshold,
        }
    }
}

impl Default for MatcherYamlConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: matcher::scorer::RATIO_THRESHOLD,
            partial_ratio_threshold: matcher::scorer::PARTIAL_RATIO_THRESHOLD,
        }
    }
}

// Helper functions for serde defaults
fn default_tables() -> Vec<String> {
    ["items", "spells", "units", "sites", "mercs", "events"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}
fn default_data_root() -> String {
    matcher::shape::DEFAULT_DATA_ROOT.to_string()
}
fn default_backend() -> String {
    "sqlite".to_string()
}
fn default_database_path() -> String {
    "Data/dom6api.db".to_string()
}
fn default_ratio_threshold() -> u32 {
    matcher::scorer::RATIO_THRESHOLD
}
fn default_partial_ratio_threshold() -> u32 {
    matcher::scorer::PARTIAL_RATIO_THRESHOLD
}
