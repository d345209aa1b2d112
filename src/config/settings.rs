//! TOML-based configuration for the query parser.
//!
//! Supports a config file (runfilter.toml) with environment variable expansion
//! in table names.
//!
//! Example configuration:
//! ```toml
//! dialect = "postgres"
//!
//! [default_expression]
//! contains = "run.archived"
//! expression = "not run.archived"
//!
//! [tables]
//! runs = "runs"
//! experiments = "Experiment"
//! metrics = "metrics"
//! latest_metrics = "${LATEST_METRICS_TABLE}"
//! ```

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::SyntaxError;

/// Error type for query parser configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    #[error("Invalid table name for '{entity}': {table}")]
    InvalidTableName { entity: String, table: String },

    #[error("Invalid default expression: {0}")]
    InvalidDefaultExpression(#[source] SyntaxError),
}

/// Predicate AND-ed onto every query that does not mention `contains`.
///
/// With `contains = "run.archived"` and `expression = "not run.archived"`,
/// archived runs are hidden unless the query asks about them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultExpression {
    /// Substring of the raw query that suppresses the default.
    pub contains: String,

    /// Filter text to add. Empty disables the default.
    pub expression: String,
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryParserConfig {
    /// Target dialect name (`postgres` or `sqlite`).
    pub dialect: String,

    /// Default predicate merged into queries.
    pub default_expression: DefaultExpression,

    /// Symbolic entity name → physical table name.
    pub tables: BTreeMap<String, String>,
}

impl Default for QueryParserConfig {
    fn default() -> Self {
        Self {
            dialect: "postgres".to_string(),
            default_expression: DefaultExpression::default(),
            tables: ["runs", "experiments", "metrics"]
                .into_iter()
                .map(|t| (t.to_string(), t.to_string()))
                .collect(),
        }
    }
}

impl QueryParserConfig {
    /// Parse settings from TOML text.
    ///
    /// Table names have `${VAR}` / `$VAR` references expanded.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: QueryParserConfig = toml::from_str(content)?;
        for table in config.tables.values_mut() {
            *table = expand_env_vars(table)?;
        }
        Ok(config)
    }

    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `RUNFILTER_CONFIG`
    /// 2. `./runfilter.toml`
    /// 3. `~/.config/runfilter/config.toml`
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = env::var("RUNFILTER_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("runfilter.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("runfilter").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(QueryParserConfig::default())
    }

    /// Builder-style setter for the dialect name.
    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }

    /// Builder-style setter for the default expression.
    pub fn with_default_expression(
        mut self,
        contains: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        self.default_expression = DefaultExpression {
            contains: contains.into(),
            expression: expression.into(),
        };
        self
    }

    /// Builder-style setter for one table mapping entry.
    pub fn with_table(mut self, entity: impl Into<String>, table: impl Into<String>) -> Self {
        self.tables.insert(entity.into(), table.into());
        self
    }
}

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}|\$([A-Za-z0-9_]+)").unwrap());

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax; a lone `$` is kept.
pub fn expand_env_vars(s: &str) -> Result<String, ConfigError> {
    let mut missing = None;
    let expanded = ENV_VAR.replace_all(s, |caps: &Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ConfigError::MissingEnvVar(name)),
        None => Ok(expanded.into_owned()),
    }
}
