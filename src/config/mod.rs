//! Configuration module for the query parser.
//!
//! Handles the TOML settings file and environment variable expansion.

mod settings;

pub use settings::{expand_env_vars, ConfigError, DefaultExpression, QueryParserConfig};
