//! Prefetch configuration
//!
//! Defaults are safe for the common case; `from_env` lets a host application
//! tune them without recompiling.

use std::env;
use std::str::FromStr;

use crate::error::{OrmError, OrmResult};

/// Environment variable overriding the path separator
pub const ENV_PATH_SEPARATOR: &str = "FASTQUERY_PATH_SEPARATOR";
/// Environment variable overriding the maximum nesting depth
pub const ENV_MAX_DEPTH: &str = "FASTQUERY_MAX_DEPTH";
/// Environment variable toggling empty-fetch skipping
pub const ENV_SKIP_EMPTY_FETCHES: &str = "FASTQUERY_SKIP_EMPTY_FETCHES";

/// Configuration for prefetch planning and execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// Separator between segments of a dotted relation path
    pub path_separator: String,
    /// Maximum depth of nested relations
    pub max_depth: usize,
    /// Do not hit the backend when a relation has no identifiers to look up
    pub skip_empty_fetches: bool,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            path_separator: ".".to_string(),
            max_depth: 10,
            skip_empty_fetches: true,
        }
    }
}

impl PrefetchConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> OrmResult<Self> {
        let defaults = Self::default();

        let path_separator = env::var(ENV_PATH_SEPARATOR).unwrap_or(defaults.path_separator);
        let max_depth = parse_env(ENV_MAX_DEPTH, defaults.max_depth)?;
        let skip_empty_fetches = match env::var(ENV_SKIP_EMPTY_FETCHES) {
            Ok(raw) => parse_bool(ENV_SKIP_EMPTY_FETCHES, &raw)?,
            Err(_) => defaults.skip_empty_fetches,
        };

        let config = Self {
            path_separator,
            max_depth,
            skip_empty_fetches,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> OrmResult<()> {
        if self.path_separator.is_empty() {
            return Err(OrmError::Configuration(
                "Path separator cannot be empty".to_string(),
            ));
        }

        if self.max_depth == 0 {
            return Err(OrmError::Configuration(
                "Maximum prefetch depth must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_path_separator(mut self, separator: impl Into<String>) -> Self {
        self.path_separator = separator.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_skip_empty_fetches(mut self, skip: bool) -> Self {
        self.skip_empty_fetches = skip;
        self
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> OrmResult<T> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            OrmError::Configuration(format!("Invalid value '{}' for {}", raw, key))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(key: &str, raw: &str) -> OrmResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(OrmError::Configuration(format!(
            "Invalid boolean '{}' for {}",
            raw, key
        ))),
    }
}
