//! Runtime configuration.
//!
//! Defaults, overridden by environment variables, overridden in turn by
//! command-line flags in `main`.

use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;

use crate::scanner::default_claude_dir;

pub const ENV_CLAUDE_HOME: &str = "CLAUDE_HOME";
pub const ENV_LOG_LEVEL: &str = "CLAUDE_STATS_LOG";
pub const ENV_LOG_FORMAT: &str = "CLAUDE_STATS_LOG_FORMAT";
pub const ENV_OUTPUT_DIR: &str = "CLAUDE_STATS_OUTPUT";

const LOG_FORMATS: &[&str] = &["pretty", "json"];
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The `.claude` data folder to analyze.
    pub claude_home: PathBuf,
    pub log_level: String,
    /// `pretty` or `json`.
    pub log_format: String,
    /// Where `stats.json` is written, if anywhere.
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            claude_home: default_claude_dir(),
            log_level: "warn".to_string(),
            log_format: "pretty".to_string(),
            output_dir: None,
        }
    }
}

impl Config {
    /// Defaults plus process environment overrides. Not validated: flags
    /// may still replace a bad value, so callers validate once at the end.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides(|key| env::var(key).ok());
        config
    }

    /// Apply overrides from `lookup`; empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(val) = lookup(ENV_CLAUDE_HOME) {
            self.claude_home = PathBuf::from(val);
        }
        if let Some(val) = lookup(ENV_LOG_LEVEL) {
            self.log_level = val;
        }
        if let Some(val) = lookup(ENV_LOG_FORMAT) {
            self.log_format = val;
        }
        if let Some(val) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = Some(PathBuf::from(val));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            bail!(
                "Unknown log format '{}', expected one of: {}",
                self.log_format,
                LOG_FORMATS.join(", ")
            );
        }
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            bail!(
                "Unknown log level '{}', expected one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            );
        }
        Ok(())
    }
}
