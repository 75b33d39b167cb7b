//! Engine configuration file support
//!
//! Handles parsing of `.import-export.toml` configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::RetryPolicy;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".import-export.toml";

/// Environment variable for the maximum number of attempts
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "IMPORT_EXPORT_RETRY_MAX_ATTEMPTS";

/// Environment variable for the first backoff delay in milliseconds
pub const ENV_RETRY_INITIAL_BACKOFF_MS: &str = "IMPORT_EXPORT_RETRY_INITIAL_BACKOFF_MS";

/// Environment variable for the backoff growth factor, at least 1.0
pub const ENV_RETRY_MULTIPLIER: &str = "IMPORT_EXPORT_RETRY_MULTIPLIER";

/// Environment variable for the backoff cap in milliseconds
pub const ENV_RETRY_MAX_BACKOFF_MS: &str = "IMPORT_EXPORT_RETRY_MAX_BACKOFF_MS";

/// Environment variable for the number of files per load statement
pub const ENV_MAX_FILES_PER_COPY: &str = "IMPORT_EXPORT_MAX_FILES_PER_COPY";

/// Snowflake rejects `COPY INTO .. FILES = (...)` lists longer than this
pub const DEFAULT_MAX_FILES_PER_COPY: usize = 1000;

/// Error type for configuration handling
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Retry configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

/// Import configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSection {
    /// Files referenced by a single load statement
    #[serde(default = "default_max_files_per_copy")]
    pub max_files_per_copy: usize,
}

fn default_max_files_per_copy() -> usize {
    DEFAULT_MAX_FILES_PER_COPY
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            max_files_per_copy: default_max_files_per_copy(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `.import-export.toml` configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub retry: RetrySection,

    #[serde(default)]
    pub import: ImportSection,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a directory
    ///
    /// Looks for `.import-export.toml` in `dir`, falling back to defaults
    /// when absent. Environment overrides are applied in both cases.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to a directory
    pub fn save(&self, dir: &Path) -> Result<(), ConfigError> {
        std::fs::write(dir.join(CONFIG_FILENAME), self.to_toml()?)?;
        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides read through `lookup`; unparsable values are ignored
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(ENV_RETRY_MAX_ATTEMPTS)
            && let Ok(attempts) = value.parse()
        {
            self.retry.max_attempts = attempts;
        }

        if let Some(value) = lookup(ENV_RETRY_INITIAL_BACKOFF_MS)
            && let Ok(ms) = value.parse()
        {
            self.retry.initial_backoff_ms = ms;
        }

        if let Some(value) = lookup(ENV_RETRY_MULTIPLIER)
            && let Ok(multiplier) = value.parse::<f64>()
            && multiplier.is_finite()
            && multiplier >= 1.0
        {
            self.retry.multiplier = multiplier;
        }

        if let Some(value) = lookup(ENV_RETRY_MAX_BACKOFF_MS)
            && let Ok(ms) = value.parse()
        {
            self.retry.max_backoff_ms = ms;
        }

        if let Some(value) = lookup(ENV_MAX_FILES_PER_COPY)
            && let Ok(count) = value.parse::<usize>()
            && count > 0
        {
            self.import.max_files_per_copy = count;
        }
    }

    /// Retry policy described by the `[retry]` section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            multiplier: self.retry.multiplier,
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Import/export engine configuration

[retry]
# Total attempts for an import or export failing with a retryable error
max_attempts = 5
initial_backoff_ms = 500
max_backoff_ms = 30000
multiplier = 2.0

[import]
# Files referenced by a single COPY / IMPORT / LOAD statement
max_files_per_copy = 1000
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.import.max_files_per_copy, 1000);
    }

    #[test]
    fn test_parse_partial_config() {
        let config = EngineConfig::parse(
            r#"
[retry]
max_attempts = 2
"#,
        )
        .unwrap();
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.initial_backoff_ms, 500);
        assert_eq!(config.import.max_files_per_copy, 1000);
    }

    #[test]
    fn test_sample_config_parses() {
        let config = EngineConfig::parse(sample_config()).unwrap();
        assert_eq!(config.retry.max_backoff_ms, 30_000);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let mut config = EngineConfig::new();
        config.import.max_files_per_copy = 250;
        config.save(temp.path()).unwrap();

        let loaded = EngineConfig::load(temp.path()).unwrap();
        assert_eq!(loaded.import.max_files_per_copy, 250);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let mut config = EngineConfig::new();
        config.retry.max_attempts = 0;
        config.retry.initial_backoff_ms = 10;
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.initial_backoff, Duration::from_millis(10));
    }

    #[test]
    fn test_overrides() {
        let values: std::collections::HashMap<&str, &str> = [
            (ENV_RETRY_MAX_ATTEMPTS, "3"),
            (ENV_RETRY_MULTIPLIER, "1.5"),
            (ENV_RETRY_MAX_BACKOFF_MS, "not-a-number"),
            (ENV_MAX_FILES_PER_COPY, "200"),
        ]
        .into_iter()
        .collect();
        let mut config = EngineConfig::new();
        config.apply_overrides(|name| values.get(name).map(|v| v.to_string()));

        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.multiplier, 1.5);
        assert_eq!(config.retry.max_backoff_ms, 30_000);
        assert_eq!(config.import.max_files_per_copy, 200);
        assert_eq!(config.retry_policy().multiplier, 1.5);
    }

    #[test]
    fn test_multiplier_below_one_is_ignored() {
        let mut config = EngineConfig::new();
        config.apply_overrides(|name| (name == ENV_RETRY_MULTIPLIER).then(|| "0.5".to_string()));
        assert_eq!(config.retry.multiplier, 2.0);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(matches!(
            EngineConfig::parse("[retry\nmax_attempts = "),
            Err(ConfigError::Parse(_))
        ));
    }
}
