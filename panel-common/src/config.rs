//! Bootstrap configuration loading
//!
//! Configuration is resolved in the following priority order:
//! 1. Explicit path passed by the caller (highest priority)
//! 2. `PANEL_IR_CONFIG` environment variable
//! 3. `<config_dir>/panel-ir/config.toml`
//! 4. Compiled defaults (fallback)
//!
//! A missing file is not an error: the loader warns and falls back to
//! compiled defaults. A file that exists but cannot be parsed is an error.
//!
//! The header schema (labels, cells) is deliberately absent here; it is a
//! compile-time contract, not configuration.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PANEL_IR_CONFIG";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Extraction tunables (optional)
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Tunables for the confidence-scored extractor and review flagging
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct ExtractionConfig {
    /// Minimum similarity ratio for an approximate label match (0.0-1.0)
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Mean document confidence below which manual review is required
    #[serde(default = "default_review_threshold")]
    pub review_confidence_threshold: f64,

    /// Manual review is required when more LOW/MISSING fields than this exist
    #[serde(default = "default_max_gap_fields")]
    pub max_gap_fields: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            review_confidence_threshold: default_review_threshold(),
            max_gap_fields: default_max_gap_fields(),
        }
    }
}

impl ExtractionConfig {
    /// Reject thresholds outside `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("fuzzy_threshold", self.fuzzy_threshold),
            ("review_confidence_threshold", self.review_confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "extraction.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fuzzy_threshold() -> f64 {
    0.7
}

fn default_review_threshold() -> f64 {
    0.7
}

fn default_max_gap_fields() -> usize {
    3
}

impl TomlConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.extraction.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}

/// Config file resolver following the documented priority order
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create resolver with an optional caller-supplied path
    pub fn new(cli_path: Option<&Path>) -> Self {
        Self {
            cli_path: cli_path.map(Path::to_path_buf),
        }
    }

    /// Candidate config path, if any source names one
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: caller argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: platform config directory
        dirs::config_dir().map(|d| d.join("panel-ir").join("config.toml"))
    }

    /// Load configuration, degrading to compiled defaults when no file exists
    pub fn load(&self) -> Result<TomlConfig> {
        match self.resolve_path() {
            Some(path) if path.exists() => {
                let config = TomlConfig::from_file(&path)?;
                info!(path = %path.display(), "Loaded configuration");
                Ok(config)
            }
            Some(path) => {
                warn!(
                    path = %path.display(),
                    "Config file not found, using compiled defaults"
                );
                Ok(TomlConfig::default())
            }
            None => {
                warn!("No config directory available, using compiled defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.extraction.fuzzy_threshold, 0.7);
        assert_eq!(config.extraction.max_gap_fields, 3);
    }

    #[test]
    fn test_partial_extraction_section() {
        let config = TomlConfig::from_toml_str("[extraction]\nfuzzy_threshold = 0.8\n").unwrap();
        assert_eq!(config.extraction.fuzzy_threshold, 0.8);
        assert_eq!(config.extraction.review_confidence_threshold, 0.7);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let err = TomlConfig::from_toml_str("[extraction]\nfuzzy_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("fuzzy_threshold"));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(TomlConfig::from_toml_str("[logging\nlevel = ").is_err());
    }

    #[test]
    fn test_cli_path_wins() {
        let resolver = ConfigResolver::new(Some(Path::new("/tmp/explicit.toml")));
        assert_eq!(resolver.resolve_path(), Some(PathBuf::from("/tmp/explicit.toml")));
    }
}
