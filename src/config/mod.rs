//! Configuration for wikidump

mod logging;
mod parser;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use parser::ParserOptions;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Dump parsing options
    #[serde(default)]
    pub parser: ParserOptions,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file '{}'", path.display()))?;
        Ok(())
    }

    /// Validate all configuration fields.
    ///
    /// All problems are reported together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.parser.chunk_size == 0 {
            errors.push("parser.chunk_size must be positive".to_string());
        }
        if self.parser.chunk_size > 64 * 1024 * 1024 {
            errors.push("parser.chunk_size must be <= 64 MiB".to_string());
        }
        if let Some(ref namespaces) = self.parser.namespaces {
            if namespaces.is_empty() {
                errors.push(
                    "parser.namespaces must not be empty (omit it to allow every namespace)"
                        .to_string(),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_reports_all_errors() {
        let mut cfg = Config::default();
        cfg.parser.chunk_size = 0;
        cfg.parser.namespaces = Some(vec![]);

        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("chunk_size must be positive"), "{}", err);
        assert!(err.contains("namespaces must not be empty"), "{}", err);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wikidump.toml");

        let mut cfg = Config::default();
        cfg.parser.min_paragraph_length = 40;
        cfg.logging.level = LogLevel::Debug;
        cfg.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.parser.min_paragraph_length, 40);
        assert_eq!(loaded.logging.level, LogLevel::Debug);
    }

    #[test]
    fn load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[parser]\nchunk_size = 0\n").unwrap();

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("chunk_size"), "{}", err);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.parser.skip_redirects);
    }
}
