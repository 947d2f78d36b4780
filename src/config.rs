/*!
 * Configuration types for siteport
 */

use crate::error::{MigrationError, Result};
use crate::pipeline::PipelineProfile;
use serde::{Deserialize, Serialize};
use siteport_core_manifest::ContentType;
use std::path::{Path, PathBuf};

/// Main configuration for a migration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Items per batch handed to the filter chain
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Items of one batch migrated concurrently
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,

    /// Page size for bulk reference cache loads
    #[serde(default = "default_cache_page_size")]
    pub cache_page_size: usize,

    /// Which action sequence to build
    #[serde(default)]
    pub profile: PipelineProfile,

    /// Content types the run leaves untouched
    #[serde(default)]
    pub skip_content_types: Vec<ContentType>,

    /// Where the manifest is written after the run
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,

    /// Manifest of an earlier run to resume from
    #[serde(default)]
    pub previous_manifest_path: Option<PathBuf>,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Path to log file (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for debug level)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_concurrency: default_batch_concurrency(),
            cache_page_size: default_cache_page_size(),
            profile: PipelineProfile::default(),
            skip_content_types: Vec::new(),
            manifest_path: None,
            previous_manifest_path: None,
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_batch_size() -> usize {
    100
}

fn default_batch_concurrency() -> usize {
    8
}

fn default_cache_page_size() -> usize {
    100
}

impl MigrationConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: MigrationConfig = toml::from_str(&contents)
            .map_err(|e| MigrationError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| MigrationError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject settings the run cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(MigrationError::Config("batch_size must be at least 1".to_string()));
        }
        if self.batch_concurrency == 0 {
            return Err(MigrationError::Config(
                "batch_concurrency must be at least 1".to_string(),
            ));
        }
        if self.cache_page_size == 0 {
            return Err(MigrationError::Config(
                "cache_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether the configuration leaves a content type in the run
    pub fn includes(&self, content_type: &ContentType) -> bool {
        !self.skip_content_types.contains(content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = MigrationConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.batch_concurrency, 8);
        assert_eq!(config.cache_page_size, 100);
        assert_eq!(config.profile, PipelineProfile::ServerToCloud);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: MigrationConfig = toml::from_str(
            r#"
            batch_size = 25
            profile = "identity-only"
            skip_content_types = ["group"]
            "#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.batch_concurrency, 8);
        assert_eq!(config.profile, PipelineProfile::IdentityOnly);
        assert!(!config.includes(&ContentType::new("group")));
        assert!(config.includes(&ContentType::new("user")));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("siteport.toml");
        let config = MigrationConfig {
            batch_size: 10,
            log_level: LogLevel::Debug,
            manifest_path: Some(dir.path().join("manifest.json")),
            ..Default::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(MigrationConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "batch_size = 0\n").unwrap();
        let err = MigrationConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, MigrationError::Config(_)));
    }
}
