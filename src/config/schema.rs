//! TOML schema for `config.toml`.
//!
//! All keys are optional; unset keys fall through to the next layer in the
//! precedence chain.
//!
//! ```toml
//! discovered_by = "ci-agent"
//! max_tags = 10
//! scan_workers = 8
//! default_limit = 50
//! output_format = "human"  # or "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One layer of configuration, as written in a `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpyglassConfig {
    /// Default `context.discovered_by` for new records
    pub discovered_by: Option<String>,

    /// Cap on tags per discovery
    pub max_tags: Option<usize>,

    /// Concurrency ceiling for list scans
    pub scan_workers: Option<usize>,

    /// Default `--limit` for list
    pub default_limit: Option<usize>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,
}

impl SpyglassConfig {
    /// Validate the layer's values.
    pub fn validate(&self) -> Result<()> {
        if let Some(0) = self.max_tags {
            return Err(Error::Config("max_tags must be at least 1".to_string()));
        }
        if let Some(0) = self.scan_workers {
            return Err(Error::Config("scan_workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Load a layer from a TOML file. A missing file is an empty layer;
    /// an unreadable or invalid file is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("invalid {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_layer() {
        let dir = TempDir::new().unwrap();
        let config = SpyglassConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, SpyglassConfig::default());
    }

    #[test]
    fn test_load_parses_all_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
discovered_by = "ci-agent"
max_tags = 5
scan_workers = 4
default_limit = 25
output_format = "human"
"#,
        )
        .unwrap();

        let config = SpyglassConfig::load(&path).unwrap();
        assert_eq!(config.discovered_by.as_deref(), Some("ci-agent"));
        assert_eq!(config.max_tags, Some(5));
        assert_eq!(config.scan_workers, Some(4));
        assert_eq!(config.default_limit, Some(25));
        assert_eq!(config.output_format, Some(OutputFormat::Human));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_tags = 0\n").unwrap();
        assert!(SpyglassConfig::load(&path).is_err());

        std::fs::write(&path, "this is not toml").unwrap();
        assert!(SpyglassConfig::load(&path).is_err());
    }
}
