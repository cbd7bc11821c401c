//! Precedence resolution for configuration values.
//!
//! Resolution order, highest to lowest: CLI flag > repo config
//! (`<repo>/.spyglass/config.toml`) > user config
//! (`~/.config/spyglass/config.toml`) > built-in default. Every resolved
//! value remembers which layer supplied it.

use std::path::Path;

use crate::models::validate::DEFAULT_MAX_TAGS;
use crate::storage::{DEFAULT_SCAN_WORKERS, StoreSettings, TOOL_DIR};
use crate::{Result, config::OutputFormat, config::SpyglassConfig};

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from a CLI flag
    CliFlag,
    /// Value from the repo-level config file
    Repo,
    /// Value from the user-level config file
    User,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Repo => write!(f, "repo"),
            ValueSource::User => write!(f, "user"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Call-level overrides, from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub discovered_by: Option<String>,
    pub max_tags: Option<usize>,
    pub scan_workers: Option<usize>,
    pub default_limit: Option<usize>,
    pub output_format: Option<OutputFormat>,
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Default author for new records; unset means the CLI requires `--by`
    pub discovered_by: Option<Resolved<String>>,
    /// Cap on tags per discovery
    pub max_tags: Resolved<usize>,
    /// Concurrency ceiling for list scans
    pub scan_workers: Resolved<usize>,
    /// Default list limit; unset means unlimited
    pub default_limit: Option<Resolved<usize>>,
    /// Output format preference
    pub output_format: Resolved<OutputFormat>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            discovered_by: None,
            max_tags: Resolved::new(DEFAULT_MAX_TAGS, ValueSource::Default),
            scan_workers: Resolved::new(DEFAULT_SCAN_WORKERS, ValueSource::Default),
            default_limit: None,
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    /// Store settings carrying the resolved tunables.
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            max_tags: self.max_tags.value,
            scan_workers: self.scan_workers.value,
        }
    }
}

/// Pick the highest-precedence value among the layers for one key.
fn pick<T: Clone>(
    flag: Option<&T>,
    repo: Option<&T>,
    user: Option<&T>,
) -> Option<Resolved<T>> {
    if let Some(v) = flag {
        return Some(Resolved::new(v.clone(), ValueSource::CliFlag));
    }
    if let Some(v) = repo {
        return Some(Resolved::new(v.clone(), ValueSource::Repo));
    }
    if let Some(v) = user {
        return Some(Resolved::new(v.clone(), ValueSource::User));
    }
    None
}

/// Path of the repo-level config file.
pub fn repo_config_path(repo_path: &Path) -> std::path::PathBuf {
    repo_path.join(TOOL_DIR).join("config.toml")
}

/// Path of the user-level config file, when a config directory exists.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("spyglass").join("config.toml"))
}

/// Resolve configuration for a repository, applying call-level overrides.
pub fn resolve_config(repo_path: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let repo = SpyglassConfig::load(&repo_config_path(repo_path))?;
    let user = match user_config_path() {
        Some(path) => SpyglassConfig::load(&path)?,
        None => SpyglassConfig::default(),
    };
    Ok(resolve_layers(overrides, &repo, &user))
}

/// Pure resolution over already-loaded layers; split out for tests.
fn resolve_layers(
    overrides: &ConfigOverrides,
    repo: &SpyglassConfig,
    user: &SpyglassConfig,
) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();
    ResolvedConfig {
        discovered_by: pick(
            overrides.discovered_by.as_ref(),
            repo.discovered_by.as_ref(),
            user.discovered_by.as_ref(),
        ),
        max_tags: pick(
            overrides.max_tags.as_ref(),
            repo.max_tags.as_ref(),
            user.max_tags.as_ref(),
        )
        .unwrap_or(defaults.max_tags),
        scan_workers: pick(
            overrides.scan_workers.as_ref(),
            repo.scan_workers.as_ref(),
            user.scan_workers.as_ref(),
        )
        .unwrap_or(defaults.scan_workers),
        default_limit: pick(
            overrides.default_limit.as_ref(),
            repo.default_limit.as_ref(),
            user.default_limit.as_ref(),
        ),
        output_format: pick(
            overrides.output_format.as_ref(),
            repo.output_format.as_ref(),
            user.output_format.as_ref(),
        )
        .unwrap_or(defaults.output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_all_layers_empty() {
        let resolved = resolve_layers(
            &ConfigOverrides::default(),
            &SpyglassConfig::default(),
            &SpyglassConfig::default(),
        );
        assert_eq!(resolved.max_tags.value, DEFAULT_MAX_TAGS);
        assert_eq!(resolved.max_tags.source, ValueSource::Default);
        assert_eq!(resolved.scan_workers.value, DEFAULT_SCAN_WORKERS);
        assert!(resolved.discovered_by.is_none());
        assert!(resolved.default_limit.is_none());
    }

    #[test]
    fn test_repo_beats_user() {
        let repo = SpyglassConfig {
            max_tags: Some(5),
            ..Default::default()
        };
        let user = SpyglassConfig {
            max_tags: Some(20),
            discovered_by: Some("me".to_string()),
            ..Default::default()
        };
        let resolved = resolve_layers(&ConfigOverrides::default(), &repo, &user);
        assert_eq!(resolved.max_tags.value, 5);
        assert_eq!(resolved.max_tags.source, ValueSource::Repo);
        // Unset in repo: falls through to user.
        assert_eq!(
            resolved.discovered_by.as_ref().unwrap().value.as_str(),
            "me"
        );
        assert_eq!(
            resolved.discovered_by.as_ref().unwrap().source,
            ValueSource::User
        );
    }

    #[test]
    fn test_flag_beats_everything() {
        let overrides = ConfigOverrides {
            scan_workers: Some(2),
            ..Default::default()
        };
        let repo = SpyglassConfig {
            scan_workers: Some(16),
            ..Default::default()
        };
        let resolved = resolve_layers(&overrides, &repo, &SpyglassConfig::default());
        assert_eq!(resolved.scan_workers.value, 2);
        assert_eq!(resolved.scan_workers.source, ValueSource::CliFlag);
    }
}
