//! Configuration for Spyglass.
//!
//! One flat TOML schema, read from two locations:
//!
//! - Repo: `<repo>/.spyglass/config.toml` (shared with the team)
//! - User: `~/.config/spyglass/config.toml` (personal defaults)
//!
//! ## Precedence
//!
//! CLI flag > repo config > user config > built-in default. Use the
//! [`resolver`] module for unified resolution with per-value source
//! tracking (`sg config show` displays where each value came from).

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, Resolved, ResolvedConfig, ValueSource, repo_config_path, resolve_config,
    user_config_path,
};
pub use schema::{OutputFormat, SpyglassConfig};
