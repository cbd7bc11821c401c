//! Common test utilities for spyglass integration tests.
//!
//! Provides `TestEnv` for isolated test environments: each test gets a
//! fresh temp directory acting as the repository, targeted per-invocation
//! via `-C`, so tests are parallel-safe and never touch a real checkout.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with an isolated repository directory.
pub struct TestEnv {
    pub repo_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment.
    pub fn new() -> Self {
        Self {
            repo_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize the backlog.
    pub fn init() -> Self {
        let env = Self::new();
        env.sg().arg("init").assert().success();
        env
    }

    /// Get a Command for the sg binary targeting this environment's repo.
    pub fn sg(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_sg"));
        cmd.arg("-C").arg(self.repo_dir.path());
        // Keep output independent of the developer's own config file.
        cmd.env_remove("SG_REPO");
        cmd.env("XDG_CONFIG_HOME", self.repo_dir.path().join("xdg-config"));
        cmd
    }

    /// Path to the simulated repository.
    pub fn path(&self) -> &Path {
        self.repo_dir.path()
    }

    /// Path to the backlog directory.
    pub fn backlog_dir(&self) -> PathBuf {
        self.path().join(".spyglass").join("discoveries")
    }

    /// Capture a discovery via the CLI and return its ID (parsed from the
    /// JSON output).
    pub fn add(&self, title: &str, extra_args: &[&str]) -> String {
        let output = self
            .sg()
            .args(["add", title, "--by", "itest"])
            .args(extra_args)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "add failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        value["id"].as_str().unwrap().to_string()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
