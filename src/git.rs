//! Git context capture for discovery records.
//!
//! Capture is opportunistic: when the repository is not a git checkout (or
//! `git` is missing), the provider reports unavailability and the record is
//! written without a `context.git` block.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::models::GitInfo;

/// Provider of git branch/commit context at capture time.
///
/// A trait seam so the store can be tested without a git checkout (inject
/// nothing) and so alternative providers can be wired later.
pub trait GitContext: Send + Sync {
    /// Current `(branch, commit)` for the repository, or `None` when
    /// unavailable.
    fn capture(&self) -> Option<GitInfo>;
}

/// Git context via the `git` binary.
pub struct CommandGit {
    repo: PathBuf,
}

impl CommandGit {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    fn rev_parse(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .arg("rev-parse")
            .args(args)
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }
        let value = String::from_utf8(output.stdout).ok()?;
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

impl GitContext for CommandGit {
    fn capture(&self) -> Option<GitInfo> {
        let branch = self.rev_parse(&["--abbrev-ref", "HEAD"])?;
        let commit = self.rev_parse(&["--short", "HEAD"])?;
        Some(GitInfo { branch, commit })
    }
}

/// Walk up from `start` looking for a `.git` entry.
///
/// Returns `None` when no enclosing git repository exists; callers fall
/// back to the starting directory.
pub fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.canonicalize().ok()?;
    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}
