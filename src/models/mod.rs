//! Data models for Spyglass entities.
//!
//! This module defines the core data structure, `Discovery` - an issue
//! captured during development that cannot be addressed immediately - along
//! with its nested blocks (content, location, context, lifecycle) and the
//! status state machine.

pub mod validate;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Schema tag written into every record for forward compatibility.
pub const SCHEMA_VERSION: &str = "1.0";

/// Discovery status in the triage workflow.
///
/// Allowed transitions: pending -> promoted, pending -> dismissed,
/// promoted -> completed. `dismissed` and `completed` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Promoted,
    Dismissed,
    Completed,
}

impl Status {
    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Pending, Status::Promoted)
                | (Status::Pending, Status::Dismissed)
                | (Status::Promoted, Status::Completed)
        )
    }

    /// String representation, matching the wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Promoted => "promoted",
            Status::Dismissed => "dismissed",
            Status::Completed => "completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "promoted" => Ok(Status::Promoted),
            "dismissed" => Ok(Status::Dismissed),
            "completed" => Ok(Status::Completed),
            _ => Err(Error::InvalidInput(format!("invalid status: {}", s))),
        }
    }
}

/// What kind of issue a discovery describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Bug,
    Security,
    Performance,
    Maintainability,
    Testing,
    Documentation,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bug => "bug",
            Category::Security => "security",
            Category::Performance => "performance",
            Category::Maintainability => "maintainability",
            Category::Testing => "testing",
            Category::Documentation => "documentation",
        }
    }

    /// All categories, for CLI help and exhaustive tests.
    pub fn all() -> [Category; 6] {
        [
            Category::Bug,
            Category::Security,
            Category::Performance,
            Category::Maintainability,
            Category::Testing,
            Category::Documentation,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bug" => Ok(Category::Bug),
            "security" => Ok(Category::Security),
            "performance" | "perf" => Ok(Category::Performance),
            "maintainability" | "maint" => Ok(Category::Maintainability),
            "testing" | "test" => Ok(Category::Testing),
            "documentation" | "docs" => Ok(Category::Documentation),
            _ => Err(Error::InvalidInput(format!("invalid category: {}", s))),
        }
    }
}

/// How urgent a discovery is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// All severities, for CLI help and exhaustive tests.
    pub fn all() -> [Severity; 4] {
        [
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ]
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" | "med" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" | "crit" => Ok(Severity::Critical),
            _ => Err(Error::InvalidInput(format!("invalid severity: {}", s))),
        }
    }
}

/// What the discovery is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Detailed description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Issue category
    #[serde(default)]
    pub category: Category,

    /// Issue severity
    #[serde(default)]
    pub severity: Severity,

    /// Tags for filtering (lowercase, bounded count and length)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Where in the codebase the discovery was made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Source file path, relative to the repository root
    #[serde(default)]
    pub file: String,

    /// 1-based line number; 0 means "whole file"
    #[serde(default)]
    pub line: u32,
}

/// Git state at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
    /// Branch name at capture time
    pub branch: String,

    /// Short commit hash at capture time
    pub commit: String,
}

/// Who captured the discovery, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Capture timestamp (UTC). The epoch means "unset"; `add` fills it.
    #[serde(default = "epoch")]
    pub discovered_at: DateTime<Utc>,

    /// Task the contributor was working on when the issue surfaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovered_during_task: Option<String>,

    /// Who captured it (agent name, username, ...)
    #[serde(default)]
    pub discovered_by: String,

    /// Git branch/commit at capture time, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitInfo>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            discovered_at: epoch(),
            discovered_during_task: None,
            discovered_by: String::new(),
            git: None,
        }
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Triage outcome fields. Each is written only once set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    /// Task the discovery was promoted to (required once promoted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted_to_task: Option<String>,

    /// Why the discovery was dismissed (required once dismissed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissed_reason: Option<String>,

    /// When work on the promoted task finished (required once completed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Lifecycle {
    /// True when no outcome has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.promoted_to_task.is_none()
            && self.dismissed_reason.is_none()
            && self.completed_at.is_none()
    }
}

/// An issue captured during development, awaiting disposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    /// Schema tag for forward compatibility
    #[serde(default)]
    pub schema_version: String,

    /// Short identifier, embedded in the record's filename
    pub id: String,

    /// Canonical random identifier backing a current-format ID.
    /// Absent on unmigrated legacy records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,

    /// One-line summary
    pub title: String,

    /// Current triage status
    #[serde(default)]
    pub status: Status,

    /// What the discovery is about
    #[serde(default)]
    pub content: Content,

    /// Where in the codebase it was made, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Capture context
    #[serde(default)]
    pub context: Context,

    /// Triage outcome
    #[serde(default, skip_serializing_if = "Lifecycle::is_empty")]
    pub lifecycle: Lifecycle,
}

impl Discovery {
    /// Create a new pending discovery with the given title.
    ///
    /// ID, GUID, timestamps, and git context are left unset; the store's
    /// `add` fills them in.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            schema_version: String::new(),
            id: String::new(),
            guid: None,
            title: title.into(),
            status: Status::Pending,
            content: Content::default(),
            location: None,
            context: Context::default(),
            lifecycle: Lifecycle::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_state_machine_edges() {
        assert!(Status::Pending.can_transition_to(Status::Promoted));
        assert!(Status::Pending.can_transition_to(Status::Dismissed));
        assert!(Status::Promoted.can_transition_to(Status::Completed));

        assert!(!Status::Pending.can_transition_to(Status::Completed));
        assert!(!Status::Pending.can_transition_to(Status::Pending));
        assert!(!Status::Promoted.can_transition_to(Status::Dismissed));
        assert!(!Status::Promoted.can_transition_to(Status::Pending));
        assert!(!Status::Dismissed.can_transition_to(Status::Promoted));
        assert!(!Status::Dismissed.can_transition_to(Status::Completed));
        assert!(!Status::Completed.can_transition_to(Status::Promoted));
        assert!(!Status::Completed.can_transition_to(Status::Pending));
    }

    #[test]
    fn test_enum_round_trip_via_str() {
        for category in Category::all() {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        for severity in Severity::all() {
            assert_eq!(severity.as_str().parse::<Severity>().unwrap(), severity);
        }
        assert_eq!("promoted".parse::<Status>().unwrap(), Status::Promoted);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_serialization_omits_unset_lifecycle_and_git() {
        let mut discovery = Discovery::new("Leaky connection pool");
        discovery.id = "sgd-ABCDEF".to_string();
        discovery.schema_version = SCHEMA_VERSION.to_string();

        let json = serde_json::to_string(&discovery).unwrap();
        assert!(!json.contains("lifecycle"));
        assert!(!json.contains("git"));
        assert!(!json.contains("guid"));
        assert!(!json.contains("location"));
        assert!(json.contains("\"status\":\"pending\""));
    }

    #[test]
    fn test_deserialization_fills_defaults() {
        let json = r#"{"id":"sg-a1b2c3","title":"Old record"}"#;
        let discovery: Discovery = serde_json::from_str(json).unwrap();
        assert_eq!(discovery.status, Status::Pending);
        assert_eq!(discovery.context.discovered_at.timestamp(), 0);
        assert!(discovery.guid.is_none());
        assert!(discovery.lifecycle.is_empty());
    }
}
