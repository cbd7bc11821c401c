//! Task-configuration suggestion for the promotion workflow.
//!
//! An [`AnalysisProvider`] (typically AI-assisted, wired in by the caller)
//! proposes how a discovery should become a task. The engine consumes the
//! suggestion opaquely and never depends on a provider being present: when
//! none is wired, or the provider fails, a deterministic category/severity
//! mapping stands in.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::models::{Category, Discovery, Severity};

/// A proposed task configuration for a promoted discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSuggestion {
    /// Task template name (e.g. "bugfix", "refactor")
    pub template: String,

    /// Task description seeded from the discovery
    pub description: String,

    /// Workspace the task should land in, when the provider has an opinion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    /// Task priority (0 = highest, 3 = lowest)
    pub priority: u8,

    /// Whether the resulting task should get an explicit verification step
    pub verify: bool,
}

/// Provider of task-configuration suggestions.
///
/// Implementations may call out to a model; failures are non-fatal and fall
/// back to [`fallback_suggestion`].
pub trait AnalysisProvider: Send + Sync {
    fn suggest(&self, discovery: &Discovery) -> Result<TaskSuggestion>;
}

/// The deterministic category/severity mapping used when no provider is
/// available (or one fails).
pub fn fallback_suggestion(discovery: &Discovery) -> TaskSuggestion {
    let template = match discovery.content.category {
        Category::Bug | Category::Security => "bugfix",
        Category::Performance => "performance",
        Category::Maintainability => "refactor",
        Category::Testing => "testing",
        Category::Documentation => "docs",
    };
    let priority = match discovery.content.severity {
        Severity::Critical => 0,
        Severity::High => 1,
        Severity::Medium => 2,
        Severity::Low => 3,
    };
    let verify = matches!(discovery.content.category, Category::Security)
        || matches!(discovery.content.severity, Severity::Critical);

    let description = match &discovery.content.description {
        Some(details) => format!("{}\n\n{}", discovery.title, details),
        None => discovery.title.clone(),
    };

    TaskSuggestion {
        template: template.to_string(),
        description,
        workspace: None,
        priority,
        verify,
    }
}

/// Ask the provider for a suggestion, falling back to the deterministic
/// mapping when there is no provider or it errors.
pub fn suggest_task_config(
    discovery: &Discovery,
    provider: Option<&dyn AnalysisProvider>,
) -> TaskSuggestion {
    if let Some(provider) = provider {
        match provider.suggest(discovery) {
            Ok(suggestion) => return suggestion,
            Err(e) => {
                tracing::debug!(id = %discovery.id, "analysis provider failed, using fallback: {}", e);
            }
        }
    }
    fallback_suggestion(discovery)
}

/// Derive a stable task ID from a discovery and its suggestion:
/// `<template>-<short-id-suffix, lowercased>`.
pub fn task_id_for(discovery: &Discovery, suggestion: &TaskSuggestion) -> String {
    let suffix = discovery
        .id
        .rsplit('-')
        .next()
        .unwrap_or(&discovery.id)
        .to_lowercase();
    format!("{}-{}", suggestion.template, suffix)
}
