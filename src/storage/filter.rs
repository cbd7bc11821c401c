//! Listing filter: a pure predicate over discovery records.

use serde::{Deserialize, Serialize};

use crate::models::{Category, Discovery, Severity, Status};

/// Criteria for `list`. All unset fields match everything; set fields are
/// ANDed together. `limit` is not part of the predicate - it truncates the
/// sorted output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryFilter {
    /// Match only this status
    pub status: Option<Status>,

    /// Match only this category
    pub category: Option<Category>,

    /// Match only this severity
    pub severity: Option<Severity>,

    /// Match only records carrying this tag
    pub tag: Option<String>,

    /// Keep at most this many records after sorting
    pub limit: Option<usize>,
}

impl DiscoveryFilter {
    /// A filter that matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether `discovery` satisfies every set criterion.
    pub fn matches(&self, discovery: &Discovery) -> bool {
        if let Some(status) = self.status {
            if discovery.status != status {
                return false;
            }
        }
        if let Some(category) = self.category {
            if discovery.content.category != category {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if discovery.content.severity != severity {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !discovery.content.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        true
    }
}
