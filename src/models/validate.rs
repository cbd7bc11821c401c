//! Field and aggregate validation for discovery records.
//!
//! Every mutation path in the store calls [`Discovery::validate`] before
//! persisting. The aggregate runs the field validators in a fixed order and
//! stops at the first failure, then checks lifecycle-vs-status coherence and
//! context completeness.

use uuid::Uuid;

use super::{Discovery, Location, Status};
use crate::{Error, Result, id};

/// Maximum title length, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum length of a single tag, in characters.
pub const MAX_TAG_LEN: usize = 32;

/// Default cap on the number of tags per discovery (configurable).
pub const DEFAULT_MAX_TAGS: usize = 10;

/// Validate a discovery ID (either recognized family).
pub fn validate_record_id(record_id: &str) -> Result<()> {
    id::validate(record_id).map(|_| ())
}

/// Validate a GUID string (format only; derivation agreement is a
/// construction-time property, not re-checked here).
pub fn validate_guid(guid: &str) -> Result<()> {
    Uuid::parse_str(guid)
        .map(|_| ())
        .map_err(|e| Error::InvalidId(format!("malformed GUID '{}': {}", guid, e)))
}

/// Validate a title: non-empty, bounded length.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::EmptyValue("title must not be empty".to_string()));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(Error::OutOfRange(format!(
            "title must be at most {} characters, got {}",
            MAX_TITLE_LEN, len
        )));
    }
    Ok(())
}

/// Validate a single tag: non-empty, bounded, `[a-z0-9][a-z0-9_-]*`.
pub fn validate_tag(tag: &str) -> Result<()> {
    let mut chars = tag.chars();
    let first = chars.next().ok_or_else(|| {
        Error::EmptyValue("tag must not be empty".to_string())
    })?;
    if tag.chars().count() > MAX_TAG_LEN {
        return Err(Error::OutOfRange(format!(
            "tag '{}' exceeds {} characters",
            tag, MAX_TAG_LEN
        )));
    }
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!(
            "tag '{}' must start with a lowercase letter or digit",
            tag
        )));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-') {
        return Err(Error::InvalidInput(format!(
            "tag '{}' may only contain lowercase letters, digits, '_' and '-'",
            tag
        )));
    }
    Ok(())
}

/// Validate a tag set against the configured cap.
pub fn validate_tags(tags: &[String], max_tags: usize) -> Result<()> {
    if tags.len() > max_tags {
        return Err(Error::OutOfRange(format!(
            "at most {} tags allowed, got {}",
            max_tags,
            tags.len()
        )));
    }
    for tag in tags {
        validate_tag(tag)?;
    }
    Ok(())
}

/// Validate a location block: a line number requires a file.
pub fn validate_location(location: &Location) -> Result<()> {
    if location.line > 0 && location.file.trim().is_empty() {
        return Err(Error::InvalidInput(
            "location.line set without location.file".to_string(),
        ));
    }
    Ok(())
}

impl Discovery {
    /// Validate every field plus aggregate coherence, fail-fast.
    ///
    /// `max_tags` comes from resolved configuration; the store passes it
    /// through on every mutation.
    pub fn validate(&self, max_tags: usize) -> Result<()> {
        validate_record_id(&self.id)?;
        validate_title(&self.title)?;
        validate_tags(&self.content.tags, max_tags)?;
        if let Some(location) = &self.location {
            validate_location(location)?;
        }
        if let Some(guid) = &self.guid {
            validate_guid(guid)?;
        }
        self.validate_lifecycle()?;
        self.validate_context()
    }

    /// Lifecycle fields must match the record's status.
    fn validate_lifecycle(&self) -> Result<()> {
        let lifecycle = &self.lifecycle;
        match self.status {
            Status::Pending => Ok(()),
            Status::Promoted => {
                if lifecycle
                    .promoted_to_task
                    .as_deref()
                    .is_none_or(|t| t.trim().is_empty())
                {
                    return Err(Error::EmptyValue(
                        "promoted discovery requires lifecycle.promoted_to_task".to_string(),
                    ));
                }
                Ok(())
            }
            Status::Dismissed => {
                if lifecycle
                    .dismissed_reason
                    .as_deref()
                    .is_none_or(|r| r.trim().is_empty())
                {
                    return Err(Error::EmptyValue(
                        "dismissed discovery requires lifecycle.dismissed_reason".to_string(),
                    ));
                }
                Ok(())
            }
            Status::Completed => {
                if lifecycle
                    .promoted_to_task
                    .as_deref()
                    .is_none_or(|t| t.trim().is_empty())
                {
                    return Err(Error::EmptyValue(
                        "completed discovery requires lifecycle.promoted_to_task".to_string(),
                    ));
                }
                match lifecycle.completed_at {
                    Some(at) if at.timestamp() != 0 => Ok(()),
                    _ => Err(Error::EmptyValue(
                        "completed discovery requires lifecycle.completed_at".to_string(),
                    )),
                }
            }
        }
    }

    /// Context must identify who captured the discovery, and when.
    fn validate_context(&self) -> Result<()> {
        if self.context.discovered_by.trim().is_empty() {
            return Err(Error::EmptyValue(
                "context.discovered_by must not be empty".to_string(),
            ));
        }
        if self.context.discovered_at.timestamp() == 0 {
            return Err(Error::EmptyValue(
                "context.discovered_at must be set".to_string(),
            ));
        }
        Ok(())
    }
}
