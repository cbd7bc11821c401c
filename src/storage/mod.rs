//! Storage layer for Spyglass discoveries.
//!
//! One JSON file per discovery in `<repo>/.spyglass/discoveries/`, so that
//! many contributors (humans or agents, in the same process or not) can add
//! records concurrently with zero merge conflicts. Create-once safety rests
//! on the filesystem's exclusive-create guarantee; update and transition
//! operations on an existing record are last-writer-wins, which is fine for
//! the single-operator-per-record usage pattern.
//!
//! Records in the legacy ID format (`sg-` prefix, no backing GUID) are
//! migrated to the current format transparently on first load.

pub mod backend;
pub mod filter;
pub mod scan;

pub use backend::{FileBackend, MAX_RECORD_BYTES, MARKER_FILE, StoreBackend};
pub use filter::DiscoveryFilter;
pub use scan::{DEFAULT_SCAN_WORKERS, ListOutcome};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::git::{CommandGit, GitContext};
use crate::models::validate::DEFAULT_MAX_TAGS;
use crate::models::{Discovery, SCHEMA_VERSION, Status};
use crate::triage::{AnalysisProvider, TaskSuggestion, suggest_task_config, task_id_for};
use crate::{Error, Result, id};

/// Name of the in-repo tool-state directory.
pub const TOOL_DIR: &str = ".spyglass";

/// Subdirectory of [`TOOL_DIR`] holding one file per discovery.
pub const BACKLOG_SUBDIR: &str = "discoveries";

/// Extension for record files.
pub const RECORD_EXT: &str = ".json";

/// The backlog directory for a repository.
pub fn backlog_dir(repo_path: &Path) -> PathBuf {
    repo_path.join(TOOL_DIR).join(BACKLOG_SUBDIR)
}

/// Filename for a discovery ID.
pub fn file_name(record_id: &str) -> String {
    format!("{}{}", record_id, RECORD_EXT)
}

/// Extract the discovery ID from a filename, if the name belongs to a
/// recognized ID family and carries the record extension.
pub fn id_from_file_name(name: &str) -> Option<&str> {
    let record_id = name.strip_suffix(RECORD_EXT)?;
    id::classify(record_id).map(|_| record_id)
}

/// Tunables for a store instance, resolved from configuration.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Cap on tags per discovery
    pub max_tags: usize,
    /// Concurrency ceiling for `list` scans
    pub scan_workers: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_tags: DEFAULT_MAX_TAGS,
            scan_workers: DEFAULT_SCAN_WORKERS,
        }
    }
}

/// Manager for a repository's discovery backlog.
pub struct DiscoveryStore {
    backend: Arc<dyn StoreBackend>,
    git: Option<Box<dyn GitContext>>,
    settings: StoreSettings,
}

impl DiscoveryStore {
    /// Open the store for a repository with default settings and git
    /// context capture wired up.
    pub fn open(repo_path: &Path) -> Self {
        Self::open_with_settings(repo_path, StoreSettings::default())
    }

    /// Open the store for a repository with explicit settings.
    pub fn open_with_settings(repo_path: &Path, settings: StoreSettings) -> Self {
        Self {
            backend: Arc::new(FileBackend::new(backlog_dir(repo_path))),
            git: Some(Box::new(CommandGit::new(repo_path))),
            settings,
        }
    }

    /// Open the store without a git-context provider. Used by tests and
    /// callers that manage context themselves.
    pub fn open_bare(repo_path: &Path) -> Self {
        Self {
            backend: Arc::new(FileBackend::new(backlog_dir(repo_path))),
            git: None,
            settings: StoreSettings::default(),
        }
    }

    /// Build a store over an arbitrary backend (DI seam).
    pub fn with_backend(
        backend: Arc<dyn StoreBackend>,
        git: Option<Box<dyn GitContext>>,
        settings: StoreSettings,
    ) -> Self {
        Self {
            backend,
            git,
            settings,
        }
    }

    /// Where records live, for display.
    pub fn location(&self) -> String {
        self.backend.location()
    }

    /// Idempotently create the backlog directory and its marker file.
    pub fn ensure_dir(&self) -> Result<()> {
        self.backend.ensure_dir()
    }

    /// Whether the backlog directory exists.
    pub fn initialized(&self) -> bool {
        self.backend.initialized()
    }

    /// Persist a new discovery.
    ///
    /// Fills identifiers and defaults before validating: a fresh GUID+ID
    /// pair when the ID is empty, a fresh GUID when a current-format ID
    /// arrived without one, schema version, capture timestamp, and
    /// opportunistic git context. Validation runs before any write; the
    /// write itself is exclusive-create, so two concurrent adds racing on
    /// the same ID resolve to one success and one [`Error::DuplicateId`].
    pub fn add(&self, mut record: Discovery) -> Result<Discovery> {
        if !self.initialized() {
            return Err(Error::NotInitialized);
        }

        if record.id.is_empty() {
            let (guid, short_id) = id::generate_id()?;
            record.guid = Some(guid);
            record.id = short_id;
        } else if record.guid.is_none() && id::classify(&record.id) == Some(id::IdKind::Current) {
            record.guid = Some(id::generate_guid());
        }

        if record.schema_version.is_empty() {
            record.schema_version = SCHEMA_VERSION.to_string();
        }
        if record.context.discovered_at.timestamp() == 0 {
            record.context.discovered_at = Utc::now();
        }
        if record.context.git.is_none() {
            // Best-effort: not being in a git checkout is not an error.
            record.context.git = self.git.as_ref().and_then(|g| g.capture());
        }

        record.validate(self.settings.max_tags)?;

        let bytes = serde_json::to_vec_pretty(&record)?;
        self.backend.create_new(&file_name(&record.id), &bytes)?;
        Ok(record)
    }

    /// Load a discovery by ID.
    ///
    /// A legacy-format record without a GUID is migrated to the current
    /// format as a side effect: rewritten under a freshly derived ID with
    /// exclusive-create protection, old file removed afterwards. Migration
    /// failure is never surfaced; the caller gets the original record.
    pub fn get(&self, record_id: &str) -> Result<Discovery> {
        let kind = id::validate(record_id)?;
        let name = file_name(record_id);
        if !self.backend.exists(&name) {
            return Err(Error::NotFound(record_id.to_string()));
        }
        let record = scan::load_record(self.backend.as_ref(), &name)?;

        if kind == id::IdKind::Legacy && record.guid.is_none() {
            return Ok(self.migrate_or_keep(record));
        }
        Ok(record)
    }

    /// List discoveries matching `filter`, sorted by capture time
    /// descending. Per-file failures are downgraded to warnings in the
    /// outcome rather than failing the listing.
    pub async fn list(&self, filter: &DiscoveryFilter) -> Result<ListOutcome> {
        self.list_with_cancel(filter, CancellationToken::new()).await
    }

    /// [`DiscoveryStore::list`] with an externally controlled cancellation
    /// signal. On cancellation the scan drains its workers and returns
    /// [`Error::Cancelled`] without partial data.
    pub async fn list_with_cancel(
        &self,
        filter: &DiscoveryFilter,
        cancel: CancellationToken,
    ) -> Result<ListOutcome> {
        let mut files = self.backend.list_files()?;
        files.retain(|name| id_from_file_name(name).is_some());
        scan::scan(
            Arc::clone(&self.backend),
            files,
            filter.clone(),
            self.settings.scan_workers,
            cancel,
        )
        .await
    }

    /// Re-validate and rewrite an existing discovery.
    pub fn update(&self, record: &Discovery) -> Result<()> {
        record.validate(self.settings.max_tags)?;
        let bytes = serde_json::to_vec_pretty(record)?;
        self.backend.overwrite(&file_name(&record.id), &bytes)
    }

    /// Promote a pending discovery to a task.
    pub fn promote(&self, record_id: &str, task_id: &str) -> Result<Discovery> {
        if task_id.trim().is_empty() {
            return Err(Error::EmptyValue("task ID must not be empty".to_string()));
        }
        self.transition(record_id, Status::Promoted, |record| {
            record.lifecycle.promoted_to_task = Some(task_id.to_string());
        })
    }

    /// Promote with a generated task configuration: ask the analysis
    /// provider (or the deterministic fallback) for a suggestion, derive
    /// the task ID from it, and promote.
    pub fn promote_generated(
        &self,
        record_id: &str,
        provider: Option<&dyn AnalysisProvider>,
    ) -> Result<(Discovery, TaskSuggestion)> {
        let record = self.get(record_id)?;
        let suggestion = suggest_task_config(&record, provider);
        let task_id = task_id_for(&record, &suggestion);
        let promoted = self.promote(&record.id, &task_id)?;
        Ok((promoted, suggestion))
    }

    /// Dismiss a pending discovery with a reason.
    pub fn dismiss(&self, record_id: &str, reason: &str) -> Result<Discovery> {
        if reason.trim().is_empty() {
            return Err(Error::EmptyValue(
                "dismissal reason must not be empty".to_string(),
            ));
        }
        self.transition(record_id, Status::Dismissed, |record| {
            record.lifecycle.dismissed_reason = Some(reason.to_string());
        })
    }

    /// Complete a promoted discovery.
    pub fn complete(&self, record_id: &str) -> Result<Discovery> {
        self.transition(record_id, Status::Completed, |record| {
            record.lifecycle.completed_at = Some(Utc::now());
        })
    }

    /// Promote a pending discovery as part of starting work on a task.
    ///
    /// Idempotent: re-invoking with the same task ID on an already-promoted
    /// record succeeds without mutation, so an interrupted external
    /// orchestration can resume safely.
    pub fn start_task(&self, record_id: &str, task_id: &str) -> Result<Discovery> {
        if task_id.trim().is_empty() {
            return Err(Error::EmptyValue("task ID must not be empty".to_string()));
        }
        let record = self.get(record_id)?;
        if record.status == Status::Promoted
            && record.lifecycle.promoted_to_task.as_deref() == Some(task_id)
        {
            return Ok(record);
        }
        self.promote(&record.id, task_id)
    }

    /// Remove a discovery's file.
    pub fn delete(&self, record_id: &str) -> Result<()> {
        id::validate(record_id)?;
        self.backend.delete(&file_name(record_id)).map_err(|e| {
            match e {
                Error::NotFound(_) => Error::NotFound(record_id.to_string()),
                other => other,
            }
        })
    }

    /// Load, assert the state machine, mutate, write back.
    fn transition(
        &self,
        record_id: &str,
        to: Status,
        mutate: impl FnOnce(&mut Discovery),
    ) -> Result<Discovery> {
        let mut record = self.get(record_id)?;
        if !record.status.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                id: record.id,
                from: record.status,
                to,
            });
        }
        mutate(&mut record);
        record.status = to;
        self.update(&record)?;
        Ok(record)
    }

    /// Attempt legacy migration; on any failure, keep the original record
    /// and move on. A derived-ID collision aborts the migration entirely,
    /// leaving the legacy file in place.
    fn migrate_or_keep(&self, original: Discovery) -> Discovery {
        match self.migrate(original.clone()) {
            Ok(migrated) => migrated,
            Err(e) => {
                tracing::debug!(id = %original.id, "legacy migration skipped: {}", e);
                original
            }
        }
    }

    fn migrate(&self, mut record: Discovery) -> Result<Discovery> {
        let old_name = file_name(&record.id);
        let guid = id::generate_guid();
        let new_id = id::derive_short_id(&guid)?;
        record.guid = Some(guid);
        record.id = new_id.clone();

        // Same gate as every other mutation path: a record that no longer
        // passes validation keeps its legacy identity untouched.
        record.validate(self.settings.max_tags)?;

        let bytes = serde_json::to_vec_pretty(&record)?;
        match self.backend.create_new(&file_name(&new_id), &bytes) {
            Ok(()) => {}
            Err(Error::DuplicateId(_)) => return Err(Error::MigrationCollision(new_id)),
            Err(e) => return Err(e),
        }

        // The new file is durable and authoritative; failing to clean up the
        // old one demotes to a debug note, not a failed migration.
        if let Err(e) = self.backend.delete(&old_name) {
            tracing::debug!(old = %old_name, new = %new_id, "stale legacy record left behind: {}", e);
        }
        Ok(record)
    }
}
