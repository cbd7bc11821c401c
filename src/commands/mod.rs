//! Command implementations for the Spyglass CLI.
//!
//! Each subcommand resolves configuration, opens the store, performs its
//! operation, and prints through [`CommandResult`] - JSON by default,
//! human-readable with `-H`.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::cli::{Commands, ConfigCommands};
use crate::config::{ConfigOverrides, ResolvedConfig, resolve_config};
use crate::models::{Category, Discovery, Location, Severity, Status};
use crate::storage::{DiscoveryFilter, DiscoveryStore, ListOutcome};
use crate::Result;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn emit(result: &dyn CommandResult, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Dispatch a parsed CLI command. `overrides` carries the global flags that
/// participate in configuration resolution, so their values surface with a
/// `cli` source in `config show`.
pub fn run(
    command: Commands,
    repo_path: &Path,
    overrides: &ConfigOverrides,
    human: bool,
) -> Result<()> {
    match command {
        Commands::Init => init(repo_path, overrides, human),
        Commands::Add {
            title,
            description,
            category,
            severity,
            tags,
            file,
            line,
            during_task,
            discovered_by,
        } => add(
            repo_path,
            overrides,
            human,
            AddArgs {
                title,
                description,
                category,
                severity,
                tags,
                file,
                line,
                during_task,
                discovered_by,
            },
        ),
        Commands::List {
            status,
            category,
            severity,
            tag,
            limit,
        } => list(repo_path, overrides, human, status, category, severity, tag, limit),
        Commands::Show { id } => show(repo_path, overrides, human, &id),
        Commands::Promote { id, task } => promote(repo_path, overrides, human, &id, task),
        Commands::Start { id, task } => start(repo_path, overrides, human, &id, &task),
        Commands::Dismiss { id, reason } => dismiss(repo_path, overrides, human, &id, &reason),
        Commands::Complete { id } => complete(repo_path, overrides, human, &id),
        Commands::Rm { id } => rm(repo_path, overrides, human, &id),
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_show(repo_path, overrides, human),
        },
    }
}

fn open_store(
    repo_path: &Path,
    overrides: &ConfigOverrides,
) -> Result<(DiscoveryStore, ResolvedConfig)> {
    let config = resolve_config(repo_path, overrides)?;
    let store = DiscoveryStore::open_with_settings(repo_path, config.store_settings());
    Ok((store, config))
}

// === init ===

struct InitResult {
    location: String,
    created: bool,
}

impl CommandResult for InitResult {
    fn to_json(&self) -> String {
        json!({"location": self.location, "created": self.created}).to_string()
    }

    fn to_human(&self) -> String {
        if self.created {
            format!("Initialized discovery backlog at {}", self.location)
        } else {
            format!("Discovery backlog already present at {}", self.location)
        }
    }
}

fn init(repo_path: &Path, overrides: &ConfigOverrides, human: bool) -> Result<()> {
    let (store, _) = open_store(repo_path, overrides)?;
    let created = !store.initialized();
    store.ensure_dir()?;
    emit(
        &InitResult {
            location: store.location(),
            created,
        },
        human,
    );
    Ok(())
}

// === add ===

struct AddArgs {
    title: String,
    description: Option<String>,
    category: String,
    severity: String,
    tags: Vec<String>,
    file: Option<String>,
    line: Option<u32>,
    during_task: Option<String>,
    discovered_by: Option<String>,
}

struct DiscoveryResult {
    action: &'static str,
    discovery: Discovery,
}

impl CommandResult for DiscoveryResult {
    fn to_json(&self) -> String {
        serde_json::to_string(&self.discovery).unwrap_or_else(|e| {
            json!({"error": format!("serialization failed: {}", e)}).to_string()
        })
    }

    fn to_human(&self) -> String {
        let d = &self.discovery;
        let mut out = format!("{} discovery {} \"{}\"", self.action, d.id, d.title);
        match d.status {
            Status::Promoted => {
                if let Some(task) = &d.lifecycle.promoted_to_task {
                    out.push_str(&format!(" -> task {}", task));
                }
            }
            Status::Dismissed => {
                if let Some(reason) = &d.lifecycle.dismissed_reason {
                    out.push_str(&format!(" ({})", reason));
                }
            }
            _ => {}
        }
        out
    }
}

fn add(repo_path: &Path, overrides: &ConfigOverrides, human: bool, args: AddArgs) -> Result<()> {
    let (store, config) = open_store(repo_path, overrides)?;

    let mut discovery = Discovery::new(args.title);
    discovery.content.description = args.description;
    discovery.content.category = args.category.parse::<Category>()?;
    discovery.content.severity = args.severity.parse::<Severity>()?;
    discovery.content.tags = args.tags;
    if let Some(file) = args.file {
        discovery.location = Some(Location {
            file,
            line: args.line.unwrap_or(0),
        });
    }
    discovery.context.discovered_during_task = args.during_task;
    discovery.context.discovered_by = args
        .discovered_by
        .or_else(|| config.discovered_by.as_ref().map(|r| r.value.clone()))
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_default();

    let added = store.add(discovery)?;
    emit(
        &DiscoveryResult {
            action: "Captured",
            discovery: added,
        },
        human,
    );
    Ok(())
}

// === list ===

struct ListResult {
    outcome: ListOutcome,
}

impl CommandResult for ListResult {
    fn to_json(&self) -> String {
        json!({
            "discoveries": self.outcome.discoveries,
            "warnings": self.outcome.warnings,
        })
        .to_string()
    }

    fn to_human(&self) -> String {
        if self.outcome.discoveries.is_empty() {
            return "No discoveries found".to_string();
        }
        let mut lines = Vec::with_capacity(self.outcome.discoveries.len());
        for d in &self.outcome.discoveries {
            lines.push(format!(
                "{}  {:9}  {:15}  {:8}  {}",
                d.id,
                d.status.as_str(),
                d.content.category.as_str(),
                d.content.severity.as_str(),
                d.title
            ));
        }
        lines.join("\n")
    }
}

#[allow(clippy::too_many_arguments)]
fn list(
    repo_path: &Path,
    overrides: &ConfigOverrides,
    human: bool,
    status: Option<String>,
    category: Option<String>,
    severity: Option<String>,
    tag: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let (store, config) = open_store(repo_path, overrides)?;

    let filter = DiscoveryFilter {
        status: status.as_deref().map(str::parse).transpose()?,
        category: category.as_deref().map(str::parse).transpose()?,
        severity: severity.as_deref().map(str::parse).transpose()?,
        tag,
        limit: limit.or(config.default_limit.as_ref().map(|r| r.value)),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(store.list(&filter))?;

    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning);
    }
    emit(&ListResult { outcome }, human);
    Ok(())
}

// === show ===

struct ShowResult {
    discovery: Discovery,
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

impl CommandResult for ShowResult {
    fn to_json(&self) -> String {
        serde_json::to_string(&self.discovery).unwrap_or_else(|e| {
            json!({"error": format!("serialization failed: {}", e)}).to_string()
        })
    }

    fn to_human(&self) -> String {
        let d = &self.discovery;
        let mut lines = vec![
            format!("{}  [{}]", d.id, d.status),
            format!("  title:      {}", d.title),
            format!(
                "  category:   {} / {}",
                d.content.category, d.content.severity
            ),
        ];
        if let Some(description) = &d.content.description {
            lines.push(format!("  details:    {}", description));
        }
        if !d.content.tags.is_empty() {
            lines.push(format!("  tags:       {}", d.content.tags.join(", ")));
        }
        if let Some(location) = &d.location {
            if location.line > 0 {
                lines.push(format!("  location:   {}:{}", location.file, location.line));
            } else {
                lines.push(format!("  location:   {}", location.file));
            }
        }
        lines.push(format!(
            "  captured:   {} by {}",
            format_time(d.context.discovered_at),
            d.context.discovered_by
        ));
        if let Some(task) = &d.context.discovered_during_task {
            lines.push(format!("  during:     {}", task));
        }
        if let Some(git) = &d.context.git {
            lines.push(format!("  git:        {} @ {}", git.branch, git.commit));
        }
        if let Some(task) = &d.lifecycle.promoted_to_task {
            lines.push(format!("  task:       {}", task));
        }
        if let Some(reason) = &d.lifecycle.dismissed_reason {
            lines.push(format!("  dismissed:  {}", reason));
        }
        if let Some(at) = d.lifecycle.completed_at {
            lines.push(format!("  completed:  {}", format_time(at)));
        }
        lines.join("\n")
    }
}

fn show(repo_path: &Path, overrides: &ConfigOverrides, human: bool, id: &str) -> Result<()> {
    let (store, _) = open_store(repo_path, overrides)?;
    let discovery = store.get(id)?;
    emit(&ShowResult { discovery }, human);
    Ok(())
}

// === transitions ===

fn promote(
    repo_path: &Path,
    overrides: &ConfigOverrides,
    human: bool,
    id: &str,
    task: Option<String>,
) -> Result<()> {
    let (store, _) = open_store(repo_path, overrides)?;
    let promoted = match task {
        Some(task_id) => store.promote(id, &task_id)?,
        // No analysis provider is wired into the CLI yet; this takes the
        // deterministic fallback configuration.
        None => store.promote_generated(id, None)?.0,
    };
    emit(
        &DiscoveryResult {
            action: "Promoted",
            discovery: promoted,
        },
        human,
    );
    Ok(())
}

fn start(
    repo_path: &Path,
    overrides: &ConfigOverrides,
    human: bool,
    id: &str,
    task: &str,
) -> Result<()> {
    let (store, _) = open_store(repo_path, overrides)?;
    let started = store.start_task(id, task)?;
    emit(
        &DiscoveryResult {
            action: "Promoted",
            discovery: started,
        },
        human,
    );
    Ok(())
}

fn dismiss(
    repo_path: &Path,
    overrides: &ConfigOverrides,
    human: bool,
    id: &str,
    reason: &str,
) -> Result<()> {
    let (store, _) = open_store(repo_path, overrides)?;
    let dismissed = store.dismiss(id, reason)?;
    emit(
        &DiscoveryResult {
            action: "Dismissed",
            discovery: dismissed,
        },
        human,
    );
    Ok(())
}

fn complete(repo_path: &Path, overrides: &ConfigOverrides, human: bool, id: &str) -> Result<()> {
    let (store, _) = open_store(repo_path, overrides)?;
    let completed = store.complete(id)?;
    emit(
        &DiscoveryResult {
            action: "Completed",
            discovery: completed,
        },
        human,
    );
    Ok(())
}

// === rm ===

struct RemoveResult {
    id: String,
}

impl CommandResult for RemoveResult {
    fn to_json(&self) -> String {
        json!({"deleted": self.id}).to_string()
    }

    fn to_human(&self) -> String {
        format!("Deleted discovery {}", self.id)
    }
}

fn rm(repo_path: &Path, overrides: &ConfigOverrides, human: bool, id: &str) -> Result<()> {
    let (store, _) = open_store(repo_path, overrides)?;
    store.delete(id)?;
    emit(
        &RemoveResult { id: id.to_string() },
        human,
    );
    Ok(())
}

// === config show ===

struct ConfigShowResult {
    config: ResolvedConfig,
    location: String,
}

impl CommandResult for ConfigShowResult {
    fn to_json(&self) -> String {
        let c = &self.config;
        json!({
            "backlog": self.location,
            "discovered_by": c.discovered_by.as_ref().map(|r| json!({
                "value": r.value, "source": r.source.to_string()
            })),
            "max_tags": {"value": c.max_tags.value, "source": c.max_tags.source.to_string()},
            "scan_workers": {"value": c.scan_workers.value, "source": c.scan_workers.source.to_string()},
            "default_limit": c.default_limit.as_ref().map(|r| json!({
                "value": r.value, "source": r.source.to_string()
            })),
            "output_format": {
                "value": c.output_format.value.to_string(),
                "source": c.output_format.source.to_string()
            },
            "build": {
                "timestamp": env!("SG_BUILD_TIMESTAMP"),
                "commit": env!("SG_GIT_COMMIT"),
            },
        })
        .to_string()
    }

    fn to_human(&self) -> String {
        let c = &self.config;
        let mut lines = vec![format!("backlog:        {}", self.location)];
        match &c.discovered_by {
            Some(r) => lines.push(format!("discovered_by:  {} ({})", r.value, r.source)),
            None => lines.push("discovered_by:  <unset>".to_string()),
        }
        lines.push(format!(
            "max_tags:       {} ({})",
            c.max_tags.value, c.max_tags.source
        ));
        lines.push(format!(
            "scan_workers:   {} ({})",
            c.scan_workers.value, c.scan_workers.source
        ));
        match &c.default_limit {
            Some(r) => lines.push(format!("default_limit:  {} ({})", r.value, r.source)),
            None => lines.push("default_limit:  <unset>".to_string()),
        }
        lines.push(format!(
            "output_format:  {} ({})",
            c.output_format.value, c.output_format.source
        ));
        lines.push(format!(
            "build:          {} ({})",
            env!("SG_BUILD_TIMESTAMP"),
            env!("SG_GIT_COMMIT")
        ));
        lines.join("\n")
    }
}

fn config_show(repo_path: &Path, overrides: &ConfigOverrides, human: bool) -> Result<()> {
    let config = resolve_config(repo_path, overrides)?;
    let store = DiscoveryStore::open_bare(repo_path);
    emit(
        &ConfigShowResult {
            config,
            location: store.location(),
        },
        human,
    );
    Ok(())
}
