//! CLI argument definitions for Spyglass.

use clap::{Parser, Subcommand};

/// Spyglass - a discovery backlog for AI agents and humans.
///
/// Capture issues you notice but cannot fix right now (`sg add`), then
/// triage them later: promote to a task, dismiss, or complete.
#[derive(Parser, Debug)]
#[command(name = "sg")]
#[command(author, version, about = "A CLI tool for AI agents and humans to capture and triage code discoveries", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if sg was started in <path> instead of the current directory.
    /// The path must exist. Bypasses git root detection - uses the path literally.
    /// Can also be set via SG_REPO environment variable.
    #[arg(short = 'C', long = "repo", global = true, env = "SG_REPO")]
    pub repo_path: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the discovery backlog for this repository
    Init,

    /// Capture a new discovery
    Add {
        /// One-line summary of the issue
        title: String,

        /// Detailed description
        #[arg(short, long)]
        description: Option<String>,

        /// Category: bug, security, performance, maintainability, testing, documentation
        #[arg(short, long, default_value = "bug")]
        category: String,

        /// Severity: low, medium, high, critical
        #[arg(short, long, default_value = "medium")]
        severity: String,

        /// Tag (repeatable, lowercase)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Source file the discovery refers to
        #[arg(long)]
        file: Option<String>,

        /// 1-based line number within --file
        #[arg(long, requires = "file")]
        line: Option<u32>,

        /// Task you were working on when the issue surfaced
        #[arg(long = "during")]
        during_task: Option<String>,

        /// Who is capturing this (falls back to config, then $USER)
        #[arg(long = "by")]
        discovered_by: Option<String>,
    },

    /// List discoveries, newest first
    List {
        /// Filter by status: pending, promoted, dismissed, completed
        #[arg(short = 'S', long)]
        status: Option<String>,

        /// Filter by category
        #[arg(short, long)]
        category: Option<String>,

        /// Filter by severity
        #[arg(short, long)]
        severity: Option<String>,

        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Keep at most this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one discovery by ID
    Show {
        /// Discovery ID (e.g. sgd-7XK2QJ or legacy sg-a1b2c3)
        id: String,
    },

    /// Promote a pending discovery to a task
    Promote {
        /// Discovery ID
        id: String,

        /// Task to promote to; omitted = derive one from the generated
        /// task configuration
        #[arg(short, long)]
        task: Option<String>,
    },

    /// Promote a pending discovery as part of starting work on a task.
    /// Safe to re-run with the same task ID.
    Start {
        /// Discovery ID
        id: String,

        /// Task being started
        #[arg(short, long)]
        task: String,
    },

    /// Dismiss a pending discovery
    Dismiss {
        /// Discovery ID
        id: String,

        /// Why it is being dismissed
        #[arg(short, long)]
        reason: String,
    },

    /// Complete a promoted discovery
    Complete {
        /// Discovery ID
        id: String,
    },

    /// Delete a discovery
    Rm {
        /// Discovery ID
        id: String,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value came from
    Show,
}
