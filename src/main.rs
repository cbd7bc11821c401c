//! Spyglass CLI - a discovery backlog for AI agents and humans.

use clap::Parser;
use spyglass::cli::Cli;
use spyglass::commands;
use spyglass::config::{ConfigOverrides, OutputFormat, resolve_config};
use spyglass::git::find_git_root;
use spyglass::{Error, Result};
use std::path::PathBuf;
use std::process;

/// Exit codes: 1 = generic failure, 2 = not found, 3 = invalid status
/// transition. Distinct codes let orchestration scripts branch without
/// parsing error text.
fn exit_code(error: &Error) -> i32 {
    match error {
        Error::NotFound(_) => 2,
        Error::InvalidTransition { .. } => 3,
        _ => 1,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("SG_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Determine repo path: --repo flag > SG_REPO env > auto-detect git root > cwd
    let repo_path = resolve_repo_path(cli.repo_path, cli.human_readable);

    // Global flags enter configuration resolution as the highest-precedence
    // layer; -H therefore wins over any configured output format.
    let overrides = ConfigOverrides {
        output_format: cli.human_readable.then_some(OutputFormat::Human),
        ..Default::default()
    };
    let human = configured_human(&repo_path, &overrides, cli.human_readable);

    if let Err(e) = commands::run(cli.command, &repo_path, &overrides, human) {
        print_error(&e, human);
        process::exit(exit_code(&e));
    }
}

/// Whether resolved configuration asks for human-readable output.
/// Configuration problems are reported by the command itself; here they
/// just fall back to the bare flag.
fn configured_human(
    repo_path: &std::path::Path,
    overrides: &ConfigOverrides,
    flag: bool,
) -> bool {
    resolve_config(repo_path, overrides)
        .map(|c| c.output_format.value == OutputFormat::Human)
        .unwrap_or(flag)
}

fn print_error(error: &Error, human: bool) {
    if human {
        eprintln!("Error: {}", error);
    } else {
        eprintln!(
            "{}",
            serde_json::json!({"error": error.to_string()})
        );
    }
}

/// Resolve the repository path based on explicit flag, environment variable,
/// or auto-detection.
///
/// Priority: --repo flag > SG_REPO env var > git root detection > current
/// working directory.
///
/// When an explicit path is provided (via -C/--repo or SG_REPO), it is used
/// literally without git root detection. This allows targeting specific
/// subdirectories even within a git repository.
fn resolve_repo_path(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                let e = Error::InvalidInput(format!(
                    "specified repo path does not exist: {}",
                    path.display()
                ));
                print_error(&e, human);
                process::exit(1);
            }
            path
        }
        None => match current_dir() {
            Ok(cwd) => find_git_root(&cwd).unwrap_or(cwd),
            Err(e) => {
                print_error(&e, human);
                process::exit(1);
            }
        },
    }
}

fn current_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir()?)
}
