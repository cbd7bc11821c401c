//! Spyglass - a discovery backlog for AI agents and humans.
//!
//! This library provides the core functionality for the `sg` CLI tool:
//! capturing "discovery" records (issues noticed during development that
//! cannot be addressed immediately) as one file per record in a shared
//! directory, so many independent contributors can add records concurrently
//! with zero merge conflicts.

pub mod cli;
pub mod commands;
pub mod config;
pub mod git;
pub mod id;
pub mod models;
pub mod storage;
pub mod triage;


/// Library-level error type for Spyglass operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not initialized: run `sg init` first")]
    NotInitialized,

    #[error("Discovery not found: {0}")]
    NotFound(String),

    #[error("Duplicate discovery ID: {0}")]
    DuplicateId(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Empty value: {0}")]
    EmptyValue(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Malformed record {file}: {reason}")]
    Malformed { file: String, reason: String },

    #[error("Invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: crate::models::Status,
        to: crate::models::Status,
    },

    #[error("Migration collision: {0} already exists")]
    MigrationCollision(String),

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Library-level result type for Spyglass operations.
pub type Result<T> = std::result::Result<T, Error>;
