//! Error types for bottleforge

use std::path::PathBuf;
use thiserror::Error;

/// BottleForge result type
pub type Result<T> = std::result::Result<T, BottleForgeError>;

/// Main error type for bottle configuration operations
///
/// Parsing and merging never fail; every variant here comes from the I/O
/// boundary or from user input handed to the edit session.
#[derive(Error, Debug)]
pub enum BottleForgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create {path:?}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to replace {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bottle not found: {0}")]
    BottleNotFound(String),

    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    #[error("Variable cannot be renamed: {0}")]
    NonEditableKey(String),

    #[error("Invalid variable name: {0:?}")]
    InvalidKey(String),

    #[error("Invalid assignment: {0} (expected KEY=on|off)")]
    InvalidAssignment(String),

    #[error("Background task failed: {0}")]
    Task(String),
}
