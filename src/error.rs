//! Engine error taxonomy, exit codes and structured error output.

use std::path::PathBuf;

use serde::Serialize;

use crate::duplicates::GroupId;
use crate::engine::{Command, ScanState};
use crate::registry::FileId;
use crate::scanner::HashError;

/// Errors returned synchronously by the engine's command and query interface.
///
/// Traversal and hashing failures during a scan never surface here; the
/// worker logs them, reports them as skipped files and carries on.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// The command is not legal in the current scan state.
    #[error("cannot {command} while {state}")]
    InvalidStateTransition {
        /// The rejected command
        command: Command,
        /// State the controller was in
        state: ScanState,
    },

    /// No file with this id was registered in the current run.
    #[error("unknown file {0}")]
    FileNotFound(FileId),

    /// No group with this index exists in the current run.
    #[error("unknown group {0}")]
    GroupNotFound(GroupId),

    /// A configured folder does not exist.
    #[error("Path not found: {0}")]
    RootNotFound(PathBuf),

    /// A configured folder is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// A file could not be read for hashing.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// Any other I/O failure, such as spawning the worker thread.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path (or resource) involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Exit codes for the dude binary.
///
/// - 0: Success (completed normally, duplicates found)
/// - 1: General error (unexpected failure)
/// - 2: No duplicates found (completed normally, no duplicates)
/// - 3: Partial success (completed, some files or folders were skipped)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: Scan completed and duplicates were found.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No duplicates: Scan completed but no duplicates were found.
    NoDuplicates = 2,
    /// Partial success: Scan completed but skipped unreadable files.
    PartialSuccess = 3,
    /// Interrupted: Scan was paused by Ctrl+C and reported early.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DU000",
            Self::GeneralError => "DU001",
            Self::NoDuplicates => "DU002",
            Self::PartialSuccess => "DU003",
            Self::Interrupted => "DU130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DU001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the scan was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
