//! JSON output formatter.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "report": {
//!     "root": "/photos",
//!     "duplicates_folder": null,
//!     "filter": "duplicates",
//!     "stats": { "state": "finished", "files": 3, "duplicate_groups": 1, "...": 0 },
//!     "groups": [
//!       {
//!         "group": 0, "size": 1024, "checksum": "ab12...", "file_count": 2,
//!         "moved_count": 0, "remaining_count": 2, "first_file": 0,
//!         "names": ["a.jpg", "b.jpg"],
//!         "files": [{ "id": 0, "path": "/photos/a.jpg", "origin": "root", "moved": false }]
//!       }
//!     ]
//!   },
//!   "exit_code": 0,
//!   "exit_code_name": "DU000"
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use super::ScanReport;
use crate::error::ExitCode;

/// Complete JSON document.
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a> {
    /// The report
    pub report: &'a ScanReport,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DU000")
    pub exit_code_name: &'static str,
}

impl<'a> JsonOutput<'a> {
    /// Wrap a report with the exit code of this run.
    #[must_use]
    pub fn new(report: &'a ScanReport, exit_code: ExitCode) -> Self {
        Self {
            report,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
        }
    }

    /// Compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        if pretty {
            serde_json::to_writer_pretty(&mut *writer, self)?;
        } else {
            serde_json::to_writer(&mut *writer, self)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
