//! CSV output formatter.
//!
//! One row is generated for each file of each reported group.
//!
//! # Columns
//!
//! - `group_id`: Group index
//! - `checksum`: BLAKE3 content checksum (hexadecimal, empty for an
//!   uncompared singleton)
//! - `file_id`: File index
//! - `path`: Full path to the file
//! - `size`: File size in bytes
//! - `origin`: `root` or `known_duplicates`
//! - `moved`: Moved flag
//! - `relocation_target`: Destination in the known-duplicates folder, if any
//! - `modified`: Last modified time (RFC 3339 format)

use std::io;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::ScanReport;
use crate::registry::FileOrigin;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow {
    group_id: usize,
    checksum: String,
    file_id: usize,
    path: String,
    size: u64,
    origin: FileOrigin,
    moved: bool,
    relocation_target: String,
    modified: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    report: &'a ScanReport,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(report: &'a ScanReport) -> Self {
        Self { report }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for group in &self.report.groups {
            let checksum = group
                .summary
                .checksum
                .map(|c| c.to_hex())
                .unwrap_or_default();

            for file in &group.files {
                csv_writer.serialize(CsvRow {
                    group_id: group.summary.group.index(),
                    checksum: checksum.clone(),
                    file_id: file.id.index(),
                    path: file.path.to_string_lossy().to_string(),
                    size: group.summary.size,
                    origin: file.origin,
                    moved: file.moved,
                    relocation_target: file
                        .relocation_target
                        .as_ref()
                        .map(|p| p.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    modified: modified_time(&file.path),
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

/// Last modified time of a file, or "unknown" if metadata cannot be read.
fn modified_time(path: &std::path::Path) -> String {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|m| {
            let datetime: DateTime<Utc> = m.into();
            datetime.to_rfc3339()
        })
        .unwrap_or_else(|_| "unknown".to_string())
}
