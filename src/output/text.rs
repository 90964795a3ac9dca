//! Human-readable report.
//!
//! ```text
//! G0  1.0 KiB  2 (1 left, 1 moved)  a.jpg,b.jpg
//!     /photos/a.jpg
//!     /photos/b.jpg  [moved -> /dupes/b.jpg]
//!
//! 1 duplicate groups, 2 files, 1.0 KiB reclaimable (finished)
//! ```

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use super::ScanReport;

/// Plain text formatter. Colors follow the global yansi switch.
pub struct TextOutput<'a> {
    report: &'a ScanReport,
}

impl<'a> TextOutput<'a> {
    /// Create a new text formatter.
    #[must_use]
    pub fn new(report: &'a ScanReport) -> Self {
        Self { report }
    }

    /// Write the report.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for group in &self.report.groups {
            let summary = &group.summary;
            writeln!(
                writer,
                "{}  {}  {}  {}",
                summary.group.to_string().bold(),
                ByteSize::b(summary.size).to_string().cyan(),
                summary.status(),
                summary.label()
            )?;
            for file in &group.files {
                if file.moved {
                    let target = file
                        .relocation_target
                        .as_ref()
                        .map(|p| format!(" -> {}", p.display()))
                        .unwrap_or_default();
                    writeln!(
                        writer,
                        "    {}  {}",
                        file.path.display().dim(),
                        format!("[moved{target}]").yellow()
                    )?;
                } else {
                    writeln!(writer, "    {}", file.path.display())?;
                }
            }
            writeln!(writer)?;
        }

        let stats = &self.report.stats;
        writeln!(
            writer,
            "{} duplicate groups, {} files, {} reclaimable ({})",
            stats.duplicate_groups.green().bold(),
            stats.files,
            ByteSize::b(stats.wasted_space),
            stats.state
        )?;
        if stats.skipped > 0 {
            writeln!(writer, "{}", format!("{} paths skipped", stats.skipped).red())?;
        }
        Ok(())
    }

    /// Render the report into a string.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn to_string(&self) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
