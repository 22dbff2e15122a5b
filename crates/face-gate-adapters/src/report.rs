//! JSON report writer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use face_gate_core::{ReportSink, ReportTables};
use tracing::debug;

/// Report file name inside the output root.
pub const REPORT_FILE: &str = "results.json";

/// Writes the three tables to `results.json`.
///
/// Each write goes to a temporary file that is then renamed over the report,
/// so an interrupted run always leaves the last complete snapshot.
pub struct JsonReportWriter {
    path: PathBuf,
}

impl JsonReportWriter {
    /// Writer for `<output_root>/results.json`.
    #[must_use]
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            path: output_root.into().join(REPORT_FILE),
        }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ReportSink for JsonReportWriter {
    fn write(&self, tables: &ReportTables) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(tables).context("Failed to serialize report")?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        debug!(
            "Wrote {} rows to {}",
            tables.results.len(),
            self.path.display()
        );
        Ok(())
    }
}
