//! Report sink port for persisting the result tables.

use crate::domain::ReportTables;

/// Port for persisting the result, timing and summary tables.
///
/// Each call replaces the previously written report.
pub trait ReportSink: Send + Sync {
    /// Writes a full snapshot of the tables.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write(&self, tables: &ReportTables) -> anyhow::Result<()>;
}
