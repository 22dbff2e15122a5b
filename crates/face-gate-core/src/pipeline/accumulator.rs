//! Run-wide accumulation of rows, timings and totals.

use std::path::PathBuf;

use super::worker::ImageReport;
use crate::domain::{ReportTables, ResultRow, RunningTotals, TimingRecord};

/// Collected rows and timings. Lives behind the runner's single lock.
#[derive(Debug, Default)]
pub struct Accumulator {
    entries: Vec<(PathBuf, ResultRow, TimingRecord)>,
    totals: RunningTotals,
    since_flush: usize,
}

impl Accumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one image's row and timing and grows the totals by its timing.
    pub fn record(&mut self, report: &ImageReport) {
        self.totals.add(&report.timing);
        self.entries.push((
            report.record.path.clone(),
            report.row.clone(),
            report.timing.clone(),
        ));
        self.since_flush += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn totals(&self) -> &RunningTotals {
        &self.totals
    }

    /// True once `every` images have been recorded since the last call that
    /// returned true. Resets the counter when it fires.
    pub fn flush_due(&mut self, every: usize) -> bool {
        if every > 0 && self.since_flush >= every {
            self.since_flush = 0;
            true
        } else {
            false
        }
    }

    /// Snapshot of the three tables, rows ordered by source path.
    #[must_use]
    pub fn tables(&self) -> ReportTables {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| self.entries[a].0.cmp(&self.entries[b].0));

        ReportTables {
            results: order.iter().map(|&i| self.entries[i].1.clone()).collect(),
            timing_per_image: order.iter().map(|&i| self.entries[i].2.clone()).collect(),
            timing_summary: self.totals.summary_rows(),
        }
    }
}
