//! Report rows, per-image timing, and running totals.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::outcome::Stage;

/// One results-table row. Every message is always filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub image_name: String,
    pub face_message: String,
    pub eye_message: String,
    pub light_message: String,
    pub blur_message: String,
    pub head_fully_message: String,
    pub head_pose_message: String,
}

/// Elapsed seconds per stage for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingRecord {
    pub image_name: String,
    pub durations: [f64; Stage::ALL.len()],
}

impl TimingRecord {
    #[must_use]
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            durations: [0.0; Stage::ALL.len()],
        }
    }

    pub fn set(&mut self, stage: Stage, seconds: f64) {
        self.durations[stage.index()] = seconds;
    }

    #[must_use]
    pub const fn get(&self, stage: Stage) -> f64 {
        self.durations[stage.index()]
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.durations.iter().sum()
    }
}

impl Serialize for TimingRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Stage::ALL.len() + 1))?;
        map.serialize_entry("image_name", &self.image_name)?;
        for stage in Stage::ALL {
            map.serialize_entry(&format!("{}_time", stage.name()), &self.get(stage))?;
        }
        map.end()
    }
}

/// Cumulative seconds per stage across all accumulated images.
///
/// Only ever grows; mutated inside the accumulator lock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningTotals {
    totals: [f64; Stage::ALL.len()],
}

impl RunningTotals {
    pub fn add(&mut self, timing: &TimingRecord) {
        for (total, seconds) in self.totals.iter_mut().zip(timing.durations) {
            *total += seconds.max(0.0);
        }
    }

    #[must_use]
    pub const fn get(&self, stage: Stage) -> f64 {
        self.totals[stage.index()]
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.totals.iter().sum()
    }

    /// Summary table: one row per stage plus the grand total.
    #[must_use]
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        Stage::ALL
            .iter()
            .map(|&stage| SummaryRow {
                stage: stage.name().to_string(),
                total_time_seconds: self.get(stage),
            })
            .chain(std::iter::once(SummaryRow {
                stage: "total_all_stages".to_string(),
                total_time_seconds: self.total(),
            }))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub stage: String,
    pub total_time_seconds: f64,
}

/// The three persisted tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportTables {
    pub results: Vec<ResultRow>,
    pub timing_per_image: Vec<TimingRecord>,
    pub timing_summary: Vec<SummaryRow>,
}
