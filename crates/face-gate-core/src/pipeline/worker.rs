//! Per-image worker: landmark stage plus the six checks, timed and isolated.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::checks::{
    default_checks, extract_landmarks, CheckContext, CheckOptions, FaceCheck, LandmarkResult,
};
use crate::domain::{
    CheckKind, CheckOutcome, ImageInfo, ImageRecord, ResultRow, Stage, Thresholds, TimingRecord,
    CANNOT_READ,
};
use crate::ports::FacePerception;

/// Everything one image produced: outcomes for routing, a row and a timing
/// record for the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReport {
    pub record: ImageRecord,
    pub outcomes: Vec<(CheckKind, CheckOutcome)>,
    pub row: ResultRow,
    pub timing: TimingRecord,
}

impl ImageReport {
    /// Builds the report, deriving the results row from the outcomes.
    #[must_use]
    pub fn new(
        record: ImageRecord,
        outcomes: Vec<(CheckKind, CheckOutcome)>,
        timing: TimingRecord,
    ) -> Self {
        let message = |kind: CheckKind| {
            outcomes
                .iter()
                .find(|(k, _)| *k == kind)
                .map_or_else(
                    || "Error processing image: check not run".to_string(),
                    |(_, outcome)| outcome.message().to_string(),
                )
        };
        let row = ResultRow {
            image_name: record.file_name.clone(),
            face_message: message(CheckKind::FaceSize),
            eye_message: message(CheckKind::EyeStatus),
            light_message: message(CheckKind::Lighting),
            blur_message: message(CheckKind::Blur),
            head_fully_message: message(CheckKind::HeadFully),
            head_pose_message: message(CheckKind::HeadPose),
        };
        Self {
            record,
            outcomes,
            row,
            timing,
        }
    }

    /// Report with the same kind of outcome for every check and zero timings.
    #[must_use]
    pub fn uniform(record: &ImageRecord, outcome: impl Fn(CheckKind) -> CheckOutcome) -> Self {
        let outcomes = CheckKind::ALL.iter().map(|&k| (k, outcome(k))).collect();
        Self::new(
            record.clone(),
            outcomes,
            TimingRecord::new(record.file_name.clone()),
        )
    }

    /// Number of checks that did not pass, faults included.
    #[must_use]
    pub fn failed_checks(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.passed() != Some(true))
            .count()
    }
}

/// Runs every check on one image.
pub struct ImageWorker {
    perception: Arc<dyn FacePerception>,
    checks: Vec<Box<dyn FaceCheck>>,
}

impl ImageWorker {
    #[must_use]
    pub fn new(perception: Arc<dyn FacePerception>, checks: Vec<Box<dyn FaceCheck>>) -> Self {
        Self { perception, checks }
    }

    /// Worker with the six standard checks.
    #[must_use]
    pub fn with_thresholds(
        perception: Arc<dyn FacePerception>,
        thresholds: &Thresholds,
        options: CheckOptions,
    ) -> Self {
        Self::new(perception, default_checks(thresholds, options))
    }

    /// Processes one image. Always returns a complete report.
    ///
    /// The image is decoded once; decoding time counts towards the landmark
    /// stage. An undecodable image gets `Cannot read image` for every check.
    /// A check that returns an error marks itself and every later check as
    /// faulted.
    #[must_use]
    pub fn process(&self, record: &ImageRecord) -> ImageReport {
        let mut timing = TimingRecord::new(record.file_name.clone());

        let start = Instant::now();
        let image = ImageInfo::open(&record.path);
        let landmarks = match &image {
            Ok(image) => extract_landmarks(image, self.perception.as_ref()),
            Err(_) => LandmarkResult::unreadable(),
        };
        timing.set(Stage::Landmarks, start.elapsed().as_secs_f64());
        debug!("{}: {}", record.file_name, landmarks.message());

        let image = match image {
            Ok(image) => image,
            Err(e) => {
                warn!("{e:#}");
                let outcomes = CheckKind::ALL
                    .iter()
                    .map(|&k| (k, CheckOutcome::Unusable { label: CANNOT_READ }))
                    .collect();
                return ImageReport::new(record.clone(), outcomes, timing);
            }
        };

        let ctx = CheckContext {
            image: &image,
            landmarks: &landmarks,
            perception: self.perception.as_ref(),
        };

        let mut outcomes = Vec::with_capacity(self.checks.len());
        let mut escaped: Option<String> = None;
        for check in &self.checks {
            let kind = check.kind();
            if let Some(description) = &escaped {
                outcomes.push((
                    kind,
                    CheckOutcome::Fault {
                        description: description.clone(),
                    },
                ));
                continue;
            }

            let start = Instant::now();
            let outcome = check.evaluate(&ctx).unwrap_or_else(|e| {
                warn!("{} failed on {}: {e:#}", kind, record.path.display());
                let fault = CheckOutcome::fault("processing image", &e);
                escaped = Some(fault.message().to_string());
                fault
            });
            timing.set(kind.stage(), start.elapsed().as_secs_f64());
            outcomes.push((kind, outcome));
        }

        ImageReport::new(record.clone(), outcomes, timing)
    }
}
