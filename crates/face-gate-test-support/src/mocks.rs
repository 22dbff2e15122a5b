//! Mock implementations of core port traits.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use face_gate_core::domain::{
    CheckKind, CheckOutcome, DetectionOptions, FaceDetection, FaceMesh, ImageInfo, ImageRecord,
    ReportTables,
};
use face_gate_core::ports::{
    FacePerception, ImageSource, OutcomeRouter, ProgressEvent, ProgressSink, ReportSink,
};

/// Mock implementation of `FacePerception` keyed by image file name.
///
/// Images without a registered face report "no face". Individual images can
/// be made to fail, panic or stall.
#[derive(Default)]
pub struct MockPerception {
    meshes: HashMap<String, FaceMesh>,
    detections: HashMap<String, FaceDetection>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Arc<Mutex<usize>>,
}

impl MockPerception {
    /// Creates a mock that finds no faces anywhere.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mesh; the detection box is derived from its extent.
    #[must_use]
    pub fn with_face(mut self, file_name: &str, mesh: FaceMesh) -> Self {
        if let Some(bbox) = mesh.extent() {
            self.detections.insert(
                file_name.to_string(),
                FaceDetection {
                    score: mesh.score,
                    bbox,
                },
            );
        }
        self.meshes.insert(file_name.to_string(), mesh);
        self
    }

    /// Registers a detection without a mesh.
    #[must_use]
    pub fn with_detection(mut self, file_name: &str, detection: FaceDetection) -> Self {
        self.detections.insert(file_name.to_string(), detection);
        self
    }

    /// Every call for this image returns an error.
    #[must_use]
    pub fn failing(mut self, file_name: &str) -> Self {
        self.failing.insert(file_name.to_string());
        self
    }

    /// Every call for this image panics.
    #[must_use]
    pub fn panicking(mut self, file_name: &str) -> Self {
        self.panicking.insert(file_name.to_string());
        self
    }

    /// Every call for this image sleeps first.
    #[must_use]
    pub fn sleeping(mut self, file_name: &str, delay: Duration) -> Self {
        self.delays.insert(file_name.to_string(), delay);
        self
    }

    /// Returns the number of perception calls made.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, image: &ImageInfo) -> anyhow::Result<()> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        let name = image.file_name();
        if let Some(delay) = self.delays.get(name) {
            std::thread::sleep(*delay);
        }
        assert!(
            !self.panicking.contains(name),
            "perception runtime crashed on {name}"
        );
        if self.failing.contains(name) {
            anyhow::bail!("perception backend unavailable for {name}");
        }
        Ok(())
    }
}

impl FacePerception for MockPerception {
    fn face_mesh(
        &self,
        image: &ImageInfo,
        options: &DetectionOptions,
    ) -> anyhow::Result<Option<FaceMesh>> {
        self.enter(image)?;
        Ok(self
            .meshes
            .get(image.file_name())
            .filter(|mesh| mesh.score >= options.min_confidence)
            .cloned())
    }

    fn detect_face(
        &self,
        image: &ImageInfo,
        options: &DetectionOptions,
    ) -> anyhow::Result<Option<FaceDetection>> {
        self.enter(image)?;
        Ok(self
            .detections
            .get(image.file_name())
            .filter(|d| d.score >= options.min_confidence)
            .copied())
    }
}

/// Mock implementation of `ImageSource` for testing.
pub struct MockImageSource {
    records: Vec<ImageRecord>,
    fail: bool,
}

impl MockImageSource {
    /// Creates a source yielding the given records in order.
    #[must_use]
    pub const fn new(records: Vec<ImageRecord>) -> Self {
        Self {
            records,
            fail: false,
        }
    }

    /// Creates an empty mock source.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(vec![])
    }

    /// Creates a source whose enumeration fails.
    #[must_use]
    pub const fn failing() -> Self {
        Self {
            records: vec![],
            fail: true,
        }
    }
}

impl ImageSource for MockImageSource {
    fn records(&self) -> anyhow::Result<Vec<ImageRecord>> {
        if self.fail {
            anyhow::bail!("input root does not exist");
        }
        Ok(self.records.clone())
    }
}

/// One routed copy captured by [`MemoryRouter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedCopy {
    pub file_name: String,
    pub check: CheckKind,
    pub folder: String,
}

/// In-memory `OutcomeRouter` that records every copy.
#[derive(Default)]
pub struct MemoryRouter {
    copies: Mutex<Vec<RoutedCopy>>,
    prepared: Mutex<usize>,
    fail_on: Option<String>,
}

impl MemoryRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routing any check of this file fails.
    #[must_use]
    pub fn failing_on(file_name: &str) -> Self {
        Self {
            fail_on: Some(file_name.to_string()),
            ..Self::default()
        }
    }

    /// Returns all recorded copies.
    #[must_use]
    pub fn copies(&self) -> Vec<RoutedCopy> {
        self.copies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `prepare()` was called.
    #[must_use]
    pub fn prepare_count(&self) -> usize {
        *self.prepared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Folder a file was routed to for one check.
    #[must_use]
    pub fn folder_of(&self, file_name: &str, check: CheckKind) -> Option<String> {
        self.copies()
            .into_iter()
            .find(|c| c.file_name == file_name && c.check == check)
            .map(|c| c.folder)
    }
}

impl OutcomeRouter for MemoryRouter {
    fn prepare(&self) -> anyhow::Result<()> {
        *self.prepared.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn route(
        &self,
        record: &ImageRecord,
        check: CheckKind,
        outcome: &CheckOutcome,
    ) -> anyhow::Result<()> {
        if self.fail_on.as_deref() == Some(record.file_name.as_str()) {
            anyhow::bail!("disk full");
        }
        self.copies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RoutedCopy {
                file_name: record.file_name.clone(),
                check,
                folder: outcome.folder().to_string(),
            });
        Ok(())
    }
}

/// In-memory `ReportSink` capturing every written snapshot.
#[derive(Default)]
pub struct MemoryReportSink {
    snapshots: Mutex<Vec<ReportTables>>,
    fail: bool,
}

impl MemoryReportSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose writes always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Returns every snapshot, oldest first.
    #[must_use]
    pub fn snapshots(&self) -> Vec<ReportTables> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of writes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns the most recent snapshot.
    #[must_use]
    pub fn last(&self) -> Option<ReportTables> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl ReportSink for MemoryReportSink {
    fn write(&self, tables: &ReportTables) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("report destination is read-only");
        }
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tables.clone());
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
#[derive(Default)]
pub struct MockProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn count(&self, pred: impl Fn(&ProgressEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    /// Returns the number of `Started` events.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Started { .. }))
    }

    /// Returns the number of `Completed` events.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Completed { .. }))
    }

    /// Returns the number of `Faulted` events.
    #[must_use]
    pub fn faulted_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Faulted { .. }))
    }

    /// Returns the number of `Flushed` events.
    #[must_use]
    pub fn flushed_count(&self) -> usize {
        self.count(|e| matches!(e, ProgressEvent::Flushed { .. }))
    }

    /// Returns the final counts from the `Finished` event, if any.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished {
                processed,
                write_failures,
            } => Some((*processed, *write_failures)),
            _ => None,
        })
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
