//! Integration tests for the batch runner with mock collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use face_gate_core::checks::CheckOptions;
use face_gate_core::domain::labels;
use face_gate_core::{
    BatchRunner, CheckKind, ExecutionMode, ImageRecord, ImageWorker, RunOptions, RunSummary,
    Stage, Thresholds,
};
use face_gate_test_support::{
    FaceMeshBuilder, MemoryReportSink, MemoryRouter, MockImageSource, MockPerception,
    MockProgressSink, SyntheticImageBuilder,
};
use tempfile::TempDir;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn write_images(dir: &Path, count: usize) -> Vec<ImageRecord> {
    (0..count)
        .map(|i| {
            let image = SyntheticImageBuilder::checkerboard(WIDTH, HEIGHT);
            SyntheticImageBuilder::write(dir, &format!("img_{i:03}.png"), &image).unwrap()
        })
        .collect()
}

struct Harness {
    router: MemoryRouter,
    sink: MemoryReportSink,
    progress: MockProgressSink,
}

impl Harness {
    fn new() -> Self {
        Self {
            router: MemoryRouter::new(),
            sink: MemoryReportSink::new(),
            progress: MockProgressSink::new(),
        }
    }

    fn run(
        &self,
        perception: MockPerception,
        records: Vec<ImageRecord>,
        options: RunOptions,
    ) -> RunSummary {
        let worker = ImageWorker::with_thresholds(
            Arc::new(perception),
            &Thresholds::default(),
            CheckOptions::default(),
        );
        BatchRunner::new(Arc::new(worker), options)
            .run(
                &MockImageSource::new(records),
                &self.router,
                &self.sink,
                &self.progress,
            )
            .expect("run should succeed")
    }
}

fn sequential() -> RunOptions {
    RunOptions {
        mode: ExecutionMode::Sequential,
        ..RunOptions::default()
    }
}

fn pool(workers: usize) -> RunOptions {
    RunOptions {
        mode: ExecutionMode::Pool { workers },
        ..RunOptions::default()
    }
}

#[test]
fn test_empty_source_touches_nothing() {
    let harness = Harness::new();
    let summary = harness.run(MockPerception::new(), Vec::new(), RunOptions::default());

    assert_eq!(summary.rows, 0);
    assert_eq!(harness.router.prepare_count(), 0);
    assert_eq!(harness.sink.write_count(), 0);
    assert_eq!(harness.progress.finished_counts(), Some((0, 0)));
}

#[test]
fn test_failing_source_is_an_error() {
    let worker = ImageWorker::with_thresholds(
        Arc::new(MockPerception::new()),
        &Thresholds::default(),
        CheckOptions::default(),
    );
    let result = BatchRunner::new(Arc::new(worker), RunOptions::default()).run(
        &MockImageSource::failing(),
        &MemoryRouter::new(),
        &MemoryReportSink::new(),
        &MockProgressSink::new(),
    );
    assert!(result.is_err());
}

#[test]
fn test_totals_match_rows_for_every_mode() {
    let dir = TempDir::new().unwrap();
    let records = write_images(dir.path(), 9);

    let modes = [
        ExecutionMode::Sequential,
        ExecutionMode::Pool { workers: 1 },
        ExecutionMode::Pool { workers: 2 },
        ExecutionMode::Pool { workers: 3 },
        ExecutionMode::Pool { workers: 4 },
    ];
    for mode in modes {
        let harness = Harness::new();
        let options = RunOptions {
            mode,
            ..RunOptions::default()
        };
        let summary = harness.run(MockPerception::new(), records.clone(), options);

        assert_eq!(summary.rows, 9, "{mode:?}");
        assert_eq!(harness.router.prepare_count(), 1);
        assert_eq!(harness.router.copies().len(), 9 * CheckKind::ALL.len());

        let tables = harness.sink.last().unwrap();
        assert_eq!(tables.results.len(), 9);
        assert_eq!(tables.timing_per_image.len(), 9);
        for stage in Stage::ALL {
            let sum: f64 = tables.timing_per_image.iter().map(|t| t.get(stage)).sum();
            assert!(
                (sum - summary.totals.get(stage)).abs() < 1e-9,
                "{mode:?} {stage}"
            );
        }
        let grand = tables.timing_summary.last().unwrap();
        assert_eq!(grand.stage, "total_all_stages");
        assert!((grand.total_time_seconds - summary.totals.total()).abs() < 1e-9);
    }
}

#[test]
fn test_rows_are_sorted_regardless_of_completion_order() {
    let dir = TempDir::new().unwrap();
    let mut records = write_images(dir.path(), 6);
    records.reverse();
    let harness = Harness::new();
    harness.run(MockPerception::new(), records, pool(3));

    let names: Vec<String> = harness
        .sink
        .last()
        .unwrap()
        .results
        .into_iter()
        .map(|row| row.image_name)
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_flush_cadence() {
    let dir = TempDir::new().unwrap();
    let records = write_images(dir.path(), 25);
    let harness = Harness::new();
    let options = RunOptions {
        mode: ExecutionMode::Sequential,
        flush_every: 10,
        image_timeout: None,
    };
    harness.run(MockPerception::new(), records, options);

    let snapshots = harness.sink.snapshots();
    let sizes: Vec<usize> = snapshots.iter().map(|t| t.results.len()).collect();
    assert_eq!(sizes, [10, 20, 25]);
    assert_eq!(harness.progress.flushed_count(), 3);
}

#[test]
fn test_final_write_after_exact_flush() {
    let dir = TempDir::new().unwrap();
    let records = write_images(dir.path(), 10);
    let harness = Harness::new();
    let options = RunOptions {
        mode: ExecutionMode::Sequential,
        flush_every: 10,
        image_timeout: None,
    };
    harness.run(MockPerception::new(), records, options);
    assert_eq!(harness.sink.write_count(), 2);
}

#[test]
fn test_no_face_labels() {
    let dir = TempDir::new().unwrap();
    let records = write_images(dir.path(), 1);
    let harness = Harness::new();
    harness.run(MockPerception::new(), records, pool(2));

    let row = &harness.sink.last().unwrap().results[0];
    assert_eq!(row.face_message, labels::face_size::NO_BOX);
    assert_eq!(row.eye_message, labels::eye_status::NO_FACE);
    assert_eq!(row.light_message, labels::lighting::NO_FACE);
    assert_eq!(row.head_fully_message, labels::head_fully::NO_FACE);
    assert_eq!(row.head_pose_message, labels::head_pose::NO_FACE);
    // whole-image blur does not need a face
    assert_eq!(row.blur_message, labels::blur::SHARP);
}

#[test]
fn test_unreadable_image() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"\xff\xd8 truncated").unwrap();
    let harness = Harness::new();
    harness.run(
        MockPerception::new(),
        vec![ImageRecord::new(path)],
        pool(2),
    );

    for check in CheckKind::ALL {
        assert_eq!(
            harness.router.folder_of("broken.jpg", check).as_deref(),
            Some("Cannot read image")
        );
    }
}

#[test]
fn test_perception_failure_routes_to_error() {
    let dir = TempDir::new().unwrap();
    let records = write_images(dir.path(), 2);
    let perception = MockPerception::new().failing("img_000.png");
    let harness = Harness::new();
    let summary = harness.run(perception, records, pool(2));

    assert_eq!(summary.rows, 2);
    assert_eq!(summary.faulted, 0);
    for check in [CheckKind::FaceSize, CheckKind::EyeStatus, CheckKind::Lighting] {
        assert_eq!(
            harness.router.folder_of("img_000.png", check).as_deref(),
            Some("Error"),
            "{check}"
        );
    }
    assert_eq!(
        harness
            .router
            .folder_of("img_001.png", CheckKind::FaceSize)
            .as_deref(),
        Some(labels::face_size::NO_BOX)
    );

    let tables = harness.sink.last().unwrap();
    let row = tables
        .results
        .iter()
        .find(|r| r.image_name == "img_000.png")
        .unwrap();
    assert!(
        row.face_message.starts_with("Error during face detection"),
        "{}",
        row.face_message
    );
}

#[test]
fn test_panicking_image_is_isolated() {
    let dir = TempDir::new().unwrap();
    let records = write_images(dir.path(), 4);
    let perception = MockPerception::new().panicking("img_002.png");
    let harness = Harness::new();
    let summary = harness.run(perception, records, pool(2));

    assert_eq!(summary.rows, 4);
    assert_eq!(summary.faulted, 1);
    assert_eq!(harness.progress.faulted_count(), 1);
    assert_eq!(harness.progress.completed_count(), 3);

    let tables = harness.sink.last().unwrap();
    let row = tables
        .results
        .iter()
        .find(|r| r.image_name == "img_002.png")
        .unwrap();
    assert!(row.face_message.starts_with("Error processing image"));
    assert!(row.head_pose_message.starts_with("Error processing image"));
    for check in CheckKind::ALL {
        assert_eq!(
            harness.router.folder_of("img_002.png", check).as_deref(),
            Some("Error")
        );
    }
}

#[test]
fn test_timeout_abandons_slow_image() {
    let dir = TempDir::new().unwrap();
    let records = write_images(dir.path(), 2);
    let perception = MockPerception::new().sleeping("img_001.png", Duration::from_secs(3));
    let harness = Harness::new();
    let options = RunOptions {
        mode: ExecutionMode::Sequential,
        flush_every: 10,
        image_timeout: Some(Duration::from_millis(200)),
    };
    let summary = harness.run(perception, records, options);

    assert_eq!(summary.rows, 2);
    assert_eq!(summary.timed_out, 1);
    for check in CheckKind::ALL {
        assert_eq!(
            harness.router.folder_of("img_001.png", check).as_deref(),
            Some(check.no_face_label()),
            "{check}"
        );
    }
    let tables = harness.sink.last().unwrap();
    let slow = tables
        .timing_per_image
        .iter()
        .find(|t| t.image_name == "img_001.png")
        .unwrap();
    assert!(slow.total().abs() < f64::EPSILON);
}

#[test]
fn test_router_failure_is_counted() {
    let dir = TempDir::new().unwrap();
    let records = write_images(dir.path(), 3);
    let harness = Harness {
        router: MemoryRouter::failing_on("img_001.png"),
        sink: MemoryReportSink::new(),
        progress: MockProgressSink::new(),
    };
    let summary = harness.run(MockPerception::new(), records, pool(2));

    assert_eq!(summary.rows, 3);
    assert_eq!(summary.write_failures, CheckKind::ALL.len());
    assert_eq!(
        harness.progress.finished_counts(),
        Some((3, CheckKind::ALL.len()))
    );
}

#[test]
fn test_report_failure_is_counted() {
    let dir = TempDir::new().unwrap();
    let records = write_images(dir.path(), 3);
    let harness = Harness {
        router: MemoryRouter::new(),
        sink: MemoryReportSink::failing(),
        progress: MockProgressSink::new(),
    };
    let summary = harness.run(MockPerception::new(), records, RunOptions::default());
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.write_failures, 1);
}

#[test]
fn test_repeated_runs_give_identical_results() {
    let dir = TempDir::new().unwrap();
    let records = write_images(dir.path(), 8);
    let perception = || {
        MockPerception::new()
            .with_face("img_001.png", FaceMeshBuilder::new(WIDTH, HEIGHT).build())
            .with_face(
                "img_004.png",
                FaceMeshBuilder::new(WIDTH, HEIGHT).yaw(-25.0).build(),
            )
    };

    let first = Harness::new();
    first.run(perception(), records.clone(), pool(4));
    let second = Harness::new();
    second.run(perception(), records, sequential());

    assert_eq!(
        first.sink.last().unwrap().results,
        second.sink.last().unwrap().results
    );
}

#[test]
fn test_checks_on_synthetic_faces() {
    let dir = TempDir::new().unwrap();
    let records = write_images(dir.path(), 4);
    let perception = MockPerception::new()
        .with_face("img_000.png", FaceMeshBuilder::new(WIDTH, HEIGHT).build())
        .with_face(
            "img_001.png",
            FaceMeshBuilder::new(WIDTH, HEIGHT).yaw(-25.0).build(),
        )
        .with_face(
            "img_002.png",
            FaceMeshBuilder::new(WIDTH, HEIGHT).eyes(0.05, 0.3).build(),
        )
        .with_face(
            "img_003.png",
            FaceMeshBuilder::new(WIDTH, HEIGHT).forehead_y(0.01).build(),
        );
    let harness = Harness::new();
    harness.run(perception, records, pool(2));
    let router = &harness.router;

    assert_eq!(
        router.folder_of("img_000.png", CheckKind::HeadPose).as_deref(),
        Some(labels::head_pose::FORWARD)
    );
    assert_eq!(
        router.folder_of("img_000.png", CheckKind::EyeStatus).as_deref(),
        Some(labels::eye_status::OPEN)
    );
    assert_eq!(
        router.folder_of("img_000.png", CheckKind::FaceSize).as_deref(),
        Some(labels::face_size::PASS)
    );
    assert_eq!(
        router.folder_of("img_000.png", CheckKind::HeadFully).as_deref(),
        Some(labels::head_fully::VISIBLE)
    );
    assert_eq!(
        router.folder_of("img_001.png", CheckKind::HeadPose).as_deref(),
        Some(labels::head_pose::LEFT)
    );
    assert_eq!(
        router.folder_of("img_002.png", CheckKind::EyeStatus).as_deref(),
        Some(labels::eye_status::CLOSED)
    );
    assert_eq!(
        router.folder_of("img_003.png", CheckKind::HeadFully).as_deref(),
        Some(labels::head_fully::TOP_CUT)
    );
}
