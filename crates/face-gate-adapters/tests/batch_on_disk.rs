//! Integration tests running a batch against real files on disk.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::sync::Arc;

use face_gate_adapters::{FsImageSource, FsOutcomeRouter, JsonReportWriter, SidecarPerception};
use face_gate_core::checks::CheckOptions;
use face_gate_core::domain::BoundingBox;
use face_gate_core::{BatchRunner, CheckKind, ExecutionMode, ImageWorker, RunOptions, Thresholds};
use face_gate_test_support::{
    write_sidecar, FaceMeshBuilder, MockProgressSink, SyntheticImageBuilder,
};
use tempfile::TempDir;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

fn portrait() -> face_gate_core::ImageInfo {
    let face = BoundingBox::new(250, 110, 140, 270);
    SyntheticImageBuilder::portrait(WIDTH, HEIGHT, &face, 150, 140)
}

/// Input tree: a frontal face, closed eyes in a subfolder, no face, and an
/// undecodable file.
fn create_input() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path();

    SyntheticImageBuilder::write(input, "frontal.png", &portrait()).unwrap();
    write_sidecar(
        input,
        "frontal.png",
        &[FaceMeshBuilder::new(WIDTH, HEIGHT).build()],
    )
    .unwrap();

    std::fs::create_dir_all(input.join("session2")).unwrap();
    let session = input.join("session2");
    SyntheticImageBuilder::write(&session, "closed.jpg", &portrait()).unwrap();
    write_sidecar(
        &session,
        "closed.jpg",
        &[FaceMeshBuilder::new(WIDTH, HEIGHT).eyes(0.05, 0.05).build()],
    )
    .unwrap();

    SyntheticImageBuilder::write(input, "noface.png", &portrait()).unwrap();
    std::fs::write(input.join("broken.jpg"), b"definitely not a jpeg").unwrap();
    dir
}

fn run(input: &Path, output: &Path) -> face_gate_core::RunSummary {
    let worker = ImageWorker::with_thresholds(
        Arc::new(SidecarPerception::new()),
        &Thresholds::default(),
        CheckOptions::default(),
    );
    let runner = BatchRunner::new(
        Arc::new(worker),
        RunOptions {
            mode: ExecutionMode::Pool { workers: 2 },
            flush_every: 2,
            image_timeout: None,
        },
    );
    runner
        .run(
            &FsImageSource::new(input).excluding(output),
            &FsOutcomeRouter::new(output),
            &JsonReportWriter::new(output),
            &MockProgressSink::new(),
        )
        .expect("run should succeed")
}

fn routed(output: &Path, check: CheckKind, file: &str) -> Vec<String> {
    check
        .labels()
        .iter()
        .filter(|label| output.join(check.name()).join(label).join(file).is_file())
        .map(ToString::to_string)
        .collect()
}

#[test]
fn test_routes_every_image_once_per_check() {
    let input = create_input();
    let output = input.path().join("out");
    let summary = run(input.path(), &output);

    assert_eq!(summary.images, 4);
    assert_eq!(summary.rows, 4);
    assert_eq!(summary.write_failures, 0);

    for file in ["frontal.png", "closed.jpg", "noface.png", "broken.jpg"] {
        for check in CheckKind::ALL {
            let folders = routed(&output, check, file);
            assert_eq!(folders.len(), 1, "{file} in {check}: {folders:?}");
        }
    }
}

#[test]
fn test_outcome_folders() {
    let input = create_input();
    let output = input.path().join("out");
    run(input.path(), &output);

    assert_eq!(
        routed(&output, CheckKind::EyeStatus, "frontal.png"),
        ["Both eyes are open"]
    );
    assert_eq!(
        routed(&output, CheckKind::EyeStatus, "closed.jpg"),
        ["One or both eyes are closed"]
    );
    assert_eq!(
        routed(&output, CheckKind::FaceSize, "frontal.png"),
        ["The face size passes the specified criteria."]
    );
    assert_eq!(
        routed(&output, CheckKind::HeadPose, "frontal.png"),
        ["Forward"]
    );
    assert_eq!(
        routed(&output, CheckKind::HeadFully, "frontal.png"),
        ["Head is fully visible"]
    );
    assert_eq!(
        routed(&output, CheckKind::FaceSize, "noface.png"),
        ["No bounding box provided"]
    );
    assert_eq!(
        routed(&output, CheckKind::Lighting, "noface.png"),
        ["no_face"]
    );
    for check in CheckKind::ALL {
        assert_eq!(
            routed(&output, check, "broken.jpg"),
            ["Cannot read image"],
            "{check}"
        );
    }
}

#[test]
fn test_report_rows_sorted_by_path() {
    let input = create_input();
    let output = input.path().join("out");
    run(input.path(), &output);

    let content = std::fs::read_to_string(output.join("results.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&content).unwrap();
    let names: Vec<&str> = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["image_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["broken.jpg", "frontal.png", "noface.png", "closed.jpg"]);
    assert_eq!(report["timing_per_image"].as_array().unwrap().len(), 4);
    assert_eq!(report["timing_summary"].as_array().unwrap().len(), 8);
}

#[test]
fn test_rerun_produces_identical_results() {
    let input = create_input();
    let outputs = tempfile::tempdir().unwrap();
    let first_out = outputs.path().join("first");
    let second_out = outputs.path().join("second");
    run(input.path(), &first_out);
    run(input.path(), &second_out);

    let read = |dir: &Path| {
        let content = std::fs::read_to_string(dir.join("results.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        value["results"].clone()
    };
    assert_eq!(read(&first_out), read(&second_out));
}

#[test]
fn test_output_inside_input_is_not_rescanned() {
    let input = create_input();
    let output = input.path().join("out");
    run(input.path(), &output);
    let summary = run(input.path(), &output);
    assert_eq!(summary.images, 4);
}
