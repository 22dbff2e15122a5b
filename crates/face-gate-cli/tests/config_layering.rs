//! Integration tests for configuration layering.
//!
//! Tests the full priority chain: hardcoded defaults < XDG config < project
//! config < `--config` file < CLI args

#![allow(clippy::unwrap_used)] // Test code uses unwrap for brevity
#![allow(deprecated)] // cargo_bin deprecation warning

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use face_gate_test_support::SyntheticImageBuilder;
use predicates::prelude::*;

const THRESHOLDS: &str = r"
[threshold]
face_size = 100
EAR_THRESHOLD = 0.2
dark_threshold = 60
bright_threshold = 200
diff_threshold = 50
margin = 0.1
blur = 100
left_th = -15
right_th = 15
down_th = -15
up_th = 15
til_left_th = -15
til_right_th = 15
";

fn face_gate(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("face-gate").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.join("xdg"))
        .current_dir(home);
    cmd
}

/// Home with a `photos/sharp.png` checkerboard.
fn home_with_photo() -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    let input = home.path().join("photos");
    fs::create_dir(&input).unwrap();
    let sharp = SyntheticImageBuilder::checkerboard(128, 128);
    SyntheticImageBuilder::write(&input, "sharp.png", &sharp).unwrap();
    home
}

fn blur_message(output_root: &Path) -> String {
    let content = fs::read_to_string(output_root.join("results.json")).unwrap();
    let report: serde_json::Value = serde_json::from_str(&content).unwrap();
    report["results"][0]["blur_message"]
        .as_str()
        .unwrap()
        .to_string()
}

#[test]
fn test_xdg_config_supplies_thresholds() {
    let home = home_with_photo();
    let xdg = home.path().join("xdg").join("face-gate");
    fs::create_dir_all(&xdg).unwrap();
    fs::write(xdg.join("config.toml"), THRESHOLDS).unwrap();

    face_gate(home.path()).arg("photos").assert().code(0);
    assert_eq!(
        blur_message(&home.path().join("photos/output")),
        "Image isn't blurry"
    );
}

#[test]
fn test_project_config_overrides_xdg() {
    let home = home_with_photo();
    let xdg = home.path().join("xdg").join("face-gate");
    fs::create_dir_all(&xdg).unwrap();
    fs::write(xdg.join("config.toml"), THRESHOLDS).unwrap();
    // only one threshold in the project file; the rest come from XDG
    fs::write(
        home.path().join(".face-gate.toml"),
        "[threshold]\nblur = 1e12\n",
    )
    .unwrap();

    face_gate(home.path()).arg("photos").assert().code(0);
    assert_eq!(
        blur_message(&home.path().join("photos/output")),
        "Image is blurry"
    );
}

#[test]
fn test_explicit_config_overrides_project() {
    let home = home_with_photo();
    fs::write(
        home.path().join(".face-gate.toml"),
        format!("{THRESHOLDS}\n[output]\ndir = 'sorted'\n"),
    )
    .unwrap();
    let explicit = home.path().join("strict.toml");
    fs::write(&explicit, "[threshold]\nblur = 1e12\n").unwrap();

    face_gate(home.path())
        .arg("photos")
        .arg("--config")
        .arg(&explicit)
        .assert()
        .code(0);

    // project output dir still applies
    assert_eq!(blur_message(&home.path().join("sorted")), "Image is blurry");
}

#[test]
fn test_cli_output_overrides_config() {
    let home = home_with_photo();
    fs::write(
        home.path().join(".face-gate.toml"),
        format!("{THRESHOLDS}\n[output]\ndir = 'sorted'\n"),
    )
    .unwrap();

    face_gate(home.path())
        .args(["photos", "-o", "elsewhere"])
        .assert()
        .code(0);
    assert!(home.path().join("elsewhere/results.json").is_file());
    assert!(!home.path().join("sorted").exists());
}

#[test]
fn test_missing_explicit_config_is_setup_error() {
    let home = home_with_photo();
    fs::write(home.path().join(".face-gate.toml"), THRESHOLDS).unwrap();

    face_gate(home.path())
        .args(["photos", "--config", "absent.toml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn test_malformed_project_config_is_setup_error() {
    let home = home_with_photo();
    fs::write(home.path().join(".face-gate.toml"), "[threshold\nblur = ").unwrap();

    face_gate(home.path())
        .arg("photos")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to parse config file"));
    assert!(!home.path().join("photos/output").exists());
}

#[test]
fn test_inverted_threshold_range_is_setup_error() {
    let home = home_with_photo();
    let toml = THRESHOLDS.replace("dark_threshold = 60", "dark_threshold = 250");
    fs::write(home.path().join(".face-gate.toml"), toml).unwrap();

    face_gate(home.path())
        .arg("photos")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("dark_threshold"));
}

#[test]
fn test_invalid_run_section_is_setup_error() {
    let home = home_with_photo();
    fs::write(
        home.path().join(".face-gate.toml"),
        format!("{THRESHOLDS}\n[run]\nworkers = 0\n"),
    )
    .unwrap();

    face_gate(home.path())
        .arg("photos")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("run.workers"));
}
