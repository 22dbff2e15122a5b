//! Configuration file support for face-gate.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/face-gate/config.toml` (lowest priority)
//! - Project-local: `.face-gate.toml` (searched up directory tree)
//! - An explicit `--config FILE`
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use face_gate_core::Thresholds;
use serde::Deserialize;
use tracing::{debug, info};

/// Project-local config file name.
pub const PROJECT_CONFIG: &str = ".face-gate.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Check thresholds. Every field must be set by some layer.
    pub threshold: ThresholdConfig,
    /// Scheduling settings.
    pub run: RunConfig,
    /// Output settings.
    pub output: OutputConfig,
    /// Landmark source settings.
    pub perception: PerceptionConfig,
    /// Blur check settings.
    pub blur: BlurConfig,
}

/// Threshold values as read from one file; merged field by field.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub face_size: Option<f64>,
    #[serde(rename = "EAR_THRESHOLD")]
    pub ear_threshold: Option<f64>,
    pub dark_threshold: Option<f64>,
    pub bright_threshold: Option<f64>,
    pub diff_threshold: Option<f64>,
    pub margin: Option<f64>,
    pub blur: Option<f64>,
    pub left_th: Option<f64>,
    pub right_th: Option<f64>,
    pub down_th: Option<f64>,
    pub up_th: Option<f64>,
    pub til_left_th: Option<f64>,
    pub til_right_th: Option<f64>,
}

/// Scheduling configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Worker pool size.
    pub workers: Option<usize>,
    /// Process images one at a time on the main thread.
    pub sequential: Option<bool>,
    /// Write the report after this many images (0 = only at the end).
    pub flush_every: Option<usize>,
    /// Abandon an image after this many seconds.
    pub image_timeout_secs: Option<f64>,
}

/// Output configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output root directory.
    pub dir: Option<PathBuf>,
    /// Show progress bar.
    pub progress: Option<bool>,
}

/// Perception configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Directory holding landmark sidecar files.
    pub landmarks_dir: Option<PathBuf>,
}

/// Blur check configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct BlurConfig {
    /// Measure sharpness on the detected face instead of the whole image.
    pub face_region: Option<bool>,
}

impl ThresholdConfig {
    /// Builds the final thresholds once all layers are merged.
    ///
    /// # Errors
    ///
    /// Lists every missing field, or reports the first invalid value.
    pub fn resolve(&self) -> Result<Thresholds, String> {
        let fields = [
            ("face_size", self.face_size),
            ("EAR_THRESHOLD", self.ear_threshold),
            ("dark_threshold", self.dark_threshold),
            ("bright_threshold", self.bright_threshold),
            ("diff_threshold", self.diff_threshold),
            ("margin", self.margin),
            ("blur", self.blur),
            ("left_th", self.left_th),
            ("right_th", self.right_th),
            ("down_th", self.down_th),
            ("up_th", self.up_th),
            ("til_left_th", self.til_left_th),
            ("til_right_th", self.til_right_th),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "Missing threshold settings: {}. Set them in the [threshold] section of a config file.",
                missing.join(", ")
            ));
        }

        let get = |value: Option<f64>| value.unwrap_or_default();
        let thresholds = Thresholds {
            face_size: get(self.face_size),
            ear_threshold: get(self.ear_threshold),
            dark_threshold: get(self.dark_threshold),
            bright_threshold: get(self.bright_threshold),
            diff_threshold: get(self.diff_threshold),
            margin: get(self.margin),
            blur: get(self.blur),
            left_th: get(self.left_th),
            right_th: get(self.right_th),
            down_th: get(self.down_th),
            up_th: get(self.up_th),
            til_left_th: get(self.til_left_th),
            til_right_th: get(self.til_right_th),
        };
        thresholds.validate()?;
        Ok(thresholds)
    }

    fn merge(&mut self, other: Self) {
        self.face_size = other.face_size.or(self.face_size);
        self.ear_threshold = other.ear_threshold.or(self.ear_threshold);
        self.dark_threshold = other.dark_threshold.or(self.dark_threshold);
        self.bright_threshold = other.bright_threshold.or(self.bright_threshold);
        self.diff_threshold = other.diff_threshold.or(self.diff_threshold);
        self.margin = other.margin.or(self.margin);
        self.blur = other.blur.or(self.blur);
        self.left_th = other.left_th.or(self.left_th);
        self.right_th = other.right_th.or(self.right_th);
        self.down_th = other.down_th.or(self.down_th);
        self.up_th = other.up_th.or(self.up_th);
        self.til_left_th = other.til_left_th.or(self.til_left_th);
        self.til_right_th = other.til_right_th.or(self.til_right_th);
    }
}

impl AppConfig {
    /// Load configuration from XDG, project-local and explicit files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/face-gate/config.toml`
    /// 2. Project-local: `.face-gate.toml` (searched up from cwd)
    /// 3. `explicit`, when given
    ///
    /// Missing discovered files are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if any file that exists cannot be read or parsed, or
    /// if `explicit` does not exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                config.merge(load_file(&xdg_path)?);
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            config.merge(load_file(&project_path)?);
        }

        if let Some(path) = explicit {
            info!("Loading config: {}", path.display());
            config.merge(load_file(path)?);
        }

        Ok(config)
    }

    /// Validate non-threshold values. Thresholds are checked by
    /// [`ThresholdConfig::resolve`].
    pub fn validate(&self) -> Result<(), String> {
        if self.run.workers == Some(0) {
            return Err("run.workers must be at least 1".to_string());
        }
        if let Some(secs) = self.run.image_timeout_secs {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(format!(
                    "run.image_timeout_secs must be a positive number, got {secs}"
                ));
            }
        }
        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    pub fn merge(&mut self, other: Self) {
        self.threshold.merge(other.threshold);

        self.run.workers = other.run.workers.or(self.run.workers);
        self.run.sequential = other.run.sequential.or(self.run.sequential);
        self.run.flush_every = other.run.flush_every.or(self.run.flush_every);
        self.run.image_timeout_secs = other
            .run
            .image_timeout_secs
            .or(self.run.image_timeout_secs);

        self.output.dir = other.output.dir.or_else(|| self.output.dir.take());
        self.output.progress = other.output.progress.or(self.output.progress);

        self.perception.landmarks_dir = other
            .perception
            .landmarks_dir
            .or_else(|| self.perception.landmarks_dir.take());

        self.blur.face_region = other.blur.face_region.or(self.blur.face_region);
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("face-gate").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.face-gate.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(PROJECT_CONFIG);
        if config_path.is_file() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}
