//! Numeric thresholds shared by the checks.

use serde::{Deserialize, Serialize};

/// Thresholds read once at startup and shared read-only by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum face box side in pixels (exclusive).
    pub face_size: f64,
    /// Eye aspect ratio above which an eye counts as open.
    #[serde(rename = "EAR_THRESHOLD")]
    pub ear_threshold: f64,
    /// Mean face brightness below this is too dark.
    pub dark_threshold: f64,
    /// Mean face brightness above this is too bright.
    pub bright_threshold: f64,
    /// Face/background brightness gap above this is backlit.
    pub diff_threshold: f64,
    /// Fraction trimmed from each side of the face box before measuring.
    pub margin: f64,
    /// Laplacian variance below this is blurry.
    pub blur: f64,
    pub left_th: f64,
    pub right_th: f64,
    pub down_th: f64,
    pub up_th: f64,
    pub til_left_th: f64,
    pub til_right_th: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            face_size: 100.0,
            ear_threshold: 0.2,
            dark_threshold: 60.0,
            bright_threshold: 200.0,
            diff_threshold: 50.0,
            margin: 0.1,
            blur: 100.0,
            left_th: -15.0,
            right_th: 15.0,
            down_th: -15.0,
            up_th: 15.0,
            til_left_th: -15.0,
            til_right_th: 15.0,
        }
    }
}

impl Thresholds {
    /// Checks that the thresholds describe a coherent configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first offending field.
    pub fn validate(&self) -> Result<(), String> {
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
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("threshold.{name} must be a finite number, got {value}"));
        }
        if self.face_size < 0.0 {
            return Err(format!(
                "threshold.face_size must be non-negative, got {}",
                self.face_size
            ));
        }
        if !(0.0..0.5).contains(&self.margin) {
            return Err(format!(
                "threshold.margin must be in [0.0, 0.5), got {}",
                self.margin
            ));
        }
        let ordered = [
            ("dark_threshold", self.dark_threshold, "bright_threshold", self.bright_threshold),
            ("left_th", self.left_th, "right_th", self.right_th),
            ("down_th", self.down_th, "up_th", self.up_th),
            ("til_left_th", self.til_left_th, "til_right_th", self.til_right_th),
        ];
        for (low_name, low, high_name, high) in ordered {
            if low > high {
                return Err(format!(
                    "threshold.{low_name} ({low}) must not exceed threshold.{high_name} ({high})"
                ));
            }
        }
        Ok(())
    }
}
