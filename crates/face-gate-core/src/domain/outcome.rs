//! Check identities, the label table, and tagged check outcomes.

use std::fmt;

/// Label shared by every check when the source image cannot be decoded.
pub const CANNOT_READ: &str = "Cannot read image";

/// Folder that receives images whose check faulted.
pub const ERROR_FOLDER: &str = "Error";

/// Output labels for each check.
///
/// Folder pre-creation and outcome construction both read these tables, so a
/// label cannot exist without its folder.
pub mod labels {
    use super::{CANNOT_READ, ERROR_FOLDER};

    /// Landmark stage messages. Not routed.
    pub mod landmarks {
        pub const DETECTED: &str = "Face detected successfully";
        pub const NO_FACE: &str = "No faces detected";
    }

    pub mod face_size {
        use super::{CANNOT_READ, ERROR_FOLDER};

        pub const PASS: &str = "The face size passes the specified criteria.";
        pub const FAIL: &str = "The face size does not meet the specified criteria.";
        pub const NO_BOX: &str = "No bounding box provided";

        pub const ALL: &[&str] = &[PASS, FAIL, NO_BOX, CANNOT_READ, ERROR_FOLDER];
    }

    pub mod eye_status {
        use super::{CANNOT_READ, ERROR_FOLDER};

        pub const OPEN: &str = "Both eyes are open";
        pub const CLOSED: &str = "One or both eyes are closed";
        pub const NO_FACE: &str = super::landmarks::NO_FACE;

        pub const ALL: &[&str] = &[OPEN, CLOSED, NO_FACE, CANNOT_READ, ERROR_FOLDER];
    }

    pub mod lighting {
        use super::{CANNOT_READ, ERROR_FOLDER};

        pub const NORMAL: &str = "normal";
        pub const TOO_DARK: &str = "too_dark";
        pub const TOO_BRIGHT: &str = "too_bright";
        pub const BACKLIGHT: &str = "backlight";
        pub const NO_FACE: &str = "no_face";
        pub const INVALID_CROP: &str = "invalid_face_crop";

        pub const ALL: &[&str] = &[
            NORMAL,
            TOO_DARK,
            TOO_BRIGHT,
            BACKLIGHT,
            NO_FACE,
            INVALID_CROP,
            CANNOT_READ,
            ERROR_FOLDER,
        ];
    }

    pub mod blur {
        use super::{CANNOT_READ, ERROR_FOLDER};

        pub const BLURRY: &str = "Image is blurry";
        pub const SHARP: &str = "Image isn't blurry";
        pub const NO_FACE: &str = "No face detected";
        pub const INVALID_THRESHOLD: &str = "Invalid blur threshold";
        pub const INVALID_REGION: &str = "Invalid face region";

        pub const ALL: &[&str] = &[
            BLURRY,
            SHARP,
            NO_FACE,
            INVALID_THRESHOLD,
            INVALID_REGION,
            CANNOT_READ,
            ERROR_FOLDER,
        ];
    }

    pub mod head_fully {
        use super::{CANNOT_READ, ERROR_FOLDER};

        pub const BOTH_CUT: &str = "Top of head and chin might be cut";
        pub const TOP_CUT: &str = "Top of head might be cut";
        pub const CHIN_CUT: &str = "Chin might be cut";
        pub const VISIBLE: &str = "Head is fully visible";
        pub const NO_FACE: &str = "No face detected";

        pub const ALL: &[&str] = &[
            BOTH_CUT,
            TOP_CUT,
            CHIN_CUT,
            VISIBLE,
            NO_FACE,
            CANNOT_READ,
            ERROR_FOLDER,
        ];
    }

    pub mod head_pose {
        use super::{CANNOT_READ, ERROR_FOLDER};

        pub const LEFT: &str = "Looking Left";
        pub const RIGHT: &str = "Looking Right";
        pub const DOWN: &str = "Looking Down";
        pub const UP: &str = "Looking Up";
        pub const TILT_LEFT: &str = "Tilting Left";
        pub const TILT_RIGHT: &str = "Tilting Right";
        pub const FORWARD: &str = "Forward";
        pub const NO_FACE: &str = "No face detected";
        pub const SOLVE_FAILED: &str = "Pose estimation failed";

        pub const ALL: &[&str] = &[
            LEFT,
            RIGHT,
            DOWN,
            UP,
            TILT_LEFT,
            TILT_RIGHT,
            FORWARD,
            NO_FACE,
            SOLVE_FAILED,
            CANNOT_READ,
            ERROR_FOLDER,
        ];
    }
}

/// A timed stage of the per-image pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Landmarks,
    FaceSize,
    EyeStatus,
    Lighting,
    Blur,
    HeadFully,
    HeadPose,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Self; 7] = [
        Self::Landmarks,
        Self::FaceSize,
        Self::EyeStatus,
        Self::Lighting,
        Self::Blur,
        Self::HeadFully,
        Self::HeadPose,
    ];

    /// Stage name used for timing columns and summary rows.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Landmarks => "landmarks",
            Self::FaceSize => "face_size",
            Self::EyeStatus => "eye_status",
            Self::Lighting => "lighting",
            Self::Blur => "blur",
            Self::HeadFully => "head_fully",
            Self::HeadPose => "head_pose",
        }
    }

    /// Position in [`Stage::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the six routed checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    FaceSize,
    EyeStatus,
    Lighting,
    Blur,
    HeadFully,
    HeadPose,
}

impl CheckKind {
    /// All checks in execution order.
    pub const ALL: [Self; 6] = [
        Self::FaceSize,
        Self::EyeStatus,
        Self::Lighting,
        Self::Blur,
        Self::HeadFully,
        Self::HeadPose,
    ];

    /// Output folder name for this check.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.stage().name()
    }

    /// The timed stage this check runs in.
    #[must_use]
    pub const fn stage(self) -> Stage {
        match self {
            Self::FaceSize => Stage::FaceSize,
            Self::EyeStatus => Stage::EyeStatus,
            Self::Lighting => Stage::Lighting,
            Self::Blur => Stage::Blur,
            Self::HeadFully => Stage::HeadFully,
            Self::HeadPose => Stage::HeadPose,
        }
    }

    /// Every label this check can emit, `Error` included.
    #[must_use]
    pub const fn labels(self) -> &'static [&'static str] {
        match self {
            Self::FaceSize => labels::face_size::ALL,
            Self::EyeStatus => labels::eye_status::ALL,
            Self::Lighting => labels::lighting::ALL,
            Self::Blur => labels::blur::ALL,
            Self::HeadFully => labels::head_fully::ALL,
            Self::HeadPose => labels::head_pose::ALL,
        }
    }

    /// Label used when perception found no face for this check.
    #[must_use]
    pub const fn no_face_label(self) -> &'static str {
        match self {
            Self::FaceSize => labels::face_size::NO_BOX,
            Self::EyeStatus => labels::eye_status::NO_FACE,
            Self::Lighting => labels::lighting::NO_FACE,
            Self::Blur => labels::blur::NO_FACE,
            Self::HeadFully => labels::head_fully::NO_FACE,
            Self::HeadPose => labels::head_pose::NO_FACE,
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one check on one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The check reached a verdict.
    Assessed {
        passed: bool,
        label: &'static str,
    },
    /// Perception found no face or landmarks.
    DetectionAbsent { label: &'static str },
    /// The input could not be assessed (unreadable, degenerate crop, solver failure).
    Unusable { label: &'static str },
    /// Internal fault. The description is the report message.
    Fault { description: String },
}

impl CheckOutcome {
    #[must_use]
    pub const fn pass(label: &'static str) -> Self {
        Self::Assessed {
            passed: true,
            label,
        }
    }

    #[must_use]
    pub const fn fail(label: &'static str) -> Self {
        Self::Assessed {
            passed: false,
            label,
        }
    }

    /// Builds a fault outcome, prefixing the description with `Error`.
    #[must_use]
    pub fn fault(context: &str, error: &anyhow::Error) -> Self {
        Self::Fault {
            description: format!("Error {context}: {error:#}"),
        }
    }

    /// Tri-state pass flag. Faults carry no verdict.
    #[must_use]
    pub const fn passed(&self) -> Option<bool> {
        match self {
            Self::Assessed { passed, .. } => Some(*passed),
            Self::DetectionAbsent { .. } | Self::Unusable { .. } => Some(false),
            Self::Fault { .. } => None,
        }
    }

    /// Folder this outcome is routed to.
    #[must_use]
    pub const fn folder(&self) -> &'static str {
        match self {
            Self::Assessed { label, .. }
            | Self::DetectionAbsent { label }
            | Self::Unusable { label } => *label,
            Self::Fault { .. } => ERROR_FOLDER,
        }
    }

    /// Message written to the results table.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Fault { description } => description,
            other => other.folder(),
        }
    }

    #[must_use]
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Fault { .. })
    }
}
