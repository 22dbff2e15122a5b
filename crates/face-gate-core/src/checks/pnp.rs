//! Perspective-n-point pose estimation for the head pose check.
//!
//! Levenberg-Marquardt over a rotation vector and translation, minimizing the
//! squared reprojection error of a canonical face model through a pinhole
//! camera without distortion.

use nalgebra::{DMatrix, DVector, Matrix3, Rotation3, Vector2, Vector3};

/// Canonical face model in millimetres, camera convention (x right, y down,
/// z away from the camera), keyed by mesh index. The nose tip is the origin.
pub const FACE_MODEL: [(usize, [f64; 3]); 6] = [
    (33, [-225.0, -170.0, 135.0]),
    (263, [225.0, -170.0, 135.0]),
    (1, [0.0, 0.0, 0.0]),
    (61, [-150.0, 150.0, 125.0]),
    (291, [150.0, 150.0, 125.0]),
    (199, [0.0, 330.0, 65.0]),
];

/// Model distance between the outer eye corners.
const MODEL_EYE_SPAN: f64 = 450.0;

const MAX_ITERATIONS: usize = 200;
const MIN_DEPTH: f64 = 1e-6;

/// Pinhole camera with square pixels and no distortion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    pub focal: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraModel {
    /// Focal length equal to the image width, principal point at the centre.
    #[must_use]
    pub fn for_image(width: u32, height: u32) -> Self {
        let w = f64::from(width);
        Self {
            focal: w,
            cx: w / 2.0,
            cy: f64::from(height) / 2.0,
        }
    }

    /// Projects a camera-space point. `None` if it is not in front of the camera.
    #[must_use]
    pub fn project(&self, point: &Vector3<f64>) -> Option<Vector2<f64>> {
        if point.z <= MIN_DEPTH {
            return None;
        }
        Some(Vector2::new(
            self.focal * point.x / point.z + self.cx,
            self.focal * point.y / point.z + self.cy,
        ))
    }
}

/// Estimated object pose.
#[derive(Debug, Clone, PartialEq)]
pub struct PnpSolution {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
    /// Root mean square reprojection error in pixels.
    pub rms_error: f64,
}

fn pose_from(params: &DVector<f64>) -> (Rotation3<f64>, Vector3<f64>) {
    let rotation = Rotation3::new(Vector3::new(params[0], params[1], params[2]));
    (rotation, Vector3::new(params[3], params[4], params[5]))
}

fn residuals(
    params: &DVector<f64>,
    object: &[Vector3<f64>],
    image: &[Vector2<f64>],
    camera: &CameraModel,
) -> Option<DVector<f64>> {
    let (rotation, translation) = pose_from(params);
    let mut r = DVector::zeros(object.len() * 2);
    for (i, (p, observed)) in object.iter().zip(image).enumerate() {
        let projected = camera.project(&(rotation * p + translation))?;
        let d = projected - observed;
        r[2 * i] = d.x;
        r[2 * i + 1] = d.y;
    }
    Some(r)
}

fn jacobian(
    params: &DVector<f64>,
    object: &[Vector3<f64>],
    image: &[Vector2<f64>],
    camera: &CameraModel,
) -> Option<DMatrix<f64>> {
    let mut jac = DMatrix::zeros(object.len() * 2, params.len());
    for j in 0..params.len() {
        let step = 1e-6 * params[j].abs().max(1.0);
        let mut forward = params.clone();
        forward[j] += step;
        let mut backward = params.clone();
        backward[j] -= step;
        let column = (residuals(&forward, object, image, camera)?
            - residuals(&backward, object, image, camera)?)
            / (2.0 * step);
        jac.set_column(j, &column);
    }
    Some(jac)
}

/// Initial guess: frontal face, depth from the eye span, centred on the nose.
fn initial_guess(image: &[Vector2<f64>], camera: &CameraModel) -> Option<DVector<f64>> {
    let eye_span = (image[1] - image[0]).norm();
    if eye_span < 1.0 {
        return None;
    }
    let tz = camera.focal * MODEL_EYE_SPAN / eye_span;
    let nose = image[2];
    Some(DVector::from_vec(vec![
        0.0,
        0.0,
        0.0,
        (nose.x - camera.cx) * tz / camera.focal,
        (nose.y - camera.cy) * tz / camera.focal,
        tz,
    ]))
}

/// Solves for the pose mapping `object` onto `image`.
///
/// Points must follow [`FACE_MODEL`] order. Returns `None` when there are too
/// few points, the eyes coincide, or the solver diverges.
#[must_use]
pub fn solve_pnp(
    object: &[Vector3<f64>],
    image: &[Vector2<f64>],
    camera: &CameraModel,
) -> Option<PnpSolution> {
    if object.len() != image.len() || object.len() < FACE_MODEL.len() {
        return None;
    }
    let mut params = initial_guess(image, camera)?;
    let mut r = residuals(&params, object, image, camera)?;
    let mut cost = r.norm_squared();
    let mut lambda = 1e-3;

    for _ in 0..MAX_ITERATIONS {
        let jac = jacobian(&params, object, image, camera)?;
        let jtj = jac.transpose() * &jac;
        let gradient = jac.transpose() * &r;

        let mut damped = jtj.clone();
        for i in 0..damped.nrows() {
            damped[(i, i)] += lambda * jtj[(i, i)].max(1e-9);
        }
        let Some(cholesky) = damped.cholesky() else {
            lambda *= 10.0;
            continue;
        };
        let delta = cholesky.solve(&(-gradient));
        let candidate = &params + &delta;

        match residuals(&candidate, object, image, camera) {
            Some(candidate_r) if candidate_r.norm_squared() < cost => {
                let improvement = cost - candidate_r.norm_squared();
                params = candidate;
                r = candidate_r;
                cost = r.norm_squared();
                lambda = (lambda * 0.1).max(1e-12);
                if improvement < 1e-12 * cost.max(1e-12) || delta.norm() < 1e-12 {
                    break;
                }
            }
            _ => {
                lambda *= 10.0;
                if lambda > 1e12 {
                    break;
                }
            }
        }
    }

    let (rotation, translation) = pose_from(&params);
    #[allow(clippy::cast_precision_loss)]
    let rms_error = (cost / object.len() as f64).sqrt();
    rms_error.is_finite().then_some(PnpSolution {
        rotation,
        translation,
        rms_error,
    })
}

/// Decomposes `R = Rx(pitch) * Ry(yaw) * Rz(roll)`, returning radians as
/// `(pitch, yaw, roll)`.
#[must_use]
pub fn rotation_to_euler(rotation: &Matrix3<f64>) -> (f64, f64, f64) {
    let m = rotation;
    let sin_yaw = m[(0, 2)].clamp(-1.0, 1.0);
    let yaw = sin_yaw.asin();
    if sin_yaw.abs() > 1.0 - 1e-9 {
        // gimbal lock: roll folds into pitch
        return (m[(2, 1)].atan2(m[(1, 1)]), yaw, 0.0);
    }
    let pitch = (-m[(1, 2)]).atan2(m[(2, 2)]);
    let roll = (-m[(0, 1)]).atan2(m[(0, 0)]);
    (pitch, yaw, roll)
}

/// Builds `Rx(pitch) * Ry(yaw) * Rz(roll)` from radians.
#[must_use]
pub fn euler_to_rotation(pitch: f64, yaw: f64, roll: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), pitch)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), yaw)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), roll)
}

/// Model points in [`FACE_MODEL`] order.
#[must_use]
pub fn model_points() -> Vec<Vector3<f64>> {
    FACE_MODEL
        .iter()
        .map(|(_, [x, y, z])| Vector3::new(*x, *y, *z))
        .collect()
}
