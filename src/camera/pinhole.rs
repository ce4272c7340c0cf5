//! Exact pinhole projector used for forward projection.
//!
//! This module provides the [`PinholeProjector`], a distortion-free pinhole
//! camera placed in the world by a center and a camera-to-world rotation. The
//! adjusted camera builds one per forward projection from the adjusted
//! extrinsics at the queried time.

use crate::camera::{validation, CameraModelError, Intrinsics};
use nalgebra::{Matrix3, Vector2, Vector3};

/// A posed pinhole camera.
///
/// Projection maps a world point `X` to
/// `x = fx * (u . p) / (w . p) + cx`, `y = fy * (v . p) / (w . p) + cy`
/// where `p = R^T (X - C)` is the point in the camera frame and `(u, v, w)` are
/// the coordinate frame axes.
///
/// # Examples
///
/// ```rust
/// use nalgebra::{Matrix3, Vector3};
/// use adjust_camera::camera::pinhole::PinholeProjector;
///
/// let projector = PinholeProjector::new(
///     Vector3::zeros(),
///     Matrix3::identity(),
///     100.0, 100.0,
///     0.0, 0.0,
/// ).unwrap();
///
/// let x = projector.project(&Vector3::new(1.0, 2.0, 10.0)).unwrap();
/// assert!((x.x - 10.0).abs() < 1e-12);
/// assert!((x.y - 20.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct PinholeProjector {
    /// Camera center in world coordinates.
    pub center: Vector3<f64>,
    /// Camera-to-world rotation.
    pub rotation: Matrix3<f64>,
    /// Focal lengths and principal point, in focal-plane units.
    pub intrinsics: Intrinsics,
    u_axis: Vector3<f64>,
    v_axis: Vector3<f64>,
    w_axis: Vector3<f64>,
}

impl PinholeProjector {
    /// Creates a projector with the identity coordinate frame.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::FocalLengthMustBeNonZero`]
    /// * [`CameraModelError::PrincipalPointMustBeFinite`]
    pub fn new(
        center: Vector3<f64>,
        rotation: Matrix3<f64>,
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
    ) -> Result<Self, CameraModelError> {
        let intrinsics = Intrinsics { fx, fy, cx, cy };
        validation::validate_intrinsics(&intrinsics)?;

        Ok(PinholeProjector {
            center,
            rotation,
            intrinsics,
            u_axis: Vector3::x(),
            v_axis: Vector3::y(),
            w_axis: Vector3::z(),
        })
    }

    /// Sets the camera-frame axes read as image x, image y and the optical axis.
    pub fn set_coordinate_frame(&mut self, u: Vector3<f64>, v: Vector3<f64>, w: Vector3<f64>) {
        self.u_axis = u;
        self.v_axis = v;
        self.w_axis = w;
    }

    pub fn coordinate_frame(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        (self.u_axis, self.v_axis, self.w_axis)
    }

    /// Projects a world point to focal-plane coordinates.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::PointAtCameraCenter`]: the point has no depth along
    ///   the optical axis, which includes the camera center itself.
    pub fn project(&self, point: &Vector3<f64>) -> Result<Vector2<f64>, CameraModelError> {
        let p = self.rotation.transpose() * (point - self.center);
        let depth = self.w_axis.dot(&p);
        if depth.abs() < f64::EPSILON.sqrt() {
            return Err(CameraModelError::PointAtCameraCenter);
        }

        let x = self.intrinsics.fx * self.u_axis.dot(&p) / depth + self.intrinsics.cx;
        let y = self.intrinsics.fy * self.v_axis.dot(&p) / depth + self.intrinsics.cy;
        Ok(Vector2::new(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    #[test]
    fn test_projector_rejects_zero_focal() {
        let result = PinholeProjector::new(Vector3::zeros(), Matrix3::identity(), 0.0, 1.0, 0.0, 0.0);
        assert!(matches!(result, Err(CameraModelError::FocalLengthMustBeNonZero)));
    }

    #[test]
    fn test_projector_posed() {
        // Camera at (10, 0, 0) looking back along -X: camera z maps to world -x.
        let camera_to_world =
            Rotation3::from_axis_angle(&Vector3::y_axis(), -std::f64::consts::FRAC_PI_2);
        let projector = PinholeProjector::new(
            Vector3::new(10.0, 0.0, 0.0),
            *camera_to_world.matrix(),
            50.0,
            50.0,
            1.0,
            -1.0,
        )
        .unwrap();

        assert_relative_eq!(
            camera_to_world * Vector3::z(),
            Vector3::new(-1.0, 0.0, 0.0),
            epsilon = 1e-12
        );

        let projected = projector.project(&Vector3::new(0.0, 2.0, 0.0)).unwrap();
        assert_relative_eq!(projected.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(projected.y, 50.0 * 2.0 / 10.0 - 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_projector_center_is_degenerate() {
        let center = Vector3::new(3.0, 4.0, 5.0);
        let projector =
            PinholeProjector::new(center, Matrix3::identity(), 10.0, 10.0, 0.0, 0.0).unwrap();
        assert!(matches!(
            projector.project(&center),
            Err(CameraModelError::PointAtCameraCenter)
        ));
    }

    #[test]
    fn test_projector_coordinate_frame_swap() {
        let mut projector =
            PinholeProjector::new(Vector3::zeros(), Matrix3::identity(), 10.0, 10.0, 0.0, 0.0)
                .unwrap();
        assert_eq!(
            projector.coordinate_frame(),
            (Vector3::x(), Vector3::y(), Vector3::z())
        );
        projector.set_coordinate_frame(Vector3::y(), Vector3::x(), Vector3::z());
        assert_eq!(
            projector.coordinate_frame(),
            (Vector3::y(), Vector3::x(), Vector3::z())
        );

        let projected = projector.project(&Vector3::new(1.0, 3.0, 2.0)).unwrap();
        assert_relative_eq!(projected.x, 15.0, epsilon = 1e-12);
        assert_relative_eq!(projected.y, 5.0, epsilon = 1e-12);
    }
}
