//! Camera model adjusted by continuous position and orientation corrections.
//!
//! [`AdjustedCameraModel`] wraps an exact [`UnadjustedCamera`] and perturbs its
//! trajectory with a [`VectorEquation`] added to the instrument position and a
//! [`QuaternionEquation`] added to the instrument orientation. All optics
//! (focal length, distortion, frame chains) come from the unadjusted camera.
//!
//! Every conversion passes through the focal-plane-time triple [`FocalTime`]:
//! a pixel is first resolved to undistorted focal-plane millimeters and the
//! ephemeris time it was imaged at, and the triple then drives the center,
//! pose, ray and forward-projection queries.
//!
//! The model is single-writer: the unadjusted camera's cursor lives in a
//! `RefCell`, so a model is not `Sync` and must not be shared across threads.
//!
//! [`VectorEquation`]: crate::equation::VectorEquation
//! [`QuaternionEquation`]: crate::equation::QuaternionEquation

use log::{debug, warn};
use nalgebra::{Quaternion, Vector2, Vector3};
use std::cell::RefCell;

use crate::camera::cache::TimeCache;
use crate::camera::{
    CameraModel, CameraModelError, FocalTime, PinholeProjector, TimeInterval, UnadjustedCamera,
};
use crate::equation::{SharedQuaternionEquation, SharedVectorEquation};
use crate::geometry::{renormalize, rotation_to_quaternion};

/// The unadjusted camera reports positions in kilometers.
const METERS_PER_KILOMETER: f64 = 1000.0;

/// # Examples
///
/// ```rust
/// use std::{cell::RefCell, rc::Rc};
/// use nalgebra::Vector2;
/// use adjust_camera::camera::{AdjustedCameraModel, CameraModel, SyntheticLinescan};
/// use adjust_camera::equation::{PolynomialQuaternionEquation, PolynomialVectorEquation};
///
/// let model = AdjustedCameraModel::new(
///     SyntheticLinescan::default(),
///     Rc::new(RefCell::new(PolynomialVectorEquation::zero(1))),
///     Rc::new(RefCell::new(PolynomialQuaternionEquation::zero(1))),
/// ).unwrap();
///
/// let ray = model.pixel_to_vector(&Vector2::new(512.0, 1024.0)).unwrap();
/// assert!((ray.norm() - 1.0).abs() < 1e-12);
/// ```
pub struct AdjustedCameraModel<C: UnadjustedCamera> {
    cache: RefCell<TimeCache<C>>,
    position_func: SharedVectorEquation,
    pose_func: SharedQuaternionEquation,
}

impl<C: UnadjustedCamera> AdjustedCameraModel<C> {
    /// Wraps `camera` with the given corrections.
    ///
    /// Both equations get their time offset set to the midpoint of the camera's
    /// coverage, once, so their parameterizations stay well scaled.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::InvalidParams`]: the camera reports an invalid
    ///   coverage interval.
    /// * [`CameraModelError::EquationUnavailable`]: an equation is currently
    ///   borrowed elsewhere.
    pub fn new(
        camera: C,
        position_func: SharedVectorEquation,
        pose_func: SharedQuaternionEquation,
    ) -> Result<Self, CameraModelError> {
        let coverage = camera.time_interval();
        let interval = TimeInterval::new(coverage.min, coverage.max)?;
        let offset = interval.midpoint();

        position_func
            .try_borrow_mut()
            .map_err(|_| equation_busy("position"))?
            .set_time_offset(offset);
        pose_func
            .try_borrow_mut()
            .map_err(|_| equation_busy("pose"))?
            .set_time_offset(offset);
        debug!(
            "Adjusted camera over [{}, {}], correction time offset {}",
            interval.min, interval.max, offset
        );

        Ok(AdjustedCameraModel {
            cache: RefCell::new(TimeCache::new(camera)),
            position_func,
            pose_func,
        })
    }

    pub fn time_interval(&self) -> TimeInterval {
        self.cache.borrow().interval()
    }

    pub fn position_equation(&self) -> SharedVectorEquation {
        self.position_func.clone()
    }

    pub fn pose_equation(&self) -> SharedQuaternionEquation {
        self.pose_func.clone()
    }

    /// Resolves a pixel (sample, line) to undistorted focal-plane millimeters
    /// and the ephemeris time it was imaged at.
    pub fn pixel_to_focal_time(&self, pixel: &Vector2<f64>) -> Result<FocalTime, CameraModelError> {
        let mut cache = self.cache.borrow_mut();
        cache.synchronize_by_pixel(pixel.x, pixel.y)?;

        let camera = cache.camera();
        let xy = camera.undistorted_focal_plane_xy()?;
        Ok(FocalTime::new(xy.x, xy.y, camera.time()))
    }

    /// Unit ray in the world frame through a focal-plane position.
    pub fn focal_time_to_ray(&self, focal_time: &FocalTime) -> Result<Vector3<f64>, CameraModelError> {
        let focal = self.undistorted_focal(focal_time.time)?;
        let pointing = Vector3::new(focal_time.x_mm, focal_time.y_mm, focal)
            .try_normalize(f64::EPSILON)
            .ok_or(CameraModelError::FocalLengthMustBeNonZero)?;

        // The pose maps world to camera; rays go the other way.
        let look_transform = renormalize(&self.adjusted_pose(focal_time.time)?)?;
        Ok(look_transform.inverse_transform_vector(&pointing))
    }

    /// Instrument position in meters with the position correction added.
    pub fn adjusted_center(&self, time: f64) -> Result<Vector3<f64>, CameraModelError> {
        let position_km = self.at_time(time, |camera| camera.instrument_position())?;
        Ok(position_km * METERS_PER_KILOMETER + self.position_correction(time)?)
    }

    /// World to camera orientation with the orientation correction added.
    ///
    /// The exact orientation is `R_inst * R_body^-1`. The correction is summed
    /// component-wise, a first-order perturbation rather than a rotation
    /// composition, so the result is generally not unit norm. Renormalize it
    /// before using it as a rotation.
    pub fn adjusted_pose(&self, time: f64) -> Result<Quaternion<f64>, CameraModelError> {
        let (rot_inst, rot_body) = self.at_time(time, |camera| {
            Ok((camera.instrument_rotation()?, camera.body_rotation()?))
        })?;
        let body_inverse = rot_body
            .try_inverse()
            .ok_or(CameraModelError::SingularRotation)?;

        Ok(rotation_to_quaternion(&(rot_inst * body_inverse)) + self.pose_correction(time)?)
    }

    /// Exact, signed focal length in millimeters at `time`.
    pub fn undistorted_focal(&self, time: f64) -> Result<f64, CameraModelError> {
        self.at_time(time, |camera| camera.undistorted_focal_plane_z())
    }

    /// Forward-projects a world point at the time of `focal_time`.
    ///
    /// A pinhole camera is posed with the adjusted center and orientation at
    /// that time and the exact focal length, and the projected focal-plane
    /// coordinates are returned with the original time. This is the only
    /// supported world to image path under the adjustment.
    ///
    /// # Errors
    ///
    /// * [`CameraModelError::PointAtCameraCenter`]: the point has no depth
    ///   along the boresight, e.g. it is the adjusted center itself.
    /// * [`CameraModelError::TimeOutOfRange`]: the time is outside coverage.
    pub fn project_point_at(
        &self,
        focal_time: &FocalTime,
        point: &Vector3<f64>,
    ) -> Result<FocalTime, CameraModelError> {
        let time = focal_time.time;
        let focal_length_mm = self.undistorted_focal(time)?;

        let center = self.adjusted_center(time)?;
        let orientation = renormalize(&self.adjusted_pose(time)?)?;
        let mut pin_cam = PinholeProjector::new(
            center,
            orientation.to_rotation_matrix().matrix().transpose(),
            focal_length_mm,
            focal_length_mm,
            0.0,
            0.0,
        )?;
        pin_cam.set_coordinate_frame(Vector3::x(), Vector3::y(), Vector3::z());

        let forward_projection = pin_cam.project(point)?;
        Ok(FocalTime::new(forward_projection.x, forward_projection.y, time))
    }

    fn at_time<R>(
        &self,
        time: f64,
        read: impl FnOnce(&C) -> Result<R, CameraModelError>,
    ) -> Result<R, CameraModelError> {
        let mut cache = self.cache.borrow_mut();
        cache.synchronize_by_time(time)?;
        read(cache.camera())
    }

    fn position_correction(&self, time: f64) -> Result<Vector3<f64>, CameraModelError> {
        let equation = self
            .position_func
            .try_borrow()
            .map_err(|_| equation_busy("position"))?;
        Ok(equation.evaluate(time))
    }

    fn pose_correction(&self, time: f64) -> Result<Quaternion<f64>, CameraModelError> {
        let equation = self
            .pose_func
            .try_borrow()
            .map_err(|_| equation_busy("pose"))?;
        Ok(equation.evaluate(time))
    }
}

fn equation_busy(name: &str) -> CameraModelError {
    CameraModelError::EquationUnavailable(format!("{name} equation is mutably borrowed"))
}

impl<C: UnadjustedCamera> CameraModel for AdjustedCameraModel<C> {
    fn pixel_to_vector(&self, pixel: &Vector2<f64>) -> Result<Vector3<f64>, CameraModelError> {
        let focal_time = self.pixel_to_focal_time(pixel)?;
        self.focal_time_to_ray(&focal_time)
    }

    fn camera_center(&self, pixel: &Vector2<f64>) -> Result<Vector3<f64>, CameraModelError> {
        let focal_time = self.pixel_to_focal_time(pixel)?;
        self.adjusted_center(focal_time.time)
    }

    fn camera_pose(&self, pixel: &Vector2<f64>) -> Result<Quaternion<f64>, CameraModelError> {
        let focal_time = self.pixel_to_focal_time(pixel)?;
        self.adjusted_pose(focal_time.time)
    }

    /// Not supported: the imaging time of an arbitrary world point is unknown,
    /// and falling back to the unadjusted camera would ignore the corrections.
    fn point_to_pixel(&self, point: &Vector3<f64>) -> Result<Vector2<f64>, CameraModelError> {
        warn!("point_to_pixel requested for {point:?} on an adjusted camera");
        Err(CameraModelError::UnsupportedConversion(
            "point_to_pixel does not apply the adjustment; use project_point_at with a focal-plane time"
                .to_string(),
        ))
    }

    fn samples(&self) -> u32 {
        self.cache.borrow().camera().samples()
    }

    fn lines(&self) -> u32 {
        self.cache.borrow().camera().lines()
    }
}
