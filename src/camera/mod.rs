//! Camera types shared by the adjusted camera pipeline.
//!
//! This module defines the focal-plane-time triple that every conversion passes
//! through, the [`UnadjustedCamera`] capability consumed from the exact camera
//! model, the [`CameraModel`] routines exposed to callers, and the
//! [`CameraModelError`] taxonomy.

use nalgebra::{Matrix3, Quaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};

pub mod adjusted;
pub(crate) mod cache;
pub mod pinhole;
pub mod synthetic;

pub use adjusted::AdjustedCameraModel;
pub use pinhole::PinholeProjector;
pub use synthetic::SyntheticLinescan;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Undistorted focal-plane position (millimeters) paired with ephemeris time (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocalTime {
    pub x_mm: f64,
    pub y_mm: f64,
    pub time: f64,
}

impl FocalTime {
    pub fn new(x_mm: f64, y_mm: f64, time: f64) -> Self {
        FocalTime { x_mm, y_mm, time }
    }

    /// Focal-plane part of the triple.
    pub fn focal_plane(&self) -> Vector2<f64> {
        Vector2::new(self.x_mm, self.y_mm)
    }
}

impl From<Vector3<f64>> for FocalTime {
    fn from(v: Vector3<f64>) -> Self {
        FocalTime::new(v.x, v.y, v.z)
    }
}

impl From<FocalTime> for Vector3<f64> {
    fn from(ft: FocalTime) -> Self {
        Vector3::new(ft.x_mm, ft.y_mm, ft.time)
    }
}

/// Closed ephemeris time interval covered by a camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub min: f64,
    pub max: f64,
}

impl TimeInterval {
    pub fn new(min: f64, max: f64) -> Result<Self, CameraModelError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(CameraModelError::InvalidParams(format!(
                "time interval bounds must be finite, got [{min}, {max}]"
            )));
        }
        if min > max {
            return Err(CameraModelError::InvalidParams(format!(
                "time interval is reversed: [{min}, {max}]"
            )));
        }
        Ok(TimeInterval { min, max })
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.min && time <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.max + self.min) / 2.0
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CameraModelError {
    #[error("Time {time} is outside the camera coverage [{min}, {max}]")]
    TimeOutOfRange { time: f64, min: f64, max: f64 },
    #[error("Conversion not supported: {0}")]
    UnsupportedConversion(String),
    #[error("Point lies in the camera center plane, projection is undefined")]
    PointAtCameraCenter,
    #[error("Orientation quaternion has near-zero norm")]
    DegenerateOrientation,
    #[error("Rotation matrix is singular")]
    SingularRotation,
    #[error("Focal length must be finite and non-zero")]
    FocalLengthMustBeNonZero,
    #[error("Principal point must be finite")]
    PrincipalPointMustBeFinite,
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
    #[error("Correction equation unavailable: {0}")]
    EquationUnavailable(String),
    #[error("Unadjusted camera failure: {0}")]
    Backend(String),
}

/// The exact, unadjusted camera model the adjustment is layered on.
///
/// Implementations are stateful: `set_image` and `set_time` move an internal
/// cursor and every geometric read reports values at the current cursor.
/// Setting the cursor is assumed to be expensive.
pub trait UnadjustedCamera {
    /// Move the cursor to an image location (sample, line).
    fn set_image(&mut self, sample: f64, line: f64) -> Result<(), CameraModelError>;

    /// Move the cursor to an ephemeris time.
    fn set_time(&mut self, time: f64) -> Result<(), CameraModelError>;

    fn sample(&self) -> f64;
    fn line(&self) -> f64;
    fn time(&self) -> f64;

    /// Undistorted focal-plane X/Y in millimeters.
    fn undistorted_focal_plane_xy(&self) -> Result<Vector2<f64>, CameraModelError>;

    /// Undistorted focal-plane Z, a signed focal length in millimeters.
    fn undistorted_focal_plane_z(&self) -> Result<f64, CameraModelError>;

    /// Instrument position in the body-fixed frame, in kilometers.
    fn instrument_position(&self) -> Result<Vector3<f64>, CameraModelError>;

    /// Rotation from the inertial frame to the instrument frame.
    fn instrument_rotation(&self) -> Result<Matrix3<f64>, CameraModelError>;

    /// Rotation from the inertial frame to the body-fixed frame.
    fn body_rotation(&self) -> Result<Matrix3<f64>, CameraModelError>;

    fn time_interval(&self) -> TimeInterval;

    fn samples(&self) -> u32;
    fn lines(&self) -> u32;
}

/// Traditional camera routines, addressed by pixel (sample, line).
pub trait CameraModel {
    /// Unit ray in the world frame through a pixel.
    fn pixel_to_vector(&self, pixel: &Vector2<f64>) -> Result<Vector3<f64>, CameraModelError>;

    /// Camera center in the world frame at the time a pixel was imaged.
    fn camera_center(&self, pixel: &Vector2<f64>) -> Result<Vector3<f64>, CameraModelError>;

    /// World to camera orientation at the time a pixel was imaged.
    fn camera_pose(&self, pixel: &Vector2<f64>) -> Result<Quaternion<f64>, CameraModelError>;

    /// Project a world point to a pixel.
    fn point_to_pixel(&self, point: &Vector3<f64>) -> Result<Vector2<f64>, CameraModelError>;

    fn samples(&self) -> u32;
    fn lines(&self) -> u32;

    fn resolution(&self) -> Resolution {
        Resolution {
            width: self.samples(),
            height: self.lines(),
        }
    }
}

/// Common validation functions for camera parameters
pub mod validation {
    use super::*;

    /// Focal lengths may be negative (mirrored focal planes) but not zero.
    pub fn validate_intrinsics(intrinsics: &Intrinsics) -> Result<(), CameraModelError> {
        if !intrinsics.fx.is_finite()
            || !intrinsics.fy.is_finite()
            || intrinsics.fx == 0.0
            || intrinsics.fy == 0.0
        {
            return Err(CameraModelError::FocalLengthMustBeNonZero);
        }
        if !intrinsics.cx.is_finite() || !intrinsics.cy.is_finite() {
            return Err(CameraModelError::PrincipalPointMustBeFinite);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_interval_bounds() {
        let interval = TimeInterval::new(10.0, 20.0).unwrap();
        assert!(interval.contains(10.0));
        assert!(interval.contains(20.0));
        assert!(!interval.contains(20.0 + 1e-9));
        assert_eq!(interval.midpoint(), 15.0);

        assert!(TimeInterval::new(20.0, 10.0).is_err());
        assert!(TimeInterval::new(f64::NAN, 10.0).is_err());
    }

    #[test]
    fn test_focal_time_vector_conversion() {
        let ft = FocalTime::new(1.5, -2.0, 100.25);
        let v: Vector3<f64> = ft.into();
        assert_eq!(v, Vector3::new(1.5, -2.0, 100.25));
        assert_eq!(FocalTime::from(v), ft);
    }

    #[test]
    fn test_validate_intrinsics_allows_signed_focal() {
        let mirrored = Intrinsics {
            fx: -150.0,
            fy: -150.0,
            cx: 0.0,
            cy: 0.0,
        };
        assert!(validation::validate_intrinsics(&mirrored).is_ok());

        let zero = Intrinsics { fx: 0.0, ..mirrored.clone() };
        assert!(matches!(
            validation::validate_intrinsics(&zero),
            Err(CameraModelError::FocalLengthMustBeNonZero)
        ));

        let bad_center = Intrinsics {
            cx: f64::INFINITY,
            ..mirrored
        };
        assert!(matches!(
            validation::validate_intrinsics(&bad_center),
            Err(CameraModelError::PrincipalPointMustBeFinite)
        ));
    }
}
