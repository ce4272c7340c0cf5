//! Adjusted Camera Library
//!
//! Refines an exact, time-indexed pushbroom or framing camera with continuous
//! corrections to its position and orientation, so a bundle adjuster can
//! perturb a trajectory smoothly in time while the exact camera keeps supplying
//! the instrument optics. This library provides:
//! - The adjusted camera model (pixel, focal-plane time, ray, center, pose and
//!   forward projection)
//! - A cache around the stateful unadjusted camera
//! - An exact pinhole projector for forward projection
//! - Polynomial correction equations loadable from YAML
//! - An analytic linescan camera for testing

pub mod camera;
pub mod equation;
pub mod geometry;

// Re-export commonly used types
pub use camera::{
    AdjustedCameraModel, CameraModel, CameraModelError, FocalTime, Intrinsics, PinholeProjector,
    Resolution, SyntheticLinescan, TimeInterval, UnadjustedCamera,
};

pub use equation::{
    EquationError, PolynomialQuaternionEquation, PolynomialVectorEquation, QuaternionEquation,
    SharedQuaternionEquation, SharedVectorEquation, VectorEquation,
};
