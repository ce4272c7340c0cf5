//! Time-parameterized correction equations.
//!
//! The adjusted camera perturbs the exact trajectory with two continuous
//! functions of ephemeris time: a [`VectorEquation`] added to the instrument
//! position and a [`QuaternionEquation`] added to the instrument orientation.
//! Any representation (polynomial, spline, ...) can be plugged in as long as it
//! evaluates at a scalar time and accepts a time offset that centers its
//! parameterization.
//!
//! The parameter accessors let a bundle adjuster read and perturb the free
//! parameters of an equation without knowing its representation.

use nalgebra::{DVector, Quaternion, Vector3};
use std::cell::RefCell;
use std::rc::Rc;

pub mod polynomial;

pub use polynomial::{PolynomialQuaternionEquation, PolynomialVectorEquation};

/// Shared handle to a position correction; the caller keeps ownership and may
/// update parameters between evaluations.
pub type SharedVectorEquation = Rc<RefCell<dyn VectorEquation>>;

/// Shared handle to an orientation correction.
pub type SharedQuaternionEquation = Rc<RefCell<dyn QuaternionEquation>>;

#[derive(thiserror::Error, Debug)]
pub enum EquationError {
    #[error("Expected {expected} parameters, got {found}")]
    ParameterCount { expected: usize, found: usize },
    #[error("Invalid equation: {0}")]
    InvalidEquation(String),
    #[error("Failed to load YAML: {0}")]
    YamlError(String),
    #[error("IO Error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for EquationError {
    fn from(err: std::io::Error) -> Self {
        EquationError::IOError(err.to_string())
    }
}

impl From<serde_yaml::Error> for EquationError {
    fn from(err: serde_yaml::Error) -> Self {
        EquationError::YamlError(err.to_string())
    }
}

/// A 3-vector valued function of time, in meters.
pub trait VectorEquation {
    fn evaluate(&self, time: f64) -> Vector3<f64>;

    /// Sets the time origin of the parameterization.
    fn set_time_offset(&mut self, offset: f64);

    fn time_offset(&self) -> f64;

    fn parameter_count(&self) -> usize;

    fn parameters(&self) -> DVector<f64>;

    fn set_parameters(&mut self, parameters: &DVector<f64>) -> Result<(), EquationError>;
}

/// A quaternion valued function of time.
///
/// The value is a first-order correction added component-wise to an exact
/// orientation quaternion, so it is not required to have unit norm.
pub trait QuaternionEquation {
    fn evaluate(&self, time: f64) -> Quaternion<f64>;

    /// Sets the time origin of the parameterization.
    fn set_time_offset(&mut self, offset: f64);

    fn time_offset(&self) -> f64;

    fn parameter_count(&self) -> usize;

    fn parameters(&self) -> DVector<f64>;

    fn set_parameters(&mut self, parameters: &DVector<f64>) -> Result<(), EquationError>;
}
