//! Polynomial correction equations.
//!
//! Each output component is an independent polynomial in `t - t0`, with
//! coefficients stored in ascending order of power. A zero polynomial is the
//! additive identity of the correction and leaves the exact camera untouched.

use nalgebra::{DVector, Quaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;

use crate::equation::{EquationError, QuaternionEquation, VectorEquation};

/// Horner evaluation of `c[0] + c[1] dt + c[2] dt^2 + ...`.
fn evaluate_polynomial(coefficients: &[f64], dt: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * dt + c)
}

fn flatten(components: &[&Vec<f64>]) -> DVector<f64> {
    DVector::from_iterator(
        components.iter().map(|c| c.len()).sum(),
        components.iter().flat_map(|c| c.iter().copied()),
    )
}

fn scatter(
    components: &mut [&mut Vec<f64>],
    parameters: &DVector<f64>,
) -> Result<(), EquationError> {
    let expected: usize = components.iter().map(|c| c.len()).sum();
    if parameters.len() != expected {
        return Err(EquationError::ParameterCount {
            expected,
            found: parameters.len(),
        });
    }
    let mut values = parameters.iter();
    for component in components.iter_mut() {
        for (coefficient, value) in component.iter_mut().zip(values.by_ref()) {
            *coefficient = *value;
        }
    }
    Ok(())
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &str) -> Result<T, EquationError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

fn write_yaml<T: Serialize>(value: &T, path: &str) -> Result<(), EquationError> {
    let yaml_string = serde_yaml::to_string(value)?;
    let mut file = fs::File::create(path)?;
    file.write_all(yaml_string.as_bytes())?;
    Ok(())
}

fn check_finite(name: &str, coefficients: &[f64]) -> Result<(), EquationError> {
    if coefficients.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(EquationError::InvalidEquation(format!(
            "{name} coefficients must be finite"
        )))
    }
}

/// Per-axis polynomial position correction, in meters.
///
/// # Examples
///
/// ```rust
/// use adjust_camera::equation::{PolynomialVectorEquation, VectorEquation};
///
/// let mut eq = PolynomialVectorEquation::from_coefficients(
///     vec![1.0, 0.5],
///     vec![0.0],
///     vec![],
/// );
/// eq.set_time_offset(10.0);
/// let v = eq.evaluate(12.0);
/// assert_eq!(v.x, 2.0);
/// assert_eq!(v.z, 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialVectorEquation {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    #[serde(default)]
    pub time_offset: f64,
}

impl PolynomialVectorEquation {
    /// A zero correction with `degree + 1` coefficients per axis.
    pub fn zero(degree: usize) -> Self {
        PolynomialVectorEquation {
            x: vec![0.0; degree + 1],
            y: vec![0.0; degree + 1],
            z: vec![0.0; degree + 1],
            time_offset: 0.0,
        }
    }

    pub fn from_coefficients(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Self {
        PolynomialVectorEquation {
            x,
            y,
            z,
            time_offset: 0.0,
        }
    }

    /// A correction that returns `value` at every time.
    pub fn constant(value: Vector3<f64>) -> Self {
        Self::from_coefficients(vec![value.x], vec![value.y], vec![value.z])
    }

    /// Loads an equation from a YAML file with `x`, `y`, `z` coefficient lists
    /// and an optional `time_offset`.
    pub fn load_from_yaml(path: &str) -> Result<Self, EquationError> {
        let equation: Self = read_yaml(path)?;
        equation.validate()?;
        Ok(equation)
    }

    pub fn save_to_yaml(&self, path: &str) -> Result<(), EquationError> {
        write_yaml(self, path)
    }

    pub fn validate(&self) -> Result<(), EquationError> {
        check_finite("x", &self.x)?;
        check_finite("y", &self.y)?;
        check_finite("z", &self.z)?;
        if !self.time_offset.is_finite() {
            return Err(EquationError::InvalidEquation(
                "time offset must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl VectorEquation for PolynomialVectorEquation {
    fn evaluate(&self, time: f64) -> Vector3<f64> {
        let dt = time - self.time_offset;
        Vector3::new(
            evaluate_polynomial(&self.x, dt),
            evaluate_polynomial(&self.y, dt),
            evaluate_polynomial(&self.z, dt),
        )
    }

    fn set_time_offset(&mut self, offset: f64) {
        self.time_offset = offset;
    }

    fn time_offset(&self) -> f64 {
        self.time_offset
    }

    fn parameter_count(&self) -> usize {
        self.x.len() + self.y.len() + self.z.len()
    }

    /// Coefficients of x, then y, then z.
    fn parameters(&self) -> DVector<f64> {
        flatten(&[&self.x, &self.y, &self.z])
    }

    fn set_parameters(&mut self, parameters: &DVector<f64>) -> Result<(), EquationError> {
        scatter(&mut [&mut self.x, &mut self.y, &mut self.z], parameters)
    }
}

/// Per-component polynomial orientation correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolynomialQuaternionEquation {
    pub w: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    #[serde(default)]
    pub time_offset: f64,
}

impl PolynomialQuaternionEquation {
    /// A zero correction with `degree + 1` coefficients per component.
    pub fn zero(degree: usize) -> Self {
        PolynomialQuaternionEquation {
            w: vec![0.0; degree + 1],
            x: vec![0.0; degree + 1],
            y: vec![0.0; degree + 1],
            z: vec![0.0; degree + 1],
            time_offset: 0.0,
        }
    }

    pub fn from_coefficients(w: Vec<f64>, x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Self {
        PolynomialQuaternionEquation {
            w,
            x,
            y,
            z,
            time_offset: 0.0,
        }
    }

    pub fn constant(value: Quaternion<f64>) -> Self {
        Self::from_coefficients(vec![value.w], vec![value.i], vec![value.j], vec![value.k])
    }

    /// Loads an equation from a YAML file with `w`, `x`, `y`, `z` coefficient
    /// lists and an optional `time_offset`.
    pub fn load_from_yaml(path: &str) -> Result<Self, EquationError> {
        let equation: Self = read_yaml(path)?;
        equation.validate()?;
        Ok(equation)
    }

    pub fn save_to_yaml(&self, path: &str) -> Result<(), EquationError> {
        write_yaml(self, path)
    }

    pub fn validate(&self) -> Result<(), EquationError> {
        check_finite("w", &self.w)?;
        check_finite("x", &self.x)?;
        check_finite("y", &self.y)?;
        check_finite("z", &self.z)?;
        if !self.time_offset.is_finite() {
            return Err(EquationError::InvalidEquation(
                "time offset must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl QuaternionEquation for PolynomialQuaternionEquation {
    fn evaluate(&self, time: f64) -> Quaternion<f64> {
        let dt = time - self.time_offset;
        Quaternion::new(
            evaluate_polynomial(&self.w, dt),
            evaluate_polynomial(&self.x, dt),
            evaluate_polynomial(&self.y, dt),
            evaluate_polynomial(&self.z, dt),
        )
    }

    fn set_time_offset(&mut self, offset: f64) {
        self.time_offset = offset;
    }

    fn time_offset(&self) -> f64 {
        self.time_offset
    }

    fn parameter_count(&self) -> usize {
        self.w.len() + self.x.len() + self.y.len() + self.z.len()
    }

    /// Coefficients of w, then x, y and z.
    fn parameters(&self) -> DVector<f64> {
        flatten(&[&self.w, &self.x, &self.y, &self.z])
    }

    fn set_parameters(&mut self, parameters: &DVector<f64>) -> Result<(), EquationError> {
        scatter(
            &mut [&mut self.w, &mut self.x, &mut self.y, &mut self.z],
            parameters,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_polynomial_evaluates_about_offset() {
        let mut eq = PolynomialVectorEquation::from_coefficients(
            vec![1.0, 2.0, 3.0],
            vec![-1.0],
            vec![0.0, 0.0, 0.5],
        );
        eq.set_time_offset(100.0);

        let v = eq.evaluate(102.0);
        assert_relative_eq!(v.x, 1.0 + 2.0 * 2.0 + 3.0 * 4.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(v.z, 2.0, epsilon = 1e-12);
        assert_eq!(eq.time_offset(), 100.0);
    }

    #[test]
    fn test_zero_equations_are_additive_identity() {
        let eq = PolynomialVectorEquation::zero(2);
        assert_eq!(eq.evaluate(123.4), Vector3::zeros());
        assert_eq!(eq.parameter_count(), 9);

        let q = PolynomialQuaternionEquation::zero(1);
        assert_eq!(q.evaluate(-5.0), Quaternion::new(0.0, 0.0, 0.0, 0.0));
        assert_eq!(q.parameter_count(), 8);
    }

    #[test]
    fn test_set_parameters_round_order() {
        let mut eq = PolynomialQuaternionEquation::zero(1);
        let params = DVector::from_vec(vec![1.0, 0.0, 0.0, 0.1, 0.0, 0.0, 0.0, -0.2]);
        eq.set_parameters(&params).unwrap();

        assert_eq!(eq.w, vec![1.0, 0.0]);
        assert_eq!(eq.x, vec![0.0, 0.1]);
        assert_eq!(eq.z, vec![0.0, -0.2]);
        assert_eq!(eq.parameters(), params);

        let q = eq.evaluate(2.0);
        assert_relative_eq!(q.w, 1.0, epsilon = 1e-12);
        assert_relative_eq!(q.i, 0.2, epsilon = 1e-12);
        assert_relative_eq!(q.k, -0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_set_parameters_wrong_length() {
        let mut eq = PolynomialVectorEquation::zero(0);
        let err = eq
            .set_parameters(&DVector::from_vec(vec![1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            EquationError::ParameterCount {
                expected: 3,
                found: 2
            }
        ));
        assert_eq!(eq, PolynomialVectorEquation::zero(0));
    }

    #[test]
    fn test_load_position_from_yaml() {
        let eq = PolynomialVectorEquation::load_from_yaml("samples/position_polynomial.yaml").unwrap();
        assert_eq!(eq.x, vec![0.0, 0.25]);
        assert_eq!(eq.y, vec![1.0]);
        assert_eq!(eq.z, vec![-2.0, 0.0, 0.01]);
        assert_eq!(eq.time_offset, 0.0);
    }

    #[test]
    fn test_load_pose_from_yaml() {
        let eq = PolynomialQuaternionEquation::load_from_yaml("samples/pose_polynomial.yaml").unwrap();
        assert_eq!(eq.parameter_count(), 8);
        assert_eq!(eq.evaluate(0.0), Quaternion::new(0.0, 1.0e-5, 0.0, 0.0));
    }

    #[test]
    fn test_save_and_reload_yaml() {
        let mut eq = PolynomialVectorEquation::from_coefficients(vec![0.5], vec![1.0, -1.0], vec![]);
        eq.set_time_offset(42.0);

        let path = std::env::temp_dir().join("adjust_camera_position_equation.yaml");
        let path = path.to_str().unwrap();
        eq.save_to_yaml(path).unwrap();
        let loaded = PolynomialVectorEquation::load_from_yaml(path).unwrap();
        assert_eq!(loaded, eq);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_yaml_is_io_error() {
        let err = PolynomialVectorEquation::load_from_yaml("samples/does_not_exist.yaml").unwrap_err();
        assert!(matches!(err, EquationError::IOError(_)));
    }
}
