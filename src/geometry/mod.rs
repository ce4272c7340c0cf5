use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector2};

use crate::camera::CameraModelError;

/// Norm below which a quaternion is considered to carry no rotation.
const MIN_QUATERNION_NORM: f64 = 1e-12;

/// Quaternion equivalent of a rotation matrix.
///
/// The matrix is assumed orthonormal; no projection onto SO(3) is performed.
pub fn rotation_to_quaternion(matrix: &Matrix3<f64>) -> Quaternion<f64> {
    let rotation = Rotation3::from_matrix_unchecked(*matrix);
    UnitQuaternion::from_rotation_matrix(&rotation).into_inner()
}

/// Normalizes a (possibly additively corrected) quaternion into a rotation.
///
/// # Errors
///
/// * [`CameraModelError::DegenerateOrientation`]: the norm is too small to
///   define a direction.
pub fn renormalize(q: &Quaternion<f64>) -> Result<UnitQuaternion<f64>, CameraModelError> {
    UnitQuaternion::try_new(*q, MIN_QUATERNION_NORM).ok_or(CameraModelError::DegenerateOrientation)
}

/// Generate a grid of pixels that are evenly distributed across the image
///
/// # Arguments
///
/// * `samples` - The image width in pixels
/// * `lines` - The image height in pixels
/// * `n` - The approximate number of pixels to generate
///
/// # Returns
///
/// A vector of (sample, line) pixel coordinates, one per grid cell center.
pub fn sample_pixels(samples: f64, lines: f64, n: usize) -> Vec<Vector2<f64>> {
    let mut pixels = Vec::new();

    let num_cells_x = ((n as f64 * (samples / lines)).sqrt().round() as i32).max(1);
    let num_cells_y = ((n as f64 * (lines / samples)).sqrt().round() as i32).max(1);

    let cell_width = samples / num_cells_x as f64;
    let cell_height = lines / num_cells_y as f64;

    for i in 0..num_cells_y {
        for j in 0..num_cells_x {
            let x = (j as f64 + 0.5) * cell_width;
            let y = (i as f64 + 0.5) * cell_height;
            pixels.push(Vector2::new(x, y));
        }
    }

    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_sample_pixels() {
        let width = 800f64;
        let height = 600f64;
        let n = 100;

        let pixels = sample_pixels(width, height, n);

        // Rounding of the grid dimensions keeps the count near n
        let expected_count = (n as f64 * 0.8) as usize..=(n as f64 * 1.2) as usize;
        assert!(
            expected_count.contains(&pixels.len()),
            "Expected around {} pixels, got {}",
            n,
            pixels.len()
        );

        for pixel in &pixels {
            assert!(
                pixel.x >= 0.0 && pixel.x < width,
                "Pixel sample outside image bounds: {}",
                pixel.x
            );
            assert!(
                pixel.y >= 0.0 && pixel.y < height,
                "Pixel line outside image bounds: {}",
                pixel.y
            );
        }
    }

    #[test]
    fn test_sample_pixels_degenerate_aspect() {
        let pixels = sample_pixels(4000.0, 1.0, 4);
        assert!(!pixels.is_empty());
        assert!(pixels.iter().all(|p| p.y == 0.5));
    }

    #[test]
    fn test_rotation_to_quaternion_identity() {
        let q = rotation_to_quaternion(&Matrix3::identity());
        assert_relative_eq!(q.w, 1.0, epsilon = 1e-15);
        assert_relative_eq!(q.imag().norm(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_rotation_to_quaternion_matches_matrix() {
        let rotation = Rotation3::from_euler_angles(0.1, -0.4, 1.2);
        let q = rotation_to_quaternion(rotation.matrix());
        let unit = UnitQuaternion::new_normalize(q);
        let v = Vector3::new(0.3, -1.0, 2.0);
        assert_relative_eq!(unit * v, rotation * v, epsilon = 1e-12);
    }

    #[test]
    fn test_renormalize_rejects_zero() {
        let zero = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert!(matches!(
            renormalize(&zero),
            Err(CameraModelError::DegenerateOrientation)
        ));

        let scaled = renormalize(&Quaternion::new(2.0, 0.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(scaled.into_inner().w, 1.0, epsilon = 1e-15);
    }
}
