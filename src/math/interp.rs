//! Interpolation helpers for cross-fading poses.

use nalgebra::{UnitQuaternion, Vector3};

/// Below this length a vector has no usable direction.
const DIRECTION_EPS: f64 = 1e-9;

/// Spherical interpolation between two orientations along the shortest arc.
///
/// `t <= 0` returns `a` and `t >= 1` returns `b` exactly, so a cross-fade
/// ends on the target pose without a residual error.
#[must_use]
pub fn slerp_rotation(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>, t: f64) -> UnitQuaternion<f64> {
    if t <= 0.0 {
        return *a;
    }
    if t >= 1.0 {
        return *b;
    }
    // try_slerp only gives up when both rotations (nearly) coincide
    a.try_slerp(b, t, 1e-12).unwrap_or_else(|| a.nlerp(b, t))
}

/// Spherical interpolation of 3D vectors.
///
/// The direction is rotated along the great arc between both inputs while
/// the length is interpolated linearly. Degenerate inputs (a zero vector, or
/// parallel/opposite directions) fall back to a linear blend.
#[must_use]
pub fn slerp_vector(a: &Vector3<f64>, b: &Vector3<f64>, t: f64) -> Vector3<f64> {
    if t <= 0.0 {
        return *a;
    }
    if t >= 1.0 {
        return *b;
    }

    let (len_a, len_b) = (a.norm(), b.norm());
    if len_a < DIRECTION_EPS || len_b < DIRECTION_EPS {
        return a.lerp(b, t);
    }

    let (unit_a, unit_b) = (a / len_a, b / len_b);
    let theta = unit_a.dot(&unit_b).clamp(-1.0, 1.0).acos();
    let sin_theta = theta.sin();
    if sin_theta.abs() < DIRECTION_EPS {
        return a.lerp(b, t);
    }

    let wa = ((1.0 - t) * theta).sin() / sin_theta;
    let wb = (t * theta).sin() / sin_theta;
    let length = len_a + (len_b - len_a) * t;
    (unit_a * wa + unit_b * wb) * length
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_slerp_rotation_endpoints_exact() {
        let a = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let b = UnitQuaternion::from_euler_angles(-0.5, 1.0, 0.0);
        assert_eq!(slerp_rotation(&a, &b, 0.0), a);
        assert_eq!(slerp_rotation(&a, &b, 1.0), b);
    }

    #[test]
    fn test_slerp_rotation_midpoint() {
        let a = UnitQuaternion::identity();
        let b = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.0);
        let mid = slerp_rotation(&a, &b, 0.5);
        assert_relative_eq!(mid.angle(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_slerp_rotation_identical_inputs() {
        let a = UnitQuaternion::from_euler_angles(0.4, 0.0, 0.0);
        let mid = slerp_rotation(&a, &a, 0.3);
        assert_relative_eq!(mid.angle_to(&a), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_slerp_vector_preserves_arc() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        let b = Vector3::new(0.0, 0.0, 3.0);
        let mid = slerp_vector(&a, &b, 0.5);
        assert_relative_eq!(mid.norm(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(mid.x, mid.z, epsilon = 1e-9);
    }

    #[test]
    fn test_slerp_vector_degenerate_inputs() {
        let a = Vector3::zeros();
        let b = Vector3::new(0.0, 0.0, 2.0);
        assert_relative_eq!(slerp_vector(&a, &b, 0.25), Vector3::new(0.0, 0.0, 0.5), epsilon = 1e-12);

        let c = Vector3::new(1.0, 0.0, 0.0);
        let d = Vector3::new(3.0, 0.0, 0.0);
        assert_relative_eq!(slerp_vector(&c, &d, 0.5), Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_slerp_vector_endpoints_exact() {
        let a = Vector3::new(0.1, 0.0, -0.2);
        let b = Vector3::new(-0.3, 0.0, 0.4);
        assert_eq!(slerp_vector(&a, &b, 0.0), a);
        assert_eq!(slerp_vector(&a, &b, 1.0), b);
    }
}
