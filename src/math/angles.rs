//! Angle utilities for capture data and headings.
//!
//! Capture rotations are stored as Euler degree triplets. Headings are yaw
//! angles in degrees on `[0, 360)`.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Wrap an angle in degrees to `(-180, 180]`.
///
/// # Example
///
/// ```
/// use motion_matching::math::wrap_angle;
///
/// assert_eq!(wrap_angle(190.0), -170.0);
/// assert_eq!(wrap_angle(-180.0), 180.0);
/// ```
#[inline]
#[must_use]
pub fn wrap_angle(degrees: f64) -> f64 {
    let r = degrees.rem_euclid(360.0);
    if r > 180.0 {
        r - 360.0
    } else {
        r
    }
}

/// Normalize a heading in degrees to `[0, 360)`.
#[inline]
#[must_use]
pub fn normalize_heading(degrees: f64) -> f64 {
    let r = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// Signed difference `to - from` in degrees, taking the short way around
/// when the direct difference exceeds half a turn.
#[inline]
#[must_use]
pub fn heading_delta(from: f64, to: f64) -> f64 {
    let direct = to - from;
    if direct.abs() <= 180.0 {
        direct
    } else {
        wrap_angle(direct)
    }
}

/// Heading in `[0, 360)` of a planar stick vector.
///
/// Measured clockwise from `+x`, the yaw convention of the target skeleton:
/// `+x` is 0 degrees and `+y` is 270.
#[must_use]
pub fn stick_heading(x: f64, y: f64) -> f64 {
    normalize_heading(-y.atan2(x).to_degrees())
}

/// Compose capture Euler angles (degrees) into an orientation.
///
/// Each channel is wrapped to `(-180, 180]` first, then the rotation is
/// built as `Rz * Ry * Rx`. The capture data is right-handed while the
/// target skeleton is left-handed, so the result has its `y` and `z`
/// imaginary parts negated.
#[must_use]
pub fn capture_rotation(x_deg: f64, y_deg: f64, z_deg: f64) -> UnitQuaternion<f64> {
    let x = wrap_angle(x_deg).to_radians();
    let y = wrap_angle(y_deg).to_radians();
    let z = wrap_angle(z_deg).to_radians();

    let rot = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z)
        * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y)
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x);

    let q = rot.quaternion();
    // Negating two imaginary parts keeps the norm, so the result stays unit.
    UnitQuaternion::new_unchecked(Quaternion::new(q.w, q.i, -q.j, -q.k))
}
