//! Trajectory shaping: blending the playing clip's future with user intent.
//!
//! The future is sampled at three fixed lookahead horizons. The near horizon
//! mostly trusts the clip that is playing, the far horizon trusts the user
//! entirely:
//!
//! | Horizon | Ticks | User weight |
//! |---------|-------|-------------|
//! | Near | 20 | `a` (default 0.2) |
//! | Mid | 40 | `b` (default 0.85) |
//! | Far | 60 | 1 |
//!
//! Headings are blended on the circle so that two headings either side of
//! 0/360 degrees never average out to the opposite direction.

use nalgebra::{Vector2, Vector3};

use crate::config::{TrajectoryWeights, VelocityShaping};
use crate::error::{MatchingError, Result};
use crate::math::angles::{heading_delta, normalize_heading};

/// A lookahead horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Horizon {
    /// 20 ticks ahead.
    Near,
    /// 40 ticks ahead.
    Mid,
    /// 60 ticks ahead.
    Far,
}

impl Horizon {
    /// All horizons in feature order.
    pub const ALL: [Self; 3] = [Self::Near, Self::Mid, Self::Far];

    /// Lookahead in ticks.
    #[must_use]
    pub const fn ticks(self) -> u32 {
        match self {
            Self::Near => 20,
            Self::Mid => 40,
            Self::Far => 60,
        }
    }

    /// Parse a lookahead in ticks.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::InvalidHorizon`] for anything but 20, 40 or 60.
    pub fn from_ticks(ticks: u32) -> Result<Self> {
        match ticks {
            20 => Ok(Self::Near),
            40 => Ok(Self::Mid),
            60 => Ok(Self::Far),
            other => Err(MatchingError::InvalidHorizon(other)),
        }
    }

    /// Weight given to the user value at this horizon.
    #[must_use]
    pub const fn user_weight(self, weights: &TrajectoryWeights) -> f64 {
        match self {
            Self::Near => weights.near,
            Self::Mid => weights.mid,
            Self::Far => 1.0,
        }
    }
}

impl TryFrom<u32> for Horizon {
    type Error = MatchingError;

    fn try_from(ticks: u32) -> Result<Self> {
        Self::from_ticks(ticks)
    }
}

/// Blend one trajectory coordinate of the playing clip with the user's.
///
/// # Errors
///
/// Returns [`MatchingError::InvalidHorizon`] when `horizon_ticks` is not a
/// supported horizon.
///
/// # Example
///
/// ```
/// use motion_matching::{combine_trajectory, TrajectoryWeights};
///
/// let w = TrajectoryWeights::default();
/// assert_eq!(combine_trajectory(5.0, -3.0, 60, &w)?, -3.0);
/// # Ok::<(), motion_matching::MatchingError>(())
/// ```
pub fn combine_trajectory(
    anim: f64,
    user: f64,
    horizon_ticks: u32,
    weights: &TrajectoryWeights,
) -> Result<f64> {
    let horizon = Horizon::from_ticks(horizon_ticks)?;
    Ok(blend_linear(anim, user, horizon, weights))
}

/// Blend the current heading toward the target heading (degrees).
///
/// The signed short-way difference is scaled by the horizon weight and
/// applied to `current`; the result lies in `[0, 360)`. At the far horizon
/// the target is returned unmodified.
///
/// # Errors
///
/// Returns [`MatchingError::InvalidHorizon`] when `horizon_ticks` is not a
/// supported horizon.
pub fn combine_heading(
    current: f64,
    target: f64,
    horizon_ticks: u32,
    weights: &TrajectoryWeights,
) -> Result<f64> {
    let horizon = Horizon::from_ticks(horizon_ticks)?;
    Ok(blend_heading(current, target, horizon, weights))
}

pub(crate) fn blend_linear(anim: f64, user: f64, horizon: Horizon, weights: &TrajectoryWeights) -> f64 {
    match horizon {
        Horizon::Far => user,
        _ => {
            let w = horizon.user_weight(weights);
            w * user + (1.0 - w) * anim
        }
    }
}

pub(crate) fn blend_heading(current: f64, target: f64, horizon: Horizon, weights: &TrajectoryWeights) -> f64 {
    match horizon {
        Horizon::Far => target,
        _ => {
            let w = horizon.user_weight(weights);
            normalize_heading(current + heading_delta(current, target) * w)
        }
    }
}

/// Planar displacement reached by holding `velocity` for the horizon.
#[must_use]
pub fn user_trajectory(velocity: &Vector2<f64>, tick_duration: f64, horizon: Horizon) -> Vector2<f64> {
    velocity * (tick_duration * f64::from(horizon.ticks()))
}

/// Desired planar velocity `(x, z)` for a stick deflection.
///
/// `max_planar_velocity` is only consulted by [`VelocityShaping::Quadratic`].
#[must_use]
pub fn desired_velocity(
    stick: &Vector2<f64>,
    shaping: VelocityShaping,
    move_speed: f64,
    max_planar_velocity: [f64; 2],
) -> Vector2<f64> {
    match shaping {
        VelocityShaping::Linear => stick * move_speed,
        VelocityShaping::Quadratic => {
            let magnitude = stick.norm();
            if magnitude == 0.0 {
                return Vector2::zeros();
            }
            let shaped = stick * magnitude;
            Vector2::new(
                shaped.x * max_planar_velocity[0],
                shaped.y * max_planar_velocity[1],
            )
        }
    }
}

/// Mix the measured hip velocity with the desired planar velocity.
///
/// Only X and Z are mixed; vertical velocity passes through.
#[must_use]
pub fn combine_hip_velocity(hip: &Vector3<f64>, desired: &Vector2<f64>, blend: f64) -> Vector3<f64> {
    Vector3::new(
        hip.x * (1.0 - blend) + desired.x * blend,
        hip.y,
        hip.z * (1.0 - blend) + desired.y * blend,
    )
}
