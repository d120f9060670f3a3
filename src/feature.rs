//! Feature vectors describing one instant of motion.
//!
//! # Layout ([`FeatureLayout::YawOnly`], 24 values)
//!
//! | Index | Feature | Dims | Description |
//! |-------|---------|------|-------------|
//! | 0:3 | left_foot | 3 | Left foot position relative to the hip |
//! | 3:6 | right_foot | 3 | Right foot position relative to the hip |
//! | 6:9 | left_foot_velocity | 3 | World velocity over one tick |
//! | 9:12 | right_foot_velocity | 3 | World velocity over one tick |
//! | 12:15 | hip_velocity | 3 | Hip velocity blended with user intent |
//! | 15:24 | trajectory | 9 | Per horizon: x, z, heading (degrees) |
//!
//! [`FeatureLayout::FullOrientation`] stores five values per horizon
//! (x, z, hip pitch, heading, hip roll) for 30 values in total.

use std::ops::Index;

use nalgebra::{Vector2, Vector3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::MatcherConfig;
use crate::math::angles::{normalize_heading, stick_heading};
use crate::trajectory::{blend_heading, blend_linear, combine_hip_velocity, user_trajectory, Horizon};

/// Number of values before the trajectory block.
pub const POSE_FEATURES: usize = 15;

/// Shape of the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FeatureLayout {
    /// Trajectory points carry only the yaw heading.
    #[default]
    YawOnly,
    /// Trajectory points carry pitch, heading and roll.
    FullOrientation,
}

impl FeatureLayout {
    /// Values per trajectory horizon.
    #[must_use]
    pub const fn values_per_horizon(self) -> usize {
        match self {
            Self::YawOnly => 3,
            Self::FullOrientation => 5,
        }
    }

    /// Total number of features.
    #[must_use]
    pub const fn dim(self) -> usize {
        POSE_FEATURES + 3 * self.values_per_horizon()
    }
}

/// A fixed-length feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Wrap raw feature values.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// All-zero vector.
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self(vec![0.0; dim])
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Feature values.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Consume into the raw values.
    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl AsRef<[f64]> for FeatureVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

impl Index<usize> for FeatureVector {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.0[i]
    }
}

/// Squared Euclidean distance between two equally long slices.
#[inline]
#[must_use]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Character state observed by the host on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterState {
    /// Left foot world position.
    pub left_foot: Vector3<f64>,
    /// Right foot world position.
    pub right_foot: Vector3<f64>,
    /// Hip world position.
    pub hip_position: Vector3<f64>,
    /// Hip Euler angles in degrees: pitch (x), yaw (y), roll (z).
    pub hip_euler: Vector3<f64>,
}

impl Default for CharacterState {
    fn default() -> Self {
        Self {
            left_foot: Vector3::zeros(),
            right_foot: Vector3::zeros(),
            hip_position: Vector3::zeros(),
            hip_euler: Vector3::zeros(),
        }
    }
}

/// User intent read by the host's input collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserInput {
    /// Planar stick deflection, `x` right and `y` forward, length <= 1.
    pub stick: Vector2<f64>,
    /// Desired heading in degrees on `[0, 360)`.
    pub target_heading: f64,
}

impl UserInput {
    /// Build an input sample and derive the target heading from the stick.
    #[must_use]
    pub fn from_stick(x: f64, y: f64) -> Self {
        Self {
            stick: Vector2::new(x, y),
            target_heading: stick_heading(x, y),
        }
    }

    /// No deflection, heading 0.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            stick: Vector2::zeros(),
            target_heading: 0.0,
        }
    }

    /// Whether the stick is deflected.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.stick.norm_squared() > f64::EPSILON
    }
}

/// Steering terms resolved by the matcher for one feature build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    /// Desired planar velocity `(x, z)`.
    pub desired_velocity: Vector2<f64>,
    /// Desired heading in degrees.
    pub target_heading: f64,
    /// Root velocity from a kinematic controller; `None` measures the hip.
    pub root_velocity: Option<Vector3<f64>>,
}

#[derive(Debug, Clone, Copy)]
struct TrackedPoints {
    left_foot: Vector3<f64>,
    right_foot: Vector3<f64>,
    hip: Vector3<f64>,
}

/// Builds raw (unnormalized) feature vectors tick by tick.
///
/// Velocities difference the current state against the state recorded on
/// the previous tick. Until a state has been recorded every feature is zero.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    config: MatcherConfig,
    previous: Option<TrackedPoints>,
}

impl FeatureBuilder {
    /// Create a builder with no history.
    #[must_use]
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            config,
            previous: None,
        }
    }

    /// Number of features produced.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.config.feature_layout.dim()
    }

    /// Whether a previous tick has been recorded.
    #[must_use]
    pub const fn has_history(&self) -> bool {
        self.previous.is_some()
    }

    /// Build the feature vector for the current tick.
    ///
    /// `anim_trajectory` holds the playing clip's planar displacement at each
    /// horizon, in [`Horizon::ALL`] order.
    #[must_use]
    pub fn build(
        &self,
        state: &CharacterState,
        steering: &Steering,
        anim_trajectory: &[Vector2<f64>; 3],
    ) -> FeatureVector {
        let layout = self.config.feature_layout;
        let Some(previous) = self.previous else {
            return FeatureVector::zeros(layout.dim());
        };

        let dt = self.config.tick_duration;
        let weights = &self.config.trajectory_weights;

        let left_local = state.left_foot - state.hip_position;
        let right_local = state.right_foot - state.hip_position;
        let left_velocity = (state.left_foot - previous.left_foot) / dt;
        let right_velocity = (state.right_foot - previous.right_foot) / dt;
        let hip_velocity = steering
            .root_velocity
            .unwrap_or_else(|| (state.hip_position - previous.hip) / dt);
        let hip_velocity =
            combine_hip_velocity(&hip_velocity, &steering.desired_velocity, self.config.velocity_blend);

        let mut values = Vec::with_capacity(layout.dim());
        for v in [left_local, right_local, left_velocity, right_velocity, hip_velocity] {
            values.extend_from_slice(v.as_slice());
        }

        let current_heading = normalize_heading(state.hip_euler.y);
        for (horizon, anim) in Horizon::ALL.into_iter().zip(anim_trajectory) {
            let user = user_trajectory(&steering.desired_velocity, dt, horizon);
            let x = blend_linear(anim.x, user.x, horizon, weights);
            let z = blend_linear(anim.y, user.y, horizon, weights);
            let heading = blend_heading(current_heading, steering.target_heading, horizon, weights);

            match layout {
                FeatureLayout::YawOnly => values.extend_from_slice(&[x, z, heading]),
                FeatureLayout::FullOrientation => values.extend_from_slice(&[
                    x,
                    z,
                    state.hip_euler.x,
                    heading,
                    state.hip_euler.z,
                ]),
            }
        }

        FeatureVector(values)
    }

    /// Remember this tick's positions for the next tick's velocities.
    pub fn record(&mut self, state: &CharacterState) {
        self.previous = Some(TrackedPoints {
            left_foot: state.left_foot,
            right_foot: state.right_foot,
            hip: state.hip_position,
        });
    }

    /// Forget the recorded history.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}
