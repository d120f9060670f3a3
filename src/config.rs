//! Configuration for the motion matcher.
//!
//! This module provides the [`MatcherConfig`] struct which centralizes all
//! tunable parameters of the controller, along with a couple of presets.
//!
//! # Example
//!
//! ```
//! use motion_matching::{MatcherConfig, SearchMode};
//!
//! let config = MatcherConfig::default()
//!     .with_match_interval(5)
//!     .with_search_mode(SearchMode::BruteForce);
//! assert!(config.validate().is_ok());
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MatchingError, Result};
use crate::feature::FeatureLayout;

/// Reference tick duration of the capture data (30 Hz).
pub const DEFAULT_TICK_DURATION: f64 = 0.033_33;

/// Scale applied to stored root positions (centimetres to metres).
pub const DEFAULT_POSITION_SCALE: f64 = 0.01;

/// Configuration for the motion matcher.
///
/// # Core Parameters
///
/// - `match_interval`: ticks between nearest-neighbour queries (`K`).
/// - `transition_length`: ticks spent cross-fading between two clips.
/// - `trajectory_weights`: how strongly user intent overrides the playing
///   clip's own trajectory at the 20 and 40 tick horizons.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatcherConfig {
    /// Issue a query every `match_interval` ticks.
    pub match_interval: u32,

    /// Number of ticks in a cross-fade.
    pub transition_length: u32,

    /// Fixed simulation tick in seconds.
    pub tick_duration: f64,

    /// Per-horizon user weights for trajectory and heading blending.
    pub trajectory_weights: TrajectoryWeights,

    /// Weight of the desired user velocity in the blended hip velocity.
    pub velocity_blend: f64,

    /// Walking speed (m/s) reached at full stick deflection.
    pub move_speed: f64,

    /// Acceleration and deceleration rate of the kinematic root.
    pub speed_change_rate: f64,

    /// Scale applied to root position channels on read.
    pub position_scale: f64,

    /// Which index query answers a match cycle.
    pub search_mode: SearchMode,

    /// Shape of the feature vector.
    pub feature_layout: FeatureLayout,

    /// Who moves the character root.
    pub root_motion: RootMotion,

    /// Mapping from stick deflection to desired planar velocity.
    pub velocity_shaping: VelocityShaping,
}

/// User weights at the near (20 tick) and mid (40 tick) horizons.
///
/// The far (60 tick) horizon always takes the user value unmodified.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrajectoryWeights {
    /// Weight `a` at 20 ticks.
    pub near: f64,
    /// Weight `b` at 40 ticks.
    pub mid: f64,
}

impl Default for TrajectoryWeights {
    fn default() -> Self {
        Self {
            near: 0.2,
            mid: 0.85,
        }
    }
}

/// Nearest-neighbour query used on match cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SearchMode {
    /// KD-tree descent with backtracking.
    #[default]
    Tree,
    /// Linear scan over every sample.
    BruteForce,
}

/// Source of the character's root translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RootMotion {
    /// Root translation comes from the clips' own per-frame deltas.
    #[default]
    Animation,
    /// Root translation comes from the stick-driven locomotion controller.
    Kinematic,
}

/// Stick to desired velocity mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VelocityShaping {
    /// `stick * move_speed`.
    #[default]
    Linear,
    /// `direction * |stick|^2 * max_planar_velocity`, per axis.
    Quadratic,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            match_interval: 10,
            transition_length: 3,
            tick_duration: DEFAULT_TICK_DURATION,
            trajectory_weights: TrajectoryWeights::default(),
            velocity_blend: 0.5,
            move_speed: 2.0,
            speed_change_rate: 10.0,
            position_scale: DEFAULT_POSITION_SCALE,
            search_mode: SearchMode::Tree,
            feature_layout: FeatureLayout::YawOnly,
            root_motion: RootMotion::Animation,
            velocity_shaping: VelocityShaping::Linear,
        }
    }
}

impl MatcherConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.match_interval == 0 {
            return Err(MatchingError::invalid_config(
                "match_interval must be at least 1",
            ));
        }
        if self.transition_length == 0 {
            return Err(MatchingError::invalid_config(
                "transition_length must be at least 1",
            ));
        }
        if !(self.tick_duration > 0.0 && self.tick_duration.is_finite()) {
            return Err(MatchingError::invalid_config(
                "tick_duration must be positive",
            ));
        }
        let TrajectoryWeights { near, mid } = self.trajectory_weights;
        if !(0.0..=1.0).contains(&near) || !(0.0..=1.0).contains(&mid) {
            return Err(MatchingError::invalid_config(
                "trajectory weights must lie in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.velocity_blend) {
            return Err(MatchingError::invalid_config(
                "velocity_blend must lie in [0, 1]",
            ));
        }
        if !(self.move_speed >= 0.0 && self.move_speed.is_finite()) {
            return Err(MatchingError::invalid_config(
                "move_speed must be finite and non-negative",
            ));
        }
        if !(self.speed_change_rate > 0.0 && self.speed_change_rate.is_finite()) {
            return Err(MatchingError::invalid_config(
                "speed_change_rate must be finite and positive",
            ));
        }
        if !(self.position_scale > 0.0 && self.position_scale.is_finite()) {
            return Err(MatchingError::invalid_config(
                "position_scale must be finite and positive",
            ));
        }
        Ok(())
    }

    /// Preset that follows the stick closely: frequent queries and user
    /// intent dominating already at the near horizon.
    #[must_use]
    pub fn responsive() -> Self {
        Self {
            match_interval: 5,
            transition_length: 3,
            trajectory_weights: TrajectoryWeights {
                near: 0.5,
                mid: 1.0,
            },
            velocity_blend: 0.75,
            ..Self::default()
        }
    }

    /// Preset favouring clip continuity: sparse queries and long cross-fades.
    #[must_use]
    pub fn cinematic() -> Self {
        Self {
            match_interval: 15,
            transition_length: 6,
            trajectory_weights: TrajectoryWeights {
                near: 0.1,
                mid: 0.6,
            },
            velocity_blend: 0.3,
            ..Self::default()
        }
    }

    /// Set the match interval.
    #[must_use]
    pub const fn with_match_interval(mut self, ticks: u32) -> Self {
        self.match_interval = ticks;
        self
    }

    /// Set the transition length.
    #[must_use]
    pub const fn with_transition_length(mut self, ticks: u32) -> Self {
        self.transition_length = ticks;
        self
    }

    /// Set the near and mid horizon weights.
    #[must_use]
    pub const fn with_trajectory_weights(mut self, near: f64, mid: f64) -> Self {
        self.trajectory_weights = TrajectoryWeights { near, mid };
        self
    }

    /// Set the search mode.
    #[must_use]
    pub const fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Set the feature layout.
    #[must_use]
    pub const fn with_feature_layout(mut self, layout: FeatureLayout) -> Self {
        self.feature_layout = layout;
        self
    }

    /// Set the root motion source.
    #[must_use]
    pub const fn with_root_motion(mut self, root_motion: RootMotion) -> Self {
        self.root_motion = root_motion;
        self
    }

    /// Set the velocity shaping.
    #[must_use]
    pub const fn with_velocity_shaping(mut self, shaping: VelocityShaping) -> Self {
        self.velocity_shaping = shaping;
        self
    }

    /// Number of features implied by the layout.
    #[must_use]
    pub const fn feature_dim(&self) -> usize {
        self.feature_layout.dim()
    }
}
