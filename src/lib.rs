//! Motion Matching Library
//!
//! Real-time motion matching for character animation.
//!
//! Every few ticks the controller describes the character's current motion
//! and the user's intent as a feature vector, finds the nearest frame in a
//! database of captured clips and cross-fades toward it. Playback advances
//! one frame per tick in between.
//!
//! # Features
//!
//! - **Exact search**: KD-tree queries that always agree with a linear scan
//! - **Circular heading blending**: headings near 0/360 degrees blend the short way
//! - **Cross-fades**: per-joint slerp with root motion blended as vectors
//! - **Two feature layouts**: yaw-only (24) or full hip orientation (30)
//!
//! # Quick Start
//!
//! ```
//! use motion_matching::{KdTree, MatcherConfig, NormalizationStats, Sample};
//!
//! let config = MatcherConfig::default();
//! let dim = config.feature_dim();
//!
//! let stats = NormalizationStats::new(vec![0.0; dim], vec![2.0; dim], [4.0, 6.0], dim)?;
//! let index = KdTree::from_samples(
//!     dim,
//!     [
//!         Sample::new(vec![0.0; dim], 0, 1),
//!         Sample::new(vec![1.0; dim], 0, 2),
//!     ],
//! )?;
//!
//! let query = stats.normalize(&vec![1.8; dim].into())?;
//! assert_eq!(index.query(query.as_slice())?.frame(), 2);
//! # Ok::<(), motion_matching::MatchingError>(())
//! ```
//!
//! # Feature Layouts
//!
//! | Layout | Dimensions | Trajectory point |
//! |--------|------------|------------------|
//! | `FeatureLayout::YawOnly` | 24 | x, z, heading |
//! | `FeatureLayout::FullOrientation` | 30 | x, z, pitch, heading, roll |
//!
//! # Presets
//!
//! ```
//! use motion_matching::MatcherConfig;
//!
//! let default_config = MatcherConfig::default();
//! let responsive_config = MatcherConfig::responsive();
//! let cinematic_config = MatcherConfig::cinematic();
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod clip;
pub mod config;
pub mod database;
pub mod error;
pub mod feature;
pub mod kdtree;
pub mod locomotion;
pub mod matcher;
pub mod math;
pub mod normalize;
pub mod playback;
pub mod pose;
pub mod trajectory;

// Re-exports for convenient access
pub use clip::{Channel, ChannelKind, Clip, ClipLibrary, Joint};
pub use config::{MatcherConfig, RootMotion, SearchMode, TrajectoryWeights, VelocityShaping};
pub use database::{build_index, parse_sample_rows};
pub use error::{MatchingError, Result};
pub use feature::{CharacterState, FeatureBuilder, FeatureLayout, FeatureVector, Steering, UserInput};
pub use kdtree::{KdTree, Sample};
pub use locomotion::Locomotion;
pub use matcher::{MatchDecision, MotionMatcher, TickOutput};
pub use math::{capture_rotation, heading_delta, normalize_heading, stick_heading, wrap_angle};
pub use normalize::NormalizationStats;
pub use playback::{Cursor, Playback, PlaybackState};
pub use pose::{JointPose, SkeletonBinding, SkeletonPose};
pub use trajectory::{combine_heading, combine_trajectory, Horizon};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Yaw-only feature dimension.
pub const YAW_ONLY_DIM: usize = FeatureLayout::YawOnly.dim();

/// Full-orientation feature dimension.
pub const FULL_ORIENTATION_DIM: usize = FeatureLayout::FullOrientation.dim();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(YAW_ONLY_DIM, 24);
        assert_eq!(FULL_ORIENTATION_DIM, 30);
        assert_eq!(MatcherConfig::default().feature_dim(), YAW_ONLY_DIM);
    }

    #[test]
    fn test_index_agrees_with_scan_on_normalized_queries() {
        let stats = NormalizationStats::new(vec![0.5; 24], vec![2.0; 24], [4.0, 6.0], 24).unwrap();
        let samples: Vec<Sample> = (0..200_i32)
            .map(|i| {
                let raw: Vec<f64> = (0..24_i32).map(|d| f64::from(i * 7 + d * 13 % 29).sin()).collect();
                let z = stats.normalize(&raw.into()).unwrap();
                Sample::new(z.into_inner(), (i % 3) as usize, i as usize)
            })
            .collect();
        let index = KdTree::from_samples(24, samples).unwrap();

        for q in 0..50_i32 {
            let raw: Vec<f64> = (0..24_i32).map(|d| f64::from(q * 11 - d).cos()).collect();
            let z = stats.normalize(&raw.into()).unwrap();
            let tree = index.query(z.as_slice()).unwrap();
            let scan = index.brute_force_query(z.as_slice()).unwrap();
            assert_eq!(tree, scan);
        }
    }
}
