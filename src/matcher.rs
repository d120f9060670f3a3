//! The per-tick motion matching controller.
//!
//! Every `match_interval` ticks the matcher builds a feature vector from the
//! character state and user input, normalizes it, asks the index for the
//! nearest database frame and decides whether to cross-fade to it. On every
//! tick, match or not, playback advances by exactly one frame.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use motion_matching::{
//!     CharacterState, Channel, ChannelKind, Clip, ClipLibrary, Joint, KdTree, MatcherConfig,
//!     MotionMatcher, NormalizationStats, Sample, UserInput,
//! };
//!
//! let channels = [
//!     ChannelKind::XPosition,
//!     ChannelKind::YPosition,
//!     ChannelKind::ZPosition,
//!     ChannelKind::ZRotation,
//!     ChannelKind::XRotation,
//!     ChannelKind::YRotation,
//! ]
//! .into_iter()
//! .map(|kind| Channel::new(kind, vec![0.0; 30]))
//! .collect();
//! let clip = Clip::new("idle", vec![Joint::new("hip", channels)], 30, 1.0 / 30.0)?;
//! let library = Arc::new(ClipLibrary::new(vec![clip])?);
//!
//! let config = MatcherConfig::default();
//! let dim = config.feature_dim();
//! let stats = Arc::new(NormalizationStats::new(vec![0.0; dim], vec![1.0; dim], [1.0, 1.0], dim)?);
//! let index = Arc::new(KdTree::from_samples(dim, [Sample::new(vec![0.0; dim], 0, 1)])?);
//!
//! let mut matcher = MotionMatcher::new(config, library, stats, index)?;
//! let output = matcher.tick(&CharacterState::default(), &UserInput::neutral())?;
//! assert!(output.pose.is_some());
//! # Ok::<(), motion_matching::MatchingError>(())
//! ```

use std::sync::Arc;

use nalgebra::{Vector2, Vector3};

use crate::clip::ClipLibrary;
use crate::config::{MatcherConfig, RootMotion};
use crate::error::{MatchingError, Result};
use crate::feature::{CharacterState, FeatureBuilder, FeatureVector, Steering, UserInput};
use crate::kdtree::KdTree;
use crate::locomotion::Locomotion;
use crate::normalize::NormalizationStats;
use crate::playback::{Cursor, Playback};
use crate::pose::SkeletonPose;
use crate::trajectory::{desired_velocity, Horizon};

/// What a tick decided about clip selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDecision {
    /// Not a match tick.
    NoQuery,
    /// The best match is already playing or queued.
    Keep(Cursor),
    /// Playback was idle and starts at the best match.
    Start(Cursor),
    /// A cross-fade to the best match was queued.
    Transition(Cursor),
}

impl MatchDecision {
    /// Best match found on this tick, if a query ran.
    #[must_use]
    pub const fn best(&self) -> Option<Cursor> {
        match *self {
            Self::NoQuery => None,
            Self::Keep(c) | Self::Start(c) | Self::Transition(c) => Some(c),
        }
    }
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    /// Pose to apply; `None` until the first match.
    pub pose: Option<SkeletonPose>,
    /// Clip selection outcome.
    pub decision: MatchDecision,
    /// Root translation to apply this tick.
    pub root_displacement: Vector3<f64>,
}

/// Motion matching controller.
#[derive(Debug)]
pub struct MotionMatcher {
    config: MatcherConfig,
    library: Arc<ClipLibrary>,
    stats: Arc<NormalizationStats>,
    index: Arc<KdTree>,
    features: FeatureBuilder,
    playback: Playback,
    locomotion: Locomotion,
    ticks: u64,
    last_match_frame: Option<usize>,
}

impl MotionMatcher {
    /// Create a matcher over a clip library, its statistics and its index.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, if the statistics
    /// or index dimension differs from the configured feature layout, if the
    /// index is unbuilt or empty, or if any sample references a clip or frame
    /// outside the library.
    pub fn new(
        config: MatcherConfig,
        library: Arc<ClipLibrary>,
        stats: Arc<NormalizationStats>,
        index: Arc<KdTree>,
    ) -> Result<Self> {
        config.validate()?;

        let dim = config.feature_dim();
        if stats.dim() != dim {
            return Err(MatchingError::dimension_mismatch("statistics", dim, stats.dim()));
        }
        if index.dim() != dim {
            return Err(MatchingError::dimension_mismatch("index", dim, index.dim()));
        }
        if !index.is_built() {
            return Err(MatchingError::IndexNotBuilt);
        }
        if index.is_empty() {
            return Err(MatchingError::EmptyIndex);
        }
        for sample in index.samples() {
            let clip = library.get(sample.clip())?;
            if sample.frame() >= clip.frame_count() {
                return Err(MatchingError::invalid_config(format!(
                    "sample frame {} is outside clip '{}' with {} frames",
                    sample.frame(),
                    clip.name(),
                    clip.frame_count()
                )));
            }
        }

        log::info!(
            "Motion matcher ready: {} samples, {} clips, {dim} features, query every {} ticks",
            index.len(),
            library.len(),
            config.match_interval
        );

        Ok(Self {
            features: FeatureBuilder::new(config.clone()),
            playback: Playback::from_config(&config),
            locomotion: Locomotion::from_config(&config),
            config,
            library,
            stats,
            index,
            ticks: 0,
            last_match_frame: None,
        })
    }

    /// Run one fixed tick.
    ///
    /// # Errors
    ///
    /// Propagates index, normalization and playback errors; none occur with
    /// the inputs validated by [`MotionMatcher::new`].
    pub fn tick(&mut self, state: &CharacterState, input: &UserInput) -> Result<TickOutput> {
        let decision = if self.ticks % u64::from(self.config.match_interval) == 0 {
            self.match_cycle(state, input)?
        } else {
            MatchDecision::NoQuery
        };

        let pose = self.playback.advance(&self.library)?;
        self.features.record(state);

        let root_displacement = match self.config.root_motion {
            RootMotion::Animation => pose
                .as_ref()
                .and_then(SkeletonPose::root_translation)
                .unwrap_or_else(Vector3::zeros),
            RootMotion::Kinematic => self.locomotion.step(input),
        };

        self.ticks += 1;
        Ok(TickOutput {
            pose,
            decision,
            root_displacement,
        })
    }

    /// Normalized query vector for the current tick, without side effects.
    ///
    /// # Errors
    ///
    /// Returns an error if the playing cursor is outside the library.
    pub fn query_vector(&self, state: &CharacterState, input: &UserInput) -> Result<FeatureVector> {
        let steering = Steering {
            desired_velocity: desired_velocity(
                &input.stick,
                self.config.velocity_shaping,
                self.config.move_speed,
                self.stats.max_planar_velocity(),
            ),
            target_heading: input.target_heading,
            root_velocity: match self.config.root_motion {
                RootMotion::Animation => None,
                RootMotion::Kinematic => Some(self.locomotion.velocity()),
            },
        };
        let anim = self.anim_trajectory()?;
        let raw = self.features.build(state, &steering, &anim);
        self.stats.normalize(&raw)
    }

    fn anim_trajectory(&self) -> Result<[Vector2<f64>; 3]> {
        let Some(cursor) = self.playback.trajectory_cursor() else {
            return Ok([Vector2::zeros(); 3]);
        };
        let clip = self.library.get(cursor.clip)?;
        let scale = self.config.position_scale;
        Ok(Horizon::ALL.map(|h| clip.trajectory_ahead(cursor.frame, h.ticks(), scale)))
    }

    fn match_cycle(&mut self, state: &CharacterState, input: &UserInput) -> Result<MatchDecision> {
        let query = self.query_vector(state, input)?;
        let best = self.index.nearest(query.as_slice(), self.config.search_mode)?;
        Ok(self.decide(Cursor::new(best.clip(), best.frame())))
    }

    fn decide(&mut self, best: Cursor) -> MatchDecision {
        let last = self.last_match_frame;
        let already = |cursor: Option<Cursor>| {
            cursor.is_some_and(|c| {
                c.clip == best.clip && (c.frame == best.frame || last == Some(best.frame))
            })
        };

        if already(self.playback.current()) || already(self.playback.queued()) {
            log::debug!("Keeping playback: best match clip {} frame {} already in play", best.clip, best.frame);
            return MatchDecision::Keep(best);
        }

        let decision = if self.playback.state().is_idle() {
            MatchDecision::Start(best)
        } else {
            MatchDecision::Transition(best)
        };
        log::debug!(
            "Switching to clip '{}' frame {}",
            self.library.get(best.clip).map_or("?", |c| c.name()),
            best.frame
        );
        self.playback.request(best);
        self.last_match_frame = Some(best.frame);
        decision
    }

    /// Forget history and return to idle.
    pub fn reset(&mut self) {
        self.features.reset();
        self.playback.reset();
        self.locomotion.reset();
        self.ticks = 0;
        self.last_match_frame = None;
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Playback state machine.
    #[must_use]
    pub const fn playback(&self) -> &Playback {
        &self.playback
    }

    /// Ticks run since creation or the last reset.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Frame of the last match that switched clips.
    #[must_use]
    pub const fn last_match_frame(&self) -> Option<usize> {
        self.last_match_frame
    }

    /// Shared clip library.
    #[must_use]
    pub fn library(&self) -> &ClipLibrary {
        &self.library
    }
}
