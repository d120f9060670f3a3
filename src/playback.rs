//! Frame-stepping playback with cross-fades between clips.
//!
//! ```text
//!   Idle ──request──▶ Playing ──request──▶ Transitioning { tick: 1 }
//!                        ▲                     │  tick += 1 each advance
//!                        └── tick == length ───┘  (commit: current ← next)
//! ```
//!
//! While transitioning both cursors advance one frame per tick and the pose
//! is blended toward the incoming clip by `tick / transition_length`, so the
//! final transition tick already shows the incoming clip exactly.

use nalgebra::Vector3;

use crate::clip::{Clip, ClipLibrary};
use crate::config::{MatcherConfig, RootMotion};
use crate::error::Result;
use crate::pose::{JointPose, SkeletonPose};

/// A position in the clip library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    /// Clip id.
    pub clip: usize,
    /// Frame within the clip.
    pub frame: usize,
}

impl Cursor {
    /// Create a cursor.
    #[must_use]
    pub const fn new(clip: usize, frame: usize) -> Self {
        Self { clip, frame }
    }

    const fn step(self) -> Self {
        Self {
            clip: self.clip,
            frame: self.frame.saturating_add(1),
        }
    }
}

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing has been requested yet.
    #[default]
    Idle,
    /// Playing a single clip.
    Playing { current: Cursor },
    /// Cross-fading from `current` to `next`; `tick` runs from 1 to the
    /// transition length.
    Transitioning {
        current: Cursor,
        next: Cursor,
        tick: u32,
    },
}

impl PlaybackState {
    /// Cursor of the clip being played, if any.
    #[must_use]
    pub const fn current(&self) -> Option<Cursor> {
        match *self {
            Self::Idle => None,
            Self::Playing { current } | Self::Transitioning { current, .. } => Some(current),
        }
    }

    /// Cursor of the incoming clip during a transition.
    #[must_use]
    pub const fn queued(&self) -> Option<Cursor> {
        match *self {
            Self::Transitioning { next, .. } => Some(next),
            _ => None,
        }
    }

    /// Whether nothing is playing.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// Playback state machine producing one skeleton pose per tick.
#[derive(Debug, Clone)]
pub struct Playback {
    state: PlaybackState,
    transition_length: u32,
    root_motion: RootMotion,
    position_scale: f64,
    root_position: Vector3<f64>,
}

impl Playback {
    /// Create an idle playback.
    ///
    /// A `transition_length` of 0 is treated as 1.
    #[must_use]
    pub fn new(transition_length: u32, root_motion: RootMotion, position_scale: f64) -> Self {
        Self {
            state: PlaybackState::Idle,
            transition_length: transition_length.max(1),
            root_motion,
            position_scale,
            root_position: Vector3::zeros(),
        }
    }

    /// Create an idle playback from a matcher configuration.
    #[must_use]
    pub fn from_config(config: &MatcherConfig) -> Self {
        Self::new(config.transition_length, config.root_motion, config.position_scale)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// Cursor of the clip being played, if any.
    #[must_use]
    pub const fn current(&self) -> Option<Cursor> {
        self.state.current()
    }

    /// Cursor of the incoming clip during a transition.
    #[must_use]
    pub const fn queued(&self) -> Option<Cursor> {
        self.state.queued()
    }

    /// Cursor whose future trajectory describes where the character is
    /// heading: the incoming clip while transitioning, else the current one.
    #[must_use]
    pub const fn trajectory_cursor(&self) -> Option<Cursor> {
        match self.state {
            PlaybackState::Idle => None,
            PlaybackState::Playing { current } => Some(current),
            PlaybackState::Transitioning { next, .. } => Some(next),
        }
    }

    /// Number of ticks in a cross-fade.
    #[must_use]
    pub const fn transition_length(&self) -> u32 {
        self.transition_length
    }

    /// Accumulated root position from clip root motion.
    #[must_use]
    pub const fn root_position(&self) -> Vector3<f64> {
        self.root_position
    }

    /// Switch to `target`: start playing it when idle, otherwise cross-fade
    /// to it from tick 1, replacing any pending target.
    pub fn request(&mut self, target: Cursor) {
        self.state = match self.state {
            PlaybackState::Idle => PlaybackState::Playing { current: target },
            PlaybackState::Playing { current } | PlaybackState::Transitioning { current, .. } => {
                PlaybackState::Transitioning {
                    current,
                    next: target,
                    tick: 1,
                }
            }
        };
    }

    /// Cut to `target` without blending.
    pub fn play(&mut self, target: Cursor) {
        self.state = PlaybackState::Playing { current: target };
    }

    /// Return to idle and zero the tracked root.
    pub fn reset(&mut self) {
        self.state = PlaybackState::Idle;
        self.root_position = Vector3::zeros();
    }

    /// Produce this tick's pose and step every cursor by one frame.
    ///
    /// Returns `None` while idle.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MatchingError::ClipOutOfRange`] for a cursor outside
    /// the library and [`crate::MatchingError::JointSetMismatch`] when the two
    /// blended clips disagree on joints.
    pub fn advance(&mut self, library: &ClipLibrary) -> Result<Option<SkeletonPose>> {
        let (pose, state) = match self.state {
            PlaybackState::Idle => return Ok(None),
            PlaybackState::Playing { current } => {
                let pose = self.sample(library.get(current.clip)?, current.frame);
                (pose, PlaybackState::Playing { current: current.step() })
            }
            PlaybackState::Transitioning {
                current,
                next,
                tick,
            } => {
                let from = self.sample(library.get(current.clip)?, current.frame);
                let to = self.sample(library.get(next.clip)?, next.frame);
                let t = f64::from(tick) / f64::from(self.transition_length);
                let pose = from.blend(&to, t)?;

                let state = if tick >= self.transition_length {
                    log::trace!("Transition committed to clip {} frame {}", next.clip, next.frame);
                    PlaybackState::Playing { current: next.step() }
                } else {
                    PlaybackState::Transitioning {
                        current: current.step(),
                        next: next.step(),
                        tick: tick + 1,
                    }
                };
                (pose, state)
            }
        };

        if let Some(delta) = pose.root_translation() {
            self.root_position += delta;
        }
        self.state = state;
        Ok(Some(pose))
    }

    /// Unblended pose of one clip frame.
    fn sample(&self, clip: &Clip, frame: usize) -> SkeletonPose {
        let drives_root = self.root_motion == RootMotion::Animation;
        let joints = clip
            .joints()
            .iter()
            .enumerate()
            .map(|(i, joint)| JointPose {
                name: joint.name().to_string(),
                rotation: clip.joint_rotation(i, frame),
                translation: (i == 0 && drives_root).then(|| clip.root_delta(frame, self.position_scale)),
            })
            .collect();
        SkeletonPose::new(joints)
    }
}
