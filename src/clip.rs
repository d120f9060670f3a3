//! Motion clips and the clip library.
//!
//! A clip stores one value per frame for every channel of every joint.
//! Rotation channels hold Euler angles in degrees. Only the root joint
//! (joint 0) may carry position channels, stored in capture units and scaled
//! on read. A rotation-only root has no root motion.
//!
//! Planar root motion is expressed in the character frame: X is mirrored
//! and the vertical component is dropped.

use nalgebra::{UnitQuaternion, Vector2, Vector3};

use crate::error::{MatchingError, Result};
use crate::math::angles::capture_rotation;

/// Kind of a per-frame channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    XPosition,
    YPosition,
    ZPosition,
    XRotation,
    YRotation,
    ZRotation,
}

impl ChannelKind {
    /// Whether this is a translation channel.
    #[must_use]
    pub const fn is_position(self) -> bool {
        matches!(self, Self::XPosition | Self::YPosition | Self::ZPosition)
    }
}

/// One animated channel of a joint.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    kind: ChannelKind,
    values: Vec<f64>,
}

impl Channel {
    /// Create a channel from its per-frame values.
    #[must_use]
    pub fn new(kind: ChannelKind, values: Vec<f64>) -> Self {
        Self { kind, values }
    }

    /// Channel kind.
    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Per-frame values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A named joint with its channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    name: String,
    channels: Vec<Channel>,
}

impl Joint {
    /// Create a joint. The root carries six channels, other joints the three
    /// rotation channels.
    #[must_use]
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        Self {
            name: name.into(),
            channels,
        }
    }

    /// Joint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All channels in declaration order.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Channel of the given kind, if present.
    #[must_use]
    pub fn channel(&self, kind: ChannelKind) -> Option<&Channel> {
        self.channels.iter().find(|c| c.kind == kind)
    }

    /// Whether the joint has all three position channels.
    #[must_use]
    pub fn has_position(&self) -> bool {
        [ChannelKind::XPosition, ChannelKind::YPosition, ChannelKind::ZPosition]
            .into_iter()
            .all(|k| self.channel(k).is_some())
    }

    // `frame` is validated by the caller; an absent channel (a rotation-only root) reads as 0.
    fn value(&self, kind: ChannelKind, frame: usize) -> f64 {
        self.channel(kind).map_or(0.0, |c| c.values[frame])
    }
}

/// An immutable motion clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    name: String,
    joints: Vec<Joint>,
    frame_count: usize,
    frame_time: f64,
}

impl Clip {
    /// Create a clip.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::InvalidClip`] if the clip has no joints or
    /// frames, a non-positive frame time, a joint without its three rotation
    /// channels, a root with only some of its position channels, a non-root joint with
    /// position channels, duplicate channel kinds, a channel whose length is
    /// not `frame_count`, or a non-finite value.
    pub fn new(
        name: impl Into<String>,
        joints: Vec<Joint>,
        frame_count: usize,
        frame_time: f64,
    ) -> Result<Self> {
        let name = name.into();
        let fail = |reason: String| Err(MatchingError::invalid_clip(name.clone(), reason));

        if joints.is_empty() {
            return fail("clip has no joints".into());
        }
        if frame_count == 0 {
            return fail("clip has no frames".into());
        }
        if !(frame_time > 0.0 && frame_time.is_finite()) {
            return fail(format!("frame time {frame_time} must be positive"));
        }

        for (i, joint) in joints.iter().enumerate() {
            for (j, channel) in joint.channels.iter().enumerate() {
                if joint.channels[..j].iter().any(|c| c.kind == channel.kind) {
                    return fail(format!("joint '{}' repeats channel {:?}", joint.name, channel.kind));
                }
                if channel.values.len() != frame_count {
                    return fail(format!(
                        "joint '{}' channel {:?} has {} values for {frame_count} frames",
                        joint.name,
                        channel.kind,
                        channel.values.len()
                    ));
                }
                if let Some(frame) = channel.values.iter().position(|v| !v.is_finite()) {
                    return fail(format!(
                        "joint '{}' channel {:?} is not finite at frame {frame}",
                        joint.name, channel.kind
                    ));
                }
            }

            let rotations = [ChannelKind::XRotation, ChannelKind::YRotation, ChannelKind::ZRotation];
            if !rotations.into_iter().all(|k| joint.channel(k).is_some()) {
                return fail(format!("joint '{}' lacks rotation channels", joint.name));
            }
            let positions = joint.channels.iter().filter(|c| c.kind.is_position()).count();
            if i == 0 && positions != 0 && !joint.has_position() {
                return fail(format!("root joint '{}' has a partial position set", joint.name));
            }
            if i > 0 && joint.channels.iter().any(|c| c.kind.is_position()) {
                return fail(format!("non-root joint '{}' has position channels", joint.name));
            }
        }

        Ok(Self {
            name,
            joints,
            frame_count,
            frame_time,
        })
    }

    /// Clip name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Joints in skeleton order; joint 0 is the root.
    #[must_use]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Number of frames.
    #[must_use]
    pub const fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Seconds per frame.
    #[must_use]
    pub const fn frame_time(&self) -> f64 {
        self.frame_time
    }

    /// Index of the last frame.
    #[must_use]
    pub const fn last_frame(&self) -> usize {
        self.frame_count - 1
    }

    /// Clamp a frame index to the clip; past the end holds the last frame.
    #[must_use]
    pub fn clamp_frame(&self, frame: usize) -> usize {
        if frame > self.last_frame() {
            log::trace!(
                "Frame {frame} past the end of clip '{}', holding frame {}",
                self.name,
                self.last_frame()
            );
            self.last_frame()
        } else {
            frame
        }
    }

    fn root(&self) -> &Joint {
        &self.joints[0]
    }

    /// Planar root position `(x, z)` at a frame, X mirrored.
    fn planar_root(&self, frame: usize, position_scale: f64) -> Vector2<f64> {
        let root = self.root();
        Vector2::new(
            -root.value(ChannelKind::XPosition, frame) * position_scale,
            root.value(ChannelKind::ZPosition, frame) * position_scale,
        )
    }

    /// Root translation between `frame - 1` and `frame`, X mirrored and
    /// Y zeroed. Frame 0 has no predecessor and yields zero; so does any
    /// frame past the end, where the clip holds its last pose in place.
    #[must_use]
    pub fn root_delta(&self, frame: usize, position_scale: f64) -> Vector3<f64> {
        if frame == 0 || frame > self.last_frame() {
            return Vector3::zeros();
        }
        let d = self.planar_root(frame, position_scale) - self.planar_root(frame - 1, position_scale);
        Vector3::new(d.x, 0.0, d.y)
    }

    /// Planar root displacement `(x, z)` from `frame` to `frame + ticks`.
    ///
    /// Both frames are clamped to the clip.
    #[must_use]
    pub fn trajectory_ahead(&self, frame: usize, ticks: u32, position_scale: f64) -> Vector2<f64> {
        let start = self.clamp_frame(frame);
        let end = self.clamp_frame(frame.saturating_add(ticks as usize));
        self.planar_root(end, position_scale) - self.planar_root(start, position_scale)
    }

    /// Local rotation of a joint at a frame (clamped).
    ///
    /// # Panics
    ///
    /// Panics if `joint` is out of range.
    #[must_use]
    pub fn joint_rotation(&self, joint: usize, frame: usize) -> UnitQuaternion<f64> {
        let frame = self.clamp_frame(frame);
        let j = &self.joints[joint];
        capture_rotation(
            j.value(ChannelKind::XRotation, frame),
            j.value(ChannelKind::YRotation, frame),
            j.value(ChannelKind::ZRotation, frame),
        )
    }

    /// Whether `other` has the same joint names in the same order.
    #[must_use]
    pub fn same_joints(&self, other: &Self) -> bool {
        self.joints.len() == other.joints.len()
            && self.joints.iter().zip(&other.joints).all(|(a, b)| a.name == b.name)
    }
}

/// All clips available to the matcher, sharing one joint set.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipLibrary {
    clips: Vec<Clip>,
}

impl ClipLibrary {
    /// Create a library.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::InvalidConfig`] for an empty library and
    /// [`MatchingError::JointSetMismatch`] when a clip's joint names or order
    /// differ from the first clip's.
    pub fn new(clips: Vec<Clip>) -> Result<Self> {
        let Some(first) = clips.first() else {
            return Err(MatchingError::invalid_config("clip library is empty"));
        };

        for clip in &clips[1..] {
            let count = first.joints.len().max(clip.joints.len());
            for index in 0..count {
                let left = first.joints.get(index).map_or("<missing>", Joint::name);
                let right = clip.joints.get(index).map_or("<missing>", Joint::name);
                if left != right {
                    return Err(MatchingError::joint_set_mismatch(index, left, right));
                }
            }
        }

        log::info!(
            "Loaded clip library: {} clips, {} joints, {} frames",
            clips.len(),
            first.joints.len(),
            clips.iter().map(Clip::frame_count).sum::<usize>()
        );
        Ok(Self { clips })
    }

    /// Clip by id.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::ClipOutOfRange`] for an unknown id.
    pub fn get(&self, clip: usize) -> Result<&Clip> {
        self.clips.get(clip).ok_or(MatchingError::ClipOutOfRange {
            clip,
            len: self.clips.len(),
        })
    }

    /// Id of the clip with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.clips.iter().position(|c| c.name == name)
    }

    /// All clips in id order.
    #[must_use]
    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    /// Number of clips.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Always false; a library holds at least one clip.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Shared joint names in skeleton order.
    pub fn joint_names(&self) -> impl Iterator<Item = &str> {
        self.clips[0].joints.iter().map(Joint::name)
    }
}
