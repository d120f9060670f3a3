//! Skeleton poses and their binding to host scene nodes.

use std::collections::HashMap;

use nalgebra::{UnitQuaternion, Vector3};

use crate::error::{MatchingError, Result};
use crate::math::interp::{slerp_rotation, slerp_vector};

/// Local transform of one joint.
#[derive(Debug, Clone, PartialEq)]
pub struct JointPose {
    /// Joint name.
    pub name: String,
    /// Local rotation.
    pub rotation: UnitQuaternion<f64>,
    /// Root translation delta for this tick; only set on the root joint when
    /// the clip drives the root.
    pub translation: Option<Vector3<f64>>,
}

/// Pose for every joint of the skeleton, in library joint order.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonPose {
    joints: Vec<JointPose>,
}

impl SkeletonPose {
    /// Create a pose from per-joint transforms.
    #[must_use]
    pub fn new(joints: Vec<JointPose>) -> Self {
        Self { joints }
    }

    /// Joint transforms in skeleton order.
    #[must_use]
    pub fn joints(&self) -> &[JointPose] {
        &self.joints
    }

    /// Transform of the named joint.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JointPose> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// Root translation delta, if the pose carries one.
    #[must_use]
    pub fn root_translation(&self) -> Option<Vector3<f64>> {
        self.joints.first().and_then(|j| j.translation)
    }

    /// Number of joints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// Whether the pose has no joints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Blend toward `other` by `t` in `[0, 1]`.
    ///
    /// Rotations are slerped. Root translations are slerped as vectors so a
    /// turn keeps its speed. At `t = 1` the result is exactly `other`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::JointSetMismatch`] if the joint names differ.
    pub fn blend(&self, other: &Self, t: f64) -> Result<Self> {
        let count = self.joints.len().max(other.joints.len());
        let mut joints = Vec::with_capacity(count);

        for index in 0..count {
            let (a, b) = match (self.joints.get(index), other.joints.get(index)) {
                (Some(a), Some(b)) if a.name == b.name => (a, b),
                (a, b) => {
                    return Err(MatchingError::joint_set_mismatch(
                        index,
                        a.map_or("<missing>", |j| j.name.as_str()),
                        b.map_or("<missing>", |j| j.name.as_str()),
                    ))
                }
            };

            let translation = match (a.translation, b.translation) {
                (Some(ta), Some(tb)) => Some(slerp_vector(&ta, &tb, t)),
                (ta, tb) if t >= 1.0 => tb.or(ta),
                (ta, tb) => ta.or(tb),
            };

            joints.push(JointPose {
                name: a.name.clone(),
                rotation: slerp_rotation(&a.rotation, &b.rotation, t),
                translation,
            });
        }

        Ok(Self { joints })
    }
}

/// Resolution of library joint names to host scene nodes.
///
/// Each library joint must match exactly one host node by name.
#[derive(Debug, Clone)]
pub struct SkeletonBinding<H> {
    names: Vec<String>,
    handles: Vec<H>,
}

impl<H: Clone> SkeletonBinding<H> {
    /// Bind library joints to host nodes given as `(name, handle)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::UnresolvedJoint`] for a joint with no host
    /// node and [`MatchingError::AmbiguousJoint`] for a joint whose name
    /// appears on several host nodes.
    pub fn resolve<'a, S>(
        joint_names: impl IntoIterator<Item = &'a str>,
        host_nodes: impl IntoIterator<Item = (S, H)>,
    ) -> Result<Self>
    where
        S: Into<String>,
    {
        let mut by_name: HashMap<String, (H, usize)> = HashMap::new();
        for (name, handle) in host_nodes {
            by_name
                .entry(name.into())
                .and_modify(|(_, count)| *count += 1)
                .or_insert((handle, 1));
        }

        let mut names = Vec::new();
        let mut handles = Vec::new();
        for name in joint_names {
            match by_name.get(name) {
                None => return Err(MatchingError::UnresolvedJoint(name.to_string())),
                Some((_, count)) if *count > 1 => {
                    return Err(MatchingError::AmbiguousJoint(name.to_string()))
                }
                Some((handle, _)) => {
                    names.push(name.to_string());
                    handles.push(handle.clone());
                }
            }
        }

        log::debug!("Bound {} joints to host nodes", handles.len());
        Ok(Self { names, handles })
    }
}

impl<H> SkeletonBinding<H> {
    /// Host handle of the joint at `index`.
    #[must_use]
    pub fn handle(&self, index: usize) -> Option<&H> {
        self.handles.get(index)
    }

    /// Number of bound joints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no joint is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Visit every `(handle, joint pose)` pair of `pose`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::JointSetMismatch`] if the pose's joints are
    /// not the bound joints in bound order.
    pub fn apply(&self, pose: &SkeletonPose, mut f: impl FnMut(&H, &JointPose)) -> Result<()> {
        if pose.len() != self.names.len() {
            return Err(MatchingError::dimension_mismatch(
                "pose joints",
                self.names.len(),
                pose.len(),
            ));
        }
        for (index, (name, joint)) in self.names.iter().zip(pose.joints()).enumerate() {
            if *name != joint.name {
                return Err(MatchingError::joint_set_mismatch(index, name.as_str(), joint.name.as_str()));
            }
        }
        for (handle, joint) in self.handles.iter().zip(pose.joints()) {
            f(handle, joint);
        }
        Ok(())
    }
}
