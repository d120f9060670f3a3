//! Error types for motion matching operations.
//!
//! Every failure in this crate is structural: a bad data file, a mismatched
//! configuration or a caller violating an API contract. None of them are
//! transient, so nothing here is retried.

use thiserror::Error;

/// Main error type for motion matching operations.
#[derive(Error, Debug)]
pub enum MatchingError {
    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A vector or record has the wrong number of features.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A feature has zero standard deviation and cannot be normalized.
    #[error("Feature {index} has zero standard deviation")]
    ZeroVariance { index: usize },

    /// A statistics value is NaN or infinite.
    #[error("Non-finite statistic in {field} at index {index}")]
    NonFiniteStat { field: &'static str, index: usize },

    /// The statistics record could not be parsed.
    #[error("Malformed statistics at line {line}: {reason}")]
    MalformedStats { line: usize, reason: String },

    /// A precomputed sample row could not be parsed.
    #[error("Malformed sample row {row} for clip {clip}: {reason}")]
    MalformedSamples {
        clip: usize,
        row: usize,
        reason: String,
    },

    /// A clip joint has no matching node in the host skeleton.
    #[error("Joint '{0}' does not resolve to any skeleton node")]
    UnresolvedJoint(String),

    /// A clip joint resolves to more than one node in the host skeleton.
    #[error("Joint '{0}' resolves to more than one skeleton node")]
    AmbiguousJoint(String),

    /// Two clips do not share the same joint set and ordering.
    #[error("Joint set mismatch at joint {index}: '{left}' vs '{right}'")]
    JointSetMismatch {
        index: usize,
        left: String,
        right: String,
    },

    /// Clip data is structurally invalid.
    #[error("Invalid clip '{clip}': {reason}")]
    InvalidClip { clip: String, reason: String },

    /// A clip id does not exist in the library.
    #[error("Clip {clip} out of range: library holds {len} clips")]
    ClipOutOfRange { clip: usize, len: usize },

    /// The index was queried before `build()`.
    #[error("Spatial index queried before build")]
    IndexNotBuilt,

    /// The index was mutated or built after `build()`.
    #[error("Spatial index is already built")]
    IndexAlreadyBuilt,

    /// The index holds no samples.
    #[error("Spatial index is empty")]
    EmptyIndex,

    /// A query vector contains NaN or infinite values.
    #[error("Query vector has a non-finite value at index {0}")]
    NonFiniteQuery(usize),

    /// A lookahead horizon other than 20, 40 or 60 ticks.
    #[error("Invalid lookahead horizon {0}: expected 20, 40 or 60")]
    InvalidHorizon(u32),

    /// JSON statistics could not be decoded.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for motion matching operations.
pub type Result<T> = std::result::Result<T, MatchingError>;

impl MatchingError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a dimension mismatch error.
    #[must_use]
    pub const fn dimension_mismatch(context: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            actual,
        }
    }

    /// Create a malformed statistics error.
    #[must_use]
    pub fn malformed_stats(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedStats {
            line,
            reason: reason.into(),
        }
    }

    /// Create a malformed sample row error.
    #[must_use]
    pub fn malformed_samples(clip: usize, row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedSamples {
            clip,
            row,
            reason: reason.into(),
        }
    }

    /// Create an invalid clip error.
    #[must_use]
    pub fn invalid_clip(clip: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidClip {
            clip: clip.into(),
            reason: reason.into(),
        }
    }

    /// Create a joint set mismatch error.
    #[must_use]
    pub fn joint_set_mismatch(index: usize, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::JointSetMismatch {
            index,
            left: left.into(),
            right: right.into(),
        }
    }

    /// Whether this error reports bad input data or configuration rather
    /// than an API contract violation by the caller.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        match self {
            Self::InvalidConfig(_)
            | Self::DimensionMismatch { .. }
            | Self::ZeroVariance { .. }
            | Self::NonFiniteStat { .. }
            | Self::MalformedStats { .. }
            | Self::MalformedSamples { .. }
            | Self::UnresolvedJoint(_)
            | Self::AmbiguousJoint(_)
            | Self::InvalidClip { .. } => true,
            #[cfg(feature = "serde")]
            Self::Json(_) => true,
            Self::JointSetMismatch { .. }
            | Self::ClipOutOfRange { .. }
            | Self::IndexNotBuilt
            | Self::IndexAlreadyBuilt
            | Self::EmptyIndex
            | Self::NonFiniteQuery(_)
            | Self::InvalidHorizon(_) => false,
        }
    }
}
