//! Mathematical utilities for motion matching.
//!
//! This module provides:
//! - [`angles`]: angle wrapping, headings and capture Euler conversion
//! - [`interp`]: rotation and vector slerp for cross-fades

pub mod angles;
pub mod interp;

pub use angles::{capture_rotation, heading_delta, normalize_heading, stick_heading, wrap_angle};
pub use interp::{slerp_rotation, slerp_vector};
