//! Kinematic root controller driven by the stick.
//!
//! Used when [`RootMotion::Kinematic`](crate::RootMotion::Kinematic) is
//! selected: the clips only animate the joints and this controller moves
//! the character, accelerating toward the target speed.

use nalgebra::{Vector2, Vector3};

use crate::config::MatcherConfig;
use crate::feature::UserInput;

/// Speeds within this band of the target snap to it.
const SPEED_TOLERANCE: f64 = 0.1;

/// Stick-driven root velocity integrator.
#[derive(Debug, Clone, PartialEq)]
pub struct Locomotion {
    move_speed: f64,
    speed_change_rate: f64,
    tick_duration: f64,
    velocity: Vector3<f64>,
}

impl Locomotion {
    /// Create a controller at rest.
    #[must_use]
    pub fn new(move_speed: f64, speed_change_rate: f64, tick_duration: f64) -> Self {
        Self {
            move_speed,
            speed_change_rate,
            tick_duration,
            velocity: Vector3::zeros(),
        }
    }

    /// Create a controller from a matcher configuration.
    #[must_use]
    pub fn from_config(config: &MatcherConfig) -> Self {
        Self::new(config.move_speed, config.speed_change_rate, config.tick_duration)
    }

    /// Velocity produced by the last step.
    #[must_use]
    pub const fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    /// Planar speed of the last step.
    #[must_use]
    pub fn speed(&self) -> f64 {
        Vector2::new(self.velocity.x, self.velocity.z).norm()
    }

    /// Advance one tick and return the root displacement.
    pub fn step(&mut self, input: &UserInput) -> Vector3<f64> {
        let dt = self.tick_duration;
        let target = if input.is_active() { self.move_speed } else { 0.0 };
        let current = self.speed();

        let speed = if (current - target).abs() > SPEED_TOLERANCE {
            let t = (dt * self.speed_change_rate).clamp(0.0, 1.0);
            let eased = current + (target * input.stick.norm() - current) * t;
            (eased * 1000.0).round() / 1000.0
        } else {
            target
        };

        let direction = input.stick.try_normalize(f64::EPSILON).unwrap_or_else(Vector2::zeros);
        let displacement = Vector3::new(direction.x, 0.0, direction.y) * (speed * dt);
        self.velocity = displacement / dt;
        displacement
    }

    /// Stop the character.
    pub fn reset(&mut self) {
        self.velocity = Vector3::zeros();
    }
}
