//! Sideways motor: direct horizontal control while on the ground

use super::world::RigidBody;

/// Binary walk: full speed in the input direction or a dead stop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SidewaysMotor {
    pub speed: f32,
}

impl SidewaysMotor {
    pub fn new(speed: f32) -> Self {
        Self { speed }
    }

    /// Set horizontal velocity from input. The caller only invokes this while
    /// grounded and not stunned.
    pub fn apply(&self, body: &mut RigidBody, input: f32) {
        body.velocity.x = input * self.speed;
    }
}
