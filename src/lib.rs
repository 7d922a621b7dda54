//! Grapple Swing - movement and grapple core of a 2.5D physics platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (player, grapple, stun, platforms, physics)
//! - `settings`: Data-driven tuning
//! - `scene`: Level description and rig validation
//! - `error`: Setup errors

pub mod error;
pub mod scene;
pub mod settings;
pub mod sim;

pub use error::SetupError;
pub use scene::SceneDesc;
pub use settings::Tuning;

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Fixed physics timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame delta accepted by the loop (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Distance under which a moving platform counts as arrived
    pub const ARRIVE_EPSILON: f32 = 1.0e-3;
    /// Angle (radians) under which a rotating platform counts as arrived
    pub const ANGLE_EPSILON: f32 = 1.0e-3;

    /// Ground probe: footprint is narrowed by this much on each side
    pub const GROUND_SKIN: f32 = 0.1;
    /// Ground probe: cast extends this far below the collider
    pub const GROUND_MARGIN: f32 = 0.1;

    /// Lookahead of the grapple tip ray while shooting
    pub const GRAPPLE_TIP_LOOKAHEAD: f32 = 0.4;
    /// Swing input magnitude below which the push is considered released
    pub const SWING_DEAD_ZONE: f32 = 0.1;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Move `current` toward `target` by at most `max_delta`
#[inline]
pub fn move_towards(current: Vec2, target: Vec2, max_delta: f32) -> Vec2 {
    let delta = target - current;
    let dist = delta.length();
    if dist <= max_delta || dist <= f32::EPSILON {
        target
    } else {
        current + delta / dist * max_delta
    }
}

/// Rotate angle `current` toward `target` (radians) by at most `max_delta`,
/// taking the shortest way around
#[inline]
pub fn rotate_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = normalize_angle(target - current);
    if delta.abs() <= max_delta {
        target
    } else {
        normalize_angle(current + delta.signum() * max_delta)
    }
}

/// Rotate a vector by `angle` radians
#[inline]
pub fn rotate_vec(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(-FRAC_PI_2) + FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_move_towards_snaps_when_close() {
        let p = move_towards(Vec2::ZERO, Vec2::new(0.5, 0.0), 1.0);
        assert_eq!(p, Vec2::new(0.5, 0.0));

        let p = move_towards(Vec2::ZERO, Vec2::new(10.0, 0.0), 1.0);
        assert!((p.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_towards_shortest_way() {
        // From 170° to -170° should go through 180°, not back through 0°
        let from = 170f32.to_radians();
        let to = -170f32.to_radians();
        let step = rotate_towards(from, to, 5f32.to_radians());
        assert!((normalize_angle(step - 175f32.to_radians())).abs() < 1e-4);

        assert_eq!(rotate_towards(0.0, 0.01, 1.0), 0.01);
    }

    #[test]
    fn test_rotate_vec() {
        let v = rotate_vec(Vec2::X, FRAC_PI_2);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }
}
