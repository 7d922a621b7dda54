//! Gameplay tuning
//!
//! Every number and curve that shapes how the player walks, gets stunned and
//! swings. Loaded from JSON next to the scene, validated once at setup.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::sim::collision::LayerMask;
use crate::sim::curve::{Keyframe, MotionCurve};

/// Tunable player and grapple parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Player ===
    /// Gravity acceleration (world units/s², negative is down)
    pub gravity: f32,
    /// Horizontal speed while grounded
    pub sideways_move_speed: f32,

    // === Stun ===
    /// Widest angle (degrees) between the contact normal and the horizontal
    /// axis that still counts as a side hit
    pub max_stun_angle: f32,
    /// Minimum speed before impact needed to get stunned
    pub min_velocity_stun_threshold: f32,
    /// Scales the pre-impact speed into the bounce velocity
    pub stun_bounce_multiplier: f32,

    // === Grapple ===
    /// Seconds for the tip to travel the full distance
    pub grapple_travel_time: f32,
    /// Base seconds for a full-length retract
    pub grapple_retract_time: f32,
    pub max_grapple_distance: f32,
    /// Direction the grapple is fired in (normalized on use)
    pub shoot_direction: Vec2,
    /// Layers the grapple tip can hit
    pub platform_layer: LayerMask,
    pub grapple_travel_motion: MotionCurve,
    pub grapple_retract_motion: MotionCurve,
    /// Scales retract time by grapple length (fraction of max distance)
    pub grapple_retract_time_decay: MotionCurve,

    // === Swing ===
    pub horizontal_force: f32,
    /// Fraction of velocity lost on latching (0-1)
    pub latch_velocity_falloff: f32,

    // === Spring joint ===
    /// Max joint distance as a multiple of the grapple length at latch time
    pub joint_max_distance: f32,
    /// Min joint distance as a multiple of the grapple length at latch time
    pub joint_min_distance: f32,
    pub spring: f32,
    pub damper: f32,
    pub mass_scale: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: -20.0,
            sideways_move_speed: 6.0,

            max_stun_angle: 30.0,
            min_velocity_stun_threshold: 8.0,
            stun_bounce_multiplier: 0.5,

            grapple_travel_time: 0.3,
            grapple_retract_time: 0.25,
            max_grapple_distance: 10.0,
            shoot_direction: Vec2::Y,
            platform_layer: LayerMask::PLATFORM,
            grapple_travel_motion: MotionCurve::EaseOut,
            grapple_retract_motion: MotionCurve::EaseIn,
            grapple_retract_time_decay: MotionCurve::Keyframes {
                keys: vec![Keyframe::new(0.0, 0.3), Keyframe::new(1.0, 1.0)],
            },

            horizontal_force: 12.0,
            latch_velocity_falloff: 0.5,

            joint_max_distance: 0.8,
            joint_min_distance: 0.25,
            spring: 4.5,
            damper: 7.0,
            mass_scale: 4.5,
        }
    }
}

impl Tuning {
    /// Cosine of the stun angle; contacts whose horizontal component exceeds
    /// this are side hits
    pub fn stun_side_threshold(&self) -> f32 {
        self.max_stun_angle.to_radians().cos()
    }

    /// Normalized shoot direction
    pub fn shoot_dir(&self) -> Vec2 {
        self.shoot_direction.normalize_or(Vec2::Y)
    }

    /// Check ranges and curve shapes
    pub fn validate(&self) -> Result<(), SetupError> {
        let positive = [
            ("grapple_travel_time", self.grapple_travel_time),
            ("grapple_retract_time", self.grapple_retract_time),
            ("max_grapple_distance", self.max_grapple_distance),
        ];
        for (name, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SetupError::InvalidTuning(format!("{} must be positive, got {}", name, value)));
            }
        }

        if !(0.0..=1.0).contains(&self.latch_velocity_falloff) {
            return Err(SetupError::InvalidTuning(format!(
                "latch_velocity_falloff must be within [0, 1], got {}",
                self.latch_velocity_falloff
            )));
        }
        if !(0.0..=180.0).contains(&self.max_stun_angle) {
            return Err(SetupError::InvalidTuning(format!(
                "max_stun_angle must be within [0, 180], got {}",
                self.max_stun_angle
            )));
        }
        if self.joint_min_distance > self.joint_max_distance {
            return Err(SetupError::InvalidTuning(
                "joint_min_distance exceeds joint_max_distance".to_string(),
            ));
        }
        if self.shoot_direction.length_squared() < 1e-6 {
            return Err(SetupError::InvalidTuning("shoot_direction is zero".to_string()));
        }

        for (name, curve) in [
            ("grapple_travel_motion", &self.grapple_travel_motion),
            ("grapple_retract_motion", &self.grapple_retract_motion),
            ("grapple_retract_time_decay", &self.grapple_retract_time_decay),
        ] {
            if !curve.is_well_formed() {
                return Err(SetupError::InvalidTuning(format!("{} has malformed keys", name)));
            }
        }
        // Shorter grapples must never take longer to retract
        if !self.grapple_retract_time_decay.is_non_decreasing() {
            return Err(SetupError::InvalidTuning(
                "grapple_retract_time_decay must be non-decreasing".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate tuning from JSON
    pub fn from_json(json: &str) -> Result<Self, SetupError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, SetupError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Save tuning to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SetupError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!("Tuning saved to {}", path.display());
        Ok(())
    }
}
