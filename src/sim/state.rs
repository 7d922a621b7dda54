//! Core player and session state shared by the simulation systems

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::world::RigidBody;

/// Whether the session accepts gameplay input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    #[default]
    Playing,
    /// Physics keeps running, input is ignored
    Paused,
}

/// Developer toggles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugSettings {
    /// Suppresses all gameplay input while set
    pub god_mode: bool,
}

/// Raw input sampled once per rendered frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    /// Horizontal axis in [-1, 1]
    pub horizontal: f32,
    /// Grapple button held
    pub activate: bool,
}

impl FrameInput {
    pub fn new(horizontal: f32, activate: bool) -> Self {
        Self {
            horizontal: horizontal.clamp(-1.0, 1.0),
            activate,
        }
    }
}

/// The player's rigid body plus its movement flags
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerBody {
    pub rigid: RigidBody,
    /// Standing on something and not swinging
    pub grounded: bool,
    pub stunned: bool,
}

impl PlayerBody {
    pub fn new(rigid: RigidBody) -> Self {
        Self {
            rigid,
            grounded: false,
            stunned: false,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.rigid.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.rigid.velocity
    }
}
