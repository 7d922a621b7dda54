//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (by collider and platform id)
//! - No rendering or input-device dependencies

pub mod collision;
pub mod curve;
pub mod events;
pub mod grapple;
pub mod ground;
pub mod motor;
pub mod platform;
pub mod player;
pub mod state;
pub mod stun;
pub mod tick;
pub mod world;

pub use collision::{LayerMask, Obb};
pub use curve::{Keyframe, MotionCurve};
pub use events::{EventQueue, PlayerEvent, SwingPush};
pub use grapple::{GrappleLink, GrapplePhase, GrappleState, GrappleStateMachine, retract_duration};
pub use ground::GroundSensor;
pub use motor::SidewaysMotor;
pub use platform::{
    BreakingConfig, MovingConfig, Platform, PlatformBody, PlatformContract, PlatformId, PlatformKind,
    PlatformRegistry, RotatingConfig,
};
pub use player::{AnchorMount, GrappleRig, PlayerOrchestrator};
pub use state::{DebugSettings, FrameInput, GamePhase, PlayerBody};
pub use stun::{StunEvent, StunSystem};
pub use tick::Simulation;
pub use world::{ContactEvent, JointAnchor, RigidBody, SpringJoint, World};
