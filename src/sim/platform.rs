//! Grapple-able platforms
//!
//! The player core only sees a platform through [`PlatformContract`]: its
//! kind, whether it may be grappled, and a latched flag the grapple sets and
//! clears. Movement, rotation and breaking live here and are driven by
//! `should_activate || is_latched`, so a platform typically starts doing its
//! thing once the player hooks onto it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{LayerMask, Obb};
use crate::consts::{ANGLE_EPSILON, ARRIVE_EPSILON};
use crate::{move_towards, normalize_angle, rotate_towards};

/// Stable handle into the [`PlatformRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlatformId(pub u32);

/// How the grapple anchors to a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    /// Anchor is a fixed world point
    #[default]
    Fixed,
    /// Anchor rides along with the platform's body
    Attached,
}

/// What the player core may read and write on a platform
pub trait PlatformContract {
    fn kind(&self) -> PlatformKind;
    fn is_valid(&self) -> bool;
    fn is_latched(&self) -> bool;
    fn set_latched(&mut self, latched: bool);
}

/// Kinematic body of a platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformBody {
    pub position: Vec2,
    /// Radians, counter-clockwise
    pub angle: f32,
    pub half_extents: Vec2,
    /// Linear velocity over the last step
    pub velocity: Vec2,
    /// Angular velocity over the last step (rad/s)
    pub angular_velocity: f32,
}

impl PlatformBody {
    pub fn new(position: Vec2, half_extents: Vec2, angle: f32) -> Self {
        Self {
            position,
            angle,
            half_extents,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
        }
    }

    pub fn obb(&self) -> Obb {
        Obb::new(self.position, self.half_extents, self.angle)
    }

    /// Local point to world space
    pub fn transform_point(&self, local: Vec2) -> Vec2 {
        self.obb().to_world(local)
    }

    /// World point to the body's local frame
    pub fn inverse_transform_point(&self, world: Vec2) -> Vec2 {
        self.obb().to_local(world)
    }

    /// Velocity of a world point rigidly attached to the body
    pub fn point_velocity(&self, world: Vec2) -> Vec2 {
        let r = world - self.position;
        self.velocity + r.perp() * self.angular_velocity
    }
}

/// Moving behaviour parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingConfig {
    pub speed: f32,
    pub destination: Vec2,
    /// Pause before heading back to the start once deactivated
    #[serde(default)]
    pub time_to_wait: f32,
    /// Pause at each end of the path
    #[serde(default)]
    pub time_on_destination: f32,
}

/// Ping-pongs a platform between its start and a destination
#[derive(Debug, Clone)]
pub struct MovingBehavior {
    pub config: MovingConfig,
    start: Vec2,
    going_back: bool,
    wait_cooldown: f32,
    destination_cooldown: f32,
}

impl MovingBehavior {
    pub fn new(config: MovingConfig, start: Vec2) -> Self {
        Self {
            wait_cooldown: config.time_to_wait,
            config,
            start,
            going_back: false,
            destination_cooldown: 0.0,
        }
    }

    pub fn is_going_back(&self) -> bool {
        self.going_back
    }

    fn step(&mut self, dt: f32, active: bool, body: &mut PlatformBody) {
        if active {
            if self.destination_cooldown > 0.0 {
                self.destination_cooldown -= dt;
            } else {
                self.destination_cooldown = 0.0;
                self.advance(dt, body);
            }
        } else if body.position.distance(self.start) > ARRIVE_EPSILON {
            // Released: linger, then drift home
            self.destination_cooldown = 0.0;
            if self.wait_cooldown > 0.0 {
                self.wait_cooldown -= dt;
            } else {
                body.position = move_towards(body.position, self.start, self.config.speed * dt);
            }
        } else {
            self.destination_cooldown = 0.0;
            self.wait_cooldown = self.config.time_to_wait;
            self.going_back = false;
        }
    }

    fn advance(&mut self, dt: f32, body: &mut PlatformBody) {
        self.wait_cooldown = self.config.time_to_wait;
        let target = if self.going_back {
            self.start
        } else {
            self.config.destination
        };
        body.position = move_towards(body.position, target, self.config.speed * dt);

        if !self.going_back && body.position.distance(self.config.destination) < ARRIVE_EPSILON {
            self.going_back = true;
            self.destination_cooldown = self.config.time_on_destination;
        } else if self.going_back && body.position.distance(self.start) < ARRIVE_EPSILON {
            self.going_back = false;
            self.destination_cooldown = self.config.time_on_destination;
        }
    }
}

/// Rotating behaviour parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotatingConfig {
    /// Degrees per second
    pub angle_speed: f32,
    /// Target angle in degrees
    pub desired_angle: f32,
    #[serde(default)]
    pub time_to_wait: f32,
    /// Pause at each end of the swing
    #[serde(default)]
    pub time_on_rotation: f32,
}

/// Turns a platform between its start angle and a desired angle
#[derive(Debug, Clone)]
pub struct RotatingBehavior {
    pub config: RotatingConfig,
    starting_angle: f32,
    turning_back: bool,
    wait_cooldown: f32,
    rotation_cooldown: f32,
}

impl RotatingBehavior {
    pub fn new(config: RotatingConfig, starting_angle: f32) -> Self {
        Self {
            wait_cooldown: config.time_to_wait,
            config,
            starting_angle,
            turning_back: false,
            rotation_cooldown: 0.0,
        }
    }

    pub fn is_turning_back(&self) -> bool {
        self.turning_back
    }

    fn desired(&self) -> f32 {
        normalize_angle(self.config.desired_angle.to_radians())
    }

    fn step(&mut self, dt: f32, active: bool, body: &mut PlatformBody) {
        let max_delta = self.config.angle_speed.to_radians() * dt;
        if active {
            if self.rotation_cooldown > 0.0 {
                self.rotation_cooldown -= dt;
            } else {
                self.rotation_cooldown = 0.0;
                self.wait_cooldown = self.config.time_to_wait;
                let target = if self.turning_back {
                    self.starting_angle
                } else {
                    self.desired()
                };
                body.angle = rotate_towards(body.angle, target, max_delta);

                if !self.turning_back && angle_reached(body.angle, self.desired()) {
                    self.turning_back = true;
                    self.rotation_cooldown = self.config.time_on_rotation;
                } else if self.turning_back && angle_reached(body.angle, self.starting_angle) {
                    self.turning_back = false;
                    self.rotation_cooldown = self.config.time_on_rotation;
                }
            }
        } else if !angle_reached(body.angle, self.starting_angle) {
            self.rotation_cooldown = 0.0;
            if self.wait_cooldown > 0.0 {
                self.wait_cooldown -= dt;
            } else {
                body.angle = rotate_towards(body.angle, self.starting_angle, max_delta);
            }
        } else {
            self.rotation_cooldown = 0.0;
            self.wait_cooldown = self.config.time_to_wait;
            self.turning_back = false;
        }
    }
}

fn angle_reached(a: f32, b: f32) -> bool {
    normalize_angle(a - b).abs() < ANGLE_EPSILON
}

/// Breaking behaviour parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakingConfig {
    /// Seconds of continuous activation before the platform gives way
    pub breaking_time: f32,
    /// Seconds the platform stays gone
    pub recover_time: f32,
}

/// Where a breaking platform is in its life cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BreakPhase {
    Intact { elapsed: f32 },
    /// Broken through but still held by the grapple; invalid until released
    Crumbling,
    Broken { remaining: f32 },
}

/// Makes a platform collapse after being used for a while
#[derive(Debug, Clone)]
pub struct BreakingBehavior {
    pub config: BreakingConfig,
    pub phase: BreakPhase,
}

impl BreakingBehavior {
    pub fn new(config: BreakingConfig) -> Self {
        Self {
            config,
            phase: BreakPhase::Intact { elapsed: 0.0 },
        }
    }

    fn step(&mut self, dt: f32, start: bool, latched: bool, valid: &mut bool, active: &mut bool) {
        self.phase = match self.phase {
            BreakPhase::Intact { elapsed } if start && *valid => {
                let elapsed = elapsed + dt;
                if elapsed < self.config.breaking_time {
                    BreakPhase::Intact { elapsed }
                } else if latched {
                    // Never pull a body out from under the grapple
                    *valid = false;
                    BreakPhase::Crumbling
                } else {
                    *active = false;
                    BreakPhase::Broken {
                        remaining: self.config.recover_time,
                    }
                }
            }
            BreakPhase::Intact { .. } => BreakPhase::Intact { elapsed: 0.0 },
            BreakPhase::Crumbling if !latched => {
                *active = false;
                BreakPhase::Broken {
                    remaining: self.config.recover_time,
                }
            }
            BreakPhase::Crumbling => BreakPhase::Crumbling,
            BreakPhase::Broken { remaining } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    BreakPhase::Broken { remaining }
                } else {
                    *active = true;
                    *valid = true;
                    BreakPhase::Intact { elapsed: 0.0 }
                }
            }
        };
    }
}

/// A platform in the level
#[derive(Debug, Clone)]
pub struct Platform {
    pub id: PlatformId,
    pub kind: PlatformKind,
    /// Whether the grapple may latch on (cleared while crumbling)
    pub valid: bool,
    latched: bool,
    /// Inactive platforms have no collider (broken)
    pub active: bool,
    /// Run behaviours from the start instead of waiting to be latched
    pub should_activate: bool,
    pub layer: LayerMask,
    pub body: PlatformBody,
    pub moving: Option<MovingBehavior>,
    pub rotating: Option<RotatingBehavior>,
    pub breaking: Option<BreakingBehavior>,
}

impl Platform {
    pub fn new(id: PlatformId, kind: PlatformKind, body: PlatformBody) -> Self {
        Self {
            id,
            kind,
            valid: true,
            latched: false,
            active: true,
            should_activate: false,
            layer: LayerMask::PLATFORM,
            body,
            moving: None,
            rotating: None,
            breaking: None,
        }
    }

    pub fn with_moving(mut self, config: MovingConfig) -> Self {
        self.moving = Some(MovingBehavior::new(config, self.body.position));
        self
    }

    pub fn with_rotating(mut self, config: RotatingConfig) -> Self {
        self.rotating = Some(RotatingBehavior::new(config, self.body.angle));
        self
    }

    pub fn with_breaking(mut self, config: BreakingConfig) -> Self {
        self.breaking = Some(BreakingBehavior::new(config));
        self
    }

    /// Advance behaviours by one fixed step
    pub fn step(&mut self, dt: f32) {
        let prev_position = self.body.position;
        let prev_angle = self.body.angle;
        let start = self.should_activate || self.latched;

        if self.valid && self.active {
            if let Some(moving) = self.moving.as_mut() {
                moving.step(dt, start, &mut self.body);
            }
            if let Some(rotating) = self.rotating.as_mut() {
                rotating.step(dt, start, &mut self.body);
            }
        }
        if let Some(breaking) = self.breaking.as_mut() {
            let was_active = self.active;
            breaking.step(dt, start, self.latched, &mut self.valid, &mut self.active);
            if was_active != self.active {
                log::debug!("Platform {:?} active={}", self.id, self.active);
            }
        }

        if dt > 0.0 {
            self.body.velocity = (self.body.position - prev_position) / dt;
            self.body.angular_velocity = normalize_angle(self.body.angle - prev_angle) / dt;
        }
    }
}

impl PlatformContract for Platform {
    fn kind(&self) -> PlatformKind {
        self.kind
    }

    fn is_valid(&self) -> bool {
        self.valid && self.active
    }

    fn is_latched(&self) -> bool {
        self.latched
    }

    fn set_latched(&mut self, latched: bool) {
        self.latched = latched;
    }
}

/// All platforms of a level, addressed by [`PlatformId`]
#[derive(Debug, Clone, Default)]
pub struct PlatformRegistry {
    platforms: Vec<Platform>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the id the next inserted platform will get
    pub fn next_id(&self) -> PlatformId {
        PlatformId(self.platforms.len() as u32)
    }

    /// Register a platform built with [`Self::next_id`]
    pub fn insert(&mut self, platform: Platform) -> PlatformId {
        debug_assert_eq!(platform.id, self.next_id());
        let id = platform.id;
        self.platforms.push(platform);
        id
    }

    /// Build and register a plain platform
    pub fn spawn(&mut self, kind: PlatformKind, body: PlatformBody) -> PlatformId {
        let platform = Platform::new(self.next_id(), kind, body);
        self.insert(platform)
    }

    pub fn get(&self, id: PlatformId) -> Option<&Platform> {
        self.platforms.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: PlatformId) -> Option<&mut Platform> {
        self.platforms.get_mut(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Platform> {
        self.platforms.iter()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    /// Advance every platform's behaviours
    pub fn step(&mut self, dt: f32) {
        for platform in &mut self.platforms {
            platform.step(dt);
        }
    }
}
