//! Level description
//!
//! A scene is plain data: the player, static solids and grapple-able
//! platforms, plus optional tuning. [`SceneDesc::build`] validates it and
//! produces a ready-to-run [`Simulation`].

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::settings::Tuning;
use crate::sim::collision::{LayerMask, Obb};
use crate::sim::platform::{
    BreakingConfig, MovingConfig, Platform, PlatformBody, PlatformKind, RotatingConfig,
};
use crate::sim::player::{AnchorMount, GrappleRig, PlayerOrchestrator};
use crate::sim::tick::Simulation;
use crate::sim::world::{RigidBody, World};

fn default_player_extents() -> Vec2 {
    Vec2::splat(0.5)
}

fn default_mass() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDesc {
    pub spawn: Vec2,
    #[serde(default = "default_player_extents")]
    pub half_extents: Vec2,
    #[serde(default = "default_mass")]
    pub mass: f32,
    #[serde(default)]
    pub rig: GrappleRig,
}

/// Static level geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolidDesc {
    pub center: Vec2,
    pub half_extents: Vec2,
    /// Degrees
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub layer: LayerMask,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformDesc {
    #[serde(default)]
    pub kind: PlatformKind,
    pub position: Vec2,
    pub half_extents: Vec2,
    /// Degrees
    #[serde(default)]
    pub angle: f32,
    #[serde(default = "default_true")]
    pub valid: bool,
    #[serde(default)]
    pub should_activate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moving: Option<MovingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotating: Option<RotatingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaking: Option<BreakingConfig>,
}

impl PlatformDesc {
    fn new(kind: PlatformKind, position: Vec2, half_extents: Vec2) -> Self {
        Self {
            kind,
            position,
            half_extents,
            angle: 0.0,
            valid: true,
            should_activate: false,
            moving: None,
            rotating: None,
            breaking: None,
        }
    }

    fn validate(&self, index: usize) -> Result<(), SetupError> {
        let fail = |msg: &str| Err(SetupError::InvalidScene(format!("platform {}: {}", index, msg)));
        if !positive_extents(self.half_extents) {
            return fail("half_extents must be positive");
        }
        if let Some(moving) = &self.moving {
            if moving.speed <= 0.0 || moving.time_to_wait < 0.0 || moving.time_on_destination < 0.0 {
                return fail("moving needs a positive speed and non-negative waits");
            }
        }
        if let Some(rotating) = &self.rotating {
            if rotating.angle_speed <= 0.0 || rotating.time_to_wait < 0.0 || rotating.time_on_rotation < 0.0 {
                return fail("rotating needs a positive angle_speed and non-negative waits");
            }
        }
        if let Some(breaking) = &self.breaking {
            if breaking.breaking_time < 0.0 || breaking.recover_time < 0.0 {
                return fail("breaking times must be non-negative");
            }
        }
        Ok(())
    }
}

fn positive_extents(half_extents: Vec2) -> bool {
    half_extents.x > 0.0 && half_extents.y > 0.0 && half_extents.is_finite()
}

/// Everything needed to build a [`Simulation`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDesc {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tuning: Tuning,
    pub player: PlayerDesc,
    #[serde(default)]
    pub solids: Vec<SolidDesc>,
    #[serde(default)]
    pub platforms: Vec<PlatformDesc>,
}

impl SceneDesc {
    /// Parse a scene; validation happens in [`Self::build`]
    pub fn from_json(json: &str) -> Result<Self, SetupError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SetupError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let scene = Self::from_json(&json)?;
        log::info!("Loaded scene '{}' from {}", scene.name, path.display());
        Ok(scene)
    }

    /// Check everything the simulation relies on
    pub fn validate(&self) -> Result<(), SetupError> {
        self.player.rig.validate()?;
        self.tuning.validate()?;
        if !positive_extents(self.player.half_extents) || self.player.mass <= 0.0 {
            return Err(SetupError::InvalidScene(
                "player needs positive half_extents and mass".to_string(),
            ));
        }
        for (i, solid) in self.solids.iter().enumerate() {
            if !positive_extents(solid.half_extents) {
                return Err(SetupError::InvalidScene(format!(
                    "solid {}: half_extents must be positive",
                    i
                )));
            }
        }
        for (i, platform) in self.platforms.iter().enumerate() {
            platform.validate(i)?;
        }
        Ok(())
    }

    /// Validate and instantiate the scene
    pub fn build(&self) -> Result<Simulation, SetupError> {
        self.validate()?;

        let mut world = World::new(Vec2::new(0.0, self.tuning.gravity));
        for solid in &self.solids {
            world.add_solid(
                Obb::new(solid.center, solid.half_extents, solid.angle.to_radians()),
                solid.layer,
            );
        }
        for desc in &self.platforms {
            let id = world.platforms.next_id();
            let body = PlatformBody::new(desc.position, desc.half_extents, desc.angle.to_radians());
            let mut platform = Platform::new(id, desc.kind, body);
            platform.valid = desc.valid;
            platform.should_activate = desc.should_activate;
            if let Some(config) = &desc.moving {
                platform = platform.with_moving(config.clone());
            }
            if let Some(config) = &desc.rotating {
                platform = platform.with_rotating(config.clone());
            }
            if let Some(config) = &desc.breaking {
                platform = platform.with_breaking(config.clone());
            }
            world.platforms.insert(platform);
        }

        let rigid = RigidBody::new(self.player.spawn, self.player.half_extents, self.player.mass);
        let player = PlayerOrchestrator::new(rigid, &self.player.rig, self.tuning.clone())?;
        log::info!(
            "Built scene '{}': {} solids, {} platforms",
            self.name,
            world.solids.len(),
            world.platforms.len()
        );
        Ok(Simulation::new(world, player))
    }

    /// Small built-in level with one platform of each flavour
    pub fn demo() -> Self {
        let mut moving = PlatformDesc::new(PlatformKind::Attached, Vec2::new(6.0, 5.0), Vec2::new(1.5, 0.25));
        moving.moving = Some(MovingConfig {
            speed: 2.0,
            destination: Vec2::new(10.0, 5.0),
            time_to_wait: 1.0,
            time_on_destination: 0.5,
        });

        let mut rotating = PlatformDesc::new(PlatformKind::Attached, Vec2::new(-6.0, 5.5), Vec2::new(2.0, 0.2));
        rotating.rotating = Some(RotatingConfig {
            angle_speed: 45.0,
            desired_angle: 30.0,
            time_to_wait: 1.0,
            time_on_rotation: 0.5,
        });

        let mut breaking = PlatformDesc::new(PlatformKind::Attached, Vec2::new(2.0, 7.0), Vec2::new(1.0, 0.25));
        breaking.breaking = Some(BreakingConfig {
            breaking_time: 1.5,
            recover_time: 3.0,
        });

        Self {
            name: "demo".to_string(),
            tuning: Tuning::default(),
            player: PlayerDesc {
                spawn: Vec2::new(0.0, 0.5),
                half_extents: default_player_extents(),
                mass: default_mass(),
                rig: GrappleRig {
                    start: AnchorMount::Player {
                        offset: Vec2::new(0.0, 0.5),
                    },
                    end: AnchorMount::World,
                },
            },
            solids: vec![
                SolidDesc {
                    center: Vec2::new(0.0, -0.5),
                    half_extents: Vec2::new(30.0, 0.5),
                    angle: 0.0,
                    layer: LayerMask::GROUND,
                },
                SolidDesc {
                    center: Vec2::new(14.0, 5.0),
                    half_extents: Vec2::new(0.5, 6.0),
                    angle: 0.0,
                    layer: LayerMask::WALL,
                },
            ],
            platforms: vec![
                PlatformDesc::new(PlatformKind::Fixed, Vec2::new(0.0, 5.0), Vec2::new(1.5, 0.25)),
                moving,
                rotating,
                breaking,
            ],
        }
    }
}
