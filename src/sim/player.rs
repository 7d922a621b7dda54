//! Player orchestration
//!
//! Two entry points, called by the simulation loop:
//! - [`PlayerOrchestrator::fixed_update`] once per physics step: ground
//!   check, stun clear on landing, walking or air control, swing force,
//!   integration, then stun resolution for the contacts it produced.
//! - [`PlayerOrchestrator::frame_update`] once per rendered frame: input
//!   edges, grapple triggers and the multi-frame grapple routines.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::events::{EventQueue, PlayerEvent};
use super::grapple::{GrappleContext, GrappleInput, GrappleStateMachine};
use super::ground::GroundSensor;
use super::motor::SidewaysMotor;
use super::state::{FrameInput, PlayerBody};
use super::stun::StunSystem;
use super::world::{ContactEvent, RigidBody, World};
use crate::error::SetupError;
use crate::settings::Tuning;

/// Where a grapple anchor is mounted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mount", rename_all = "snake_case")]
pub enum AnchorMount {
    /// Rigidly attached to the player at a local offset
    Player { offset: Vec2 },
    /// Free-floating in the world; placed on the start anchor at spawn
    World,
}

/// The grapple's two anchors as authored in the scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrappleRig {
    pub start: AnchorMount,
    pub end: AnchorMount,
}

impl Default for GrappleRig {
    fn default() -> Self {
        Self {
            start: AnchorMount::Player {
                offset: Vec2::new(0.0, 0.5),
            },
            end: AnchorMount::World,
        }
    }
}

impl GrappleRig {
    /// Start anchor offset from the player; the end anchor must float free
    pub fn validate(&self) -> Result<Vec2, SetupError> {
        let AnchorMount::Player { offset } = self.start else {
            return Err(SetupError::StartAnchorNotOnPlayer);
        };
        if matches!(self.end, AnchorMount::Player { .. }) {
            return Err(SetupError::EndAnchorOnPlayer);
        }
        Ok(offset)
    }
}

#[derive(Debug, Clone)]
pub struct PlayerOrchestrator {
    tuning: Tuning,
    body: PlayerBody,
    sensor: GroundSensor,
    stun: StunSystem,
    motor: SidewaysMotor,
    grapple: GrappleStateMachine,
    events: EventQueue,
    start_offset: Vec2,
    /// Horizontal axis from the last accepted frame
    horizontal: f32,
    activate_held: bool,
    last_velocity: Vec2,
}

impl PlayerOrchestrator {
    pub fn new(rigid: RigidBody, rig: &GrappleRig, tuning: Tuning) -> Result<Self, SetupError> {
        let start_offset = rig.validate()?;
        tuning.validate()?;

        let motor = SidewaysMotor::new(tuning.sideways_move_speed);
        let grapple = GrappleStateMachine::new(rigid.position + start_offset);
        log::info!(
            "Player spawned at {:?}, grapple start offset {:?}",
            rigid.position,
            start_offset
        );
        Ok(Self {
            tuning,
            body: PlayerBody::new(rigid),
            sensor: GroundSensor::default(),
            stun: StunSystem,
            motor,
            grapple,
            events: EventQueue::new(),
            start_offset,
            horizontal: 0.0,
            activate_held: false,
            last_velocity: Vec2::ZERO,
        })
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn body(&self) -> &PlayerBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut PlayerBody {
        &mut self.body
    }

    pub fn grapple(&self) -> &GrappleStateMachine {
        &self.grapple
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        self.events.drain()
    }

    /// World position of the grapple start anchor
    pub fn start_anchor(&self) -> Vec2 {
        self.body.position() + self.start_offset
    }

    /// Velocity at the start of the last physics step
    pub fn last_velocity(&self) -> Vec2 {
        self.last_velocity
    }

    pub fn is_grounded(&self) -> bool {
        self.body.grounded
    }

    pub fn is_stunned(&self) -> bool {
        self.body.stunned
    }

    /// One physics step
    pub fn fixed_update(&mut self, world: &mut World, dt: f32) {
        self.last_velocity = self.body.velocity();

        let landed = !self.grapple.is_swinging() && self.sensor.is_grounded(world, &self.body.rigid);
        if landed != self.body.grounded {
            self.body.grounded = landed;
            self.events
                .push(if landed { PlayerEvent::Landed } else { PlayerEvent::Air });
        }

        let input = self.horizontal;
        if self.body.grounded {
            if self.stun.clear(&mut self.body) {
                log::debug!("Stun cleared on landing");
                self.events.push(PlayerEvent::StunExit);
            }
            self.motor.apply(&mut self.body.rigid, input);
            self.events.push(PlayerEvent::WhileOnLand { input });
        } else {
            self.events.push(PlayerEvent::WhileInAir { input });
        }

        if self.grapple.is_swinging() {
            let start = self.start_anchor();
            let mut ctx = GrappleContext {
                tuning: &self.tuning,
                world: &mut *world,
                body: &mut self.body,
                events: &mut self.events,
                start,
            };
            self.grapple.swing(&mut ctx, input);
        }

        let joint = self.grapple.joint().copied();
        // Contacts resolve within the step that produced them
        for contact in world.step_body(&mut self.body.rigid, joint.as_ref(), dt) {
            self.on_collision(world, &contact);
        }
    }

    /// Resolve one collision-enter contact. A stunning hit bounces the player
    /// and cuts the grapple.
    pub fn on_collision(&mut self, world: &mut World, contact: &ContactEvent) {
        let Some(stun) = self.stun.on_collision(
            &self.tuning,
            &mut self.body,
            contact.normal,
            contact.impact_speed,
            contact.prior_velocity,
        ) else {
            return;
        };
        self.events.push(PlayerEvent::Stun {
            velocity: stun.bounce_velocity,
        });

        let start = self.start_anchor();
        let mut ctx = GrappleContext {
            tuning: &self.tuning,
            world,
            body: &mut self.body,
            events: &mut self.events,
            start,
        };
        if self.grapple.detach(&mut ctx) {
            log::info!("Stun cut the grapple");
        }
    }

    /// One rendered frame. With `accept_input` false the axis reads zero and
    /// no grapple trigger fires, but running routines keep going.
    pub fn frame_update(&mut self, world: &mut World, input: FrameInput, accept_input: bool, dt: f32) {
        let start = self.start_anchor();
        self.grapple.pin(start);

        let mut ctx = GrappleContext {
            tuning: &self.tuning,
            world,
            body: &mut self.body,
            events: &mut self.events,
            start,
        };
        let pressed = input.activate && !self.activate_held;
        self.activate_held = input.activate;
        if accept_input {
            self.horizontal = input.horizontal;
            self.grapple.handle_input(
                &mut ctx,
                GrappleInput {
                    pressed,
                    held: input.activate,
                },
            );
        } else {
            self.horizontal = 0.0;
        }
        self.grapple.advance(&mut ctx, dt);
    }

    /// Clear the stun, stop the body and drop any active grapple
    pub fn reset(&mut self, world: &mut World) {
        if self.stun.clear(&mut self.body) {
            self.events.push(PlayerEvent::StunExit);
        }
        self.body.rigid.velocity = Vec2::ZERO;
        self.body.rigid.force = Vec2::ZERO;

        let start = self.start_anchor();
        let mut ctx = GrappleContext {
            tuning: &self.tuning,
            world,
            body: &mut self.body,
            events: &mut self.events,
            start,
        };
        self.grapple.detach(&mut ctx);
        log::debug!("Player reset at {:?}", self.body.position());
    }

    /// Move the player, keeping the grapple tip attached if idle
    pub fn teleport(&mut self, position: Vec2) {
        self.body.rigid.position = position;
        self.grapple.pin(self.start_anchor());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::collision::{LayerMask, Obb};
    use crate::sim::grapple::GrapplePhase;
    use crate::sim::platform::{Platform, PlatformBody, PlatformContract, PlatformId, PlatformKind};
    use crate::sim::world::ColliderRef;

    fn floor_world(tuning: &Tuning) -> World {
        let mut world = World::new(Vec2::new(0.0, tuning.gravity));
        world.add_solid(Obb::aabb(Vec2::new(0.0, -0.5), Vec2::new(50.0, 0.5)), LayerMask::GROUND);
        world
    }

    fn spawn(position: Vec2) -> PlayerOrchestrator {
        let rigid = RigidBody::new(position, Vec2::splat(0.5), 1.0);
        PlayerOrchestrator::new(rigid, &GrappleRig::default(), Tuning::default()).unwrap()
    }

    fn add_platform(world: &mut World, kind: PlatformKind, position: Vec2) -> PlatformId {
        let id = world.platforms.next_id();
        let body = PlatformBody::new(position, Vec2::new(2.0, 0.25), 0.0);
        world.platforms.insert(Platform::new(id, kind, body))
    }

    fn step(player: &mut PlayerOrchestrator, world: &mut World, input: FrameInput) {
        world.platforms.step(SIM_DT);
        player.fixed_update(world, SIM_DT);
        player.frame_update(world, input, true, SIM_DT);
    }

    fn settle(player: &mut PlayerOrchestrator, world: &mut World) {
        for _ in 0..10 {
            step(player, world, FrameInput::default());
        }
        player.drain_events();
    }

    fn latched(world: &World, id: PlatformId) -> bool {
        world.platforms.get(id).is_some_and(|p| p.is_latched())
    }

    /// Press, then hold until the shot resolves
    fn shoot(player: &mut PlayerOrchestrator, world: &mut World) {
        step(player, world, FrameInput::new(0.0, true));
        for _ in 0..60 {
            if !player.grapple().is_shooting() {
                return;
            }
            step(player, world, FrameInput::new(0.0, true));
        }
    }

    #[test]
    fn test_rig_validation() {
        let rigid = RigidBody::new(Vec2::ZERO, Vec2::splat(0.5), 1.0);
        let floating_start = GrappleRig {
            start: AnchorMount::World,
            ..Default::default()
        };
        assert!(matches!(
            PlayerOrchestrator::new(rigid.clone(), &floating_start, Tuning::default()),
            Err(SetupError::StartAnchorNotOnPlayer)
        ));

        let parented_end = GrappleRig {
            end: AnchorMount::Player { offset: Vec2::ZERO },
            ..Default::default()
        };
        assert!(matches!(
            PlayerOrchestrator::new(rigid, &parented_end, Tuning::default()),
            Err(SetupError::EndAnchorOnPlayer)
        ));
    }

    #[test]
    fn test_invalid_tuning_rejected() {
        let rigid = RigidBody::new(Vec2::ZERO, Vec2::splat(0.5), 1.0);
        let tuning = Tuning {
            grapple_travel_time: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            PlayerOrchestrator::new(rigid, &GrappleRig::default(), tuning),
            Err(SetupError::InvalidTuning(_))
        ));
    }

    #[test]
    fn test_lands_and_reports_transitions() {
        let mut player = spawn(Vec2::new(0.0, 2.0));
        let mut world = floor_world(player.tuning());

        step(&mut player, &mut world, FrameInput::default());
        assert!(!player.is_grounded());
        assert!(player.events().pending().contains(&PlayerEvent::WhileInAir { input: 0.0 }));

        for _ in 0..60 {
            step(&mut player, &mut world, FrameInput::default());
        }
        assert!(player.is_grounded());
        let events = player.drain_events();
        assert_eq!(events.iter().filter(|e| **e == PlayerEvent::Landed).count(), 1);
        assert!(!events.contains(&PlayerEvent::Air));
    }

    #[test]
    fn test_idle_axis_keeps_player_still() {
        let mut player = spawn(Vec2::new(0.0, 0.5));
        let mut world = floor_world(player.tuning());
        settle(&mut player, &mut world);
        assert!(player.is_grounded());

        for _ in 0..10 {
            step(&mut player, &mut world, FrameInput::default());
            assert_eq!(player.body().velocity().x, 0.0);
        }
    }

    #[test]
    fn test_walks_at_configured_speed() {
        let mut player = spawn(Vec2::new(0.0, 0.5));
        let mut world = floor_world(player.tuning());
        settle(&mut player, &mut world);

        // Input sampled this frame drives the next physics step
        step(&mut player, &mut world, FrameInput::new(-1.0, false));
        step(&mut player, &mut world, FrameInput::new(-1.0, false));
        assert_eq!(player.body().velocity().x, -player.tuning().sideways_move_speed);
        assert!(player.body().position().x < 0.0);
    }

    #[test]
    fn test_side_wall_impact_stuns_and_bounces() {
        let tuning = Tuning::default();
        let mut world = World::new(Vec2::new(0.0, tuning.gravity));
        world.add_solid(Obb::aabb(Vec2::new(3.0, 0.0), Vec2::new(0.5, 20.0)), LayerMask::WALL);
        let mut player = spawn(Vec2::new(0.0, 5.0));
        player.body_mut().rigid.velocity = Vec2::new(12.0, 0.0);

        let mut stun = None;
        for _ in 0..30 {
            step(&mut player, &mut world, FrameInput::default());
            stun = player.drain_events().into_iter().find_map(|e| match e {
                PlayerEvent::Stun { velocity } => Some(velocity),
                _ => None,
            });
            if stun.is_some() {
                break;
            }
        }
        let bounce = stun.expect("wall hit should stun");
        assert!(player.is_stunned());
        assert!(bounce.x < 0.0 && bounce.y == 0.0);
        // Only gravity acted on the bounce since
        assert!((player.body().velocity().x - bounce.x).abs() < 1e-4);
    }

    #[test]
    fn test_stun_blocks_shooting_and_clears_on_landing() {
        let mut player = spawn(Vec2::new(0.0, 1.5));
        let mut world = floor_world(player.tuning());
        player.body_mut().stunned = true;

        step(&mut player, &mut world, FrameInput::new(1.0, true));
        assert!(player.grapple().is_idle());
        assert!(player.events().pending().contains(&PlayerEvent::CannotShootGrapple));
        // Airborne: the axis does not steer
        assert_eq!(player.body().velocity().x, 0.0);

        for _ in 0..60 {
            step(&mut player, &mut world, FrameInput::default());
        }
        assert!(!player.is_stunned());
        assert!(player.drain_events().contains(&PlayerEvent::StunExit));
    }

    #[test]
    fn test_fixed_latch_leaves_flag_alone() {
        let mut player = spawn(Vec2::new(0.0, 0.5));
        let mut world = floor_world(player.tuning());
        let id = add_platform(&mut world, PlatformKind::Fixed, Vec2::new(0.0, 5.0));
        settle(&mut player, &mut world);

        shoot(&mut player, &mut world);
        assert_eq!(player.grapple().phase(), GrapplePhase::Swinging);
        assert!(!latched(&world, id));

        step(&mut player, &mut world, FrameInput::new(0.0, true));
        assert!(!player.is_grounded());
    }

    #[test]
    fn test_attached_latch_then_release() {
        let mut player = spawn(Vec2::new(0.0, 0.5));
        let mut world = floor_world(player.tuning());
        let id = add_platform(&mut world, PlatformKind::Attached, Vec2::new(0.0, 5.0));
        settle(&mut player, &mut world);

        shoot(&mut player, &mut world);
        assert!(player.grapple().is_swinging());
        assert!(latched(&world, id));
        for _ in 0..5 {
            step(&mut player, &mut world, FrameInput::new(0.5, true));
            assert!(!player.is_grounded());
        }

        step(&mut player, &mut world, FrameInput::new(0.0, false));
        assert_eq!(player.grapple().phase(), GrapplePhase::Retracting);
        assert!(!latched(&world, id));
        assert!(player.grapple().link().is_none());

        for _ in 0..60 {
            if player.grapple().is_idle() {
                break;
            }
            step(&mut player, &mut world, FrameInput::default());
        }
        assert!(player.grapple().is_idle());
        assert!(player.drain_events().contains(&PlayerEvent::GrappleDoneRetract));
    }

    #[test]
    fn test_stun_while_swinging_detaches_same_step() {
        let mut player = spawn(Vec2::new(0.0, 0.5));
        let mut world = floor_world(player.tuning());
        let id = add_platform(&mut world, PlatformKind::Attached, Vec2::new(0.0, 5.0));
        settle(&mut player, &mut world);
        shoot(&mut player, &mut world);
        assert!(player.grapple().is_swinging());
        player.drain_events();

        let contact = ContactEvent {
            collider: ColliderRef::Solid(0),
            normal: Vec2::NEG_X,
            impact_speed: 10.0,
            prior_velocity: Vec2::new(10.0, 0.0),
        };
        player.on_collision(&mut world, &contact);

        assert!(player.is_stunned());
        assert_eq!(player.grapple().phase(), GrapplePhase::Retracting);
        assert!(!latched(&world, id));
        let expected = Vec2::new(-10.0 * player.tuning().stun_bounce_multiplier, 0.0);
        assert_eq!(player.body().velocity(), expected);
        assert_eq!(
            player.drain_events(),
            vec![PlayerEvent::Stun { velocity: expected }, PlayerEvent::GrappleDetach]
        );
    }

    #[test]
    fn test_stun_visible_to_following_frame() {
        let tuning = Tuning::default();
        let mut world = World::new(Vec2::new(0.0, tuning.gravity));
        world.add_solid(Obb::aabb(Vec2::new(3.0, 0.0), Vec2::new(0.5, 20.0)), LayerMask::WALL);
        let mut player = spawn(Vec2::new(0.0, 5.0));
        player.body_mut().rigid.velocity = Vec2::new(12.0, 0.0);

        for _ in 0..30 {
            world.platforms.step(SIM_DT);
            player.fixed_update(&mut world, SIM_DT);
            if player.is_stunned() {
                break;
            }
            player.frame_update(&mut world, FrameInput::default(), true, SIM_DT);
        }
        assert!(player.is_stunned());
        assert!(player
            .events()
            .pending()
            .iter()
            .any(|e| matches!(e, PlayerEvent::Stun { .. })));
        player.drain_events();

        // First frame after the impacting step
        player.frame_update(&mut world, FrameInput::new(0.0, true), true, SIM_DT);
        assert!(player.grapple().is_idle());
        assert_eq!(player.drain_events(), vec![PlayerEvent::CannotShootGrapple]);
    }

    #[test]
    fn test_stun_mid_shot_never_latches() {
        let tuning = Tuning::default();
        let mut world = World::new(Vec2::new(0.0, tuning.gravity));
        let id = add_platform(&mut world, PlatformKind::Attached, Vec2::new(0.0, 8.0));
        let mut player = spawn(Vec2::ZERO);

        step(&mut player, &mut world, FrameInput::new(0.0, true));
        assert!(player.grapple().is_shooting());
        assert!(!latched(&world, id));
        player.drain_events();

        let contact = ContactEvent {
            collider: ColliderRef::Solid(0),
            normal: Vec2::NEG_X,
            impact_speed: 10.0,
            prior_velocity: Vec2::new(10.0, 0.0),
        };
        player.on_collision(&mut world, &contact);
        assert!(player.is_stunned());
        assert_eq!(player.grapple().phase(), GrapplePhase::Retracting);
        assert!(!latched(&world, id));

        let mut events = player.drain_events();
        for _ in 0..60 {
            if player.grapple().is_idle() {
                break;
            }
            step(&mut player, &mut world, FrameInput::new(0.0, true));
            assert!(!latched(&world, id));
            events.extend(player.drain_events());
        }
        assert!(player.grapple().is_idle());
        assert!(!latched(&world, id));
        assert!(!events.contains(&PlayerEvent::GrappleLatch));
        assert!(events.contains(&PlayerEvent::GrappleDoneRetract));
    }

    #[test]
    fn test_press_edge_tracked_while_gated() {
        let mut player = spawn(Vec2::new(0.0, 0.5));
        let mut world = floor_world(player.tuning());
        settle(&mut player, &mut world);

        // Held through a pause, then released and pressed again before resuming
        player.frame_update(&mut world, FrameInput::new(0.0, true), false, SIM_DT);
        player.frame_update(&mut world, FrameInput::new(0.0, false), false, SIM_DT);
        player.frame_update(&mut world, FrameInput::new(0.0, true), false, SIM_DT);
        assert!(player.grapple().is_idle());

        // Still held on resume: no new press
        player.frame_update(&mut world, FrameInput::new(0.0, true), true, SIM_DT);
        assert!(player.grapple().is_idle());

        player.frame_update(&mut world, FrameInput::new(0.0, false), true, SIM_DT);
        player.frame_update(&mut world, FrameInput::new(0.0, true), true, SIM_DT);
        assert!(!player.grapple().is_idle());
        assert!(player.events().pending().contains(&PlayerEvent::GrappleShoot));
    }

    #[test]
    fn test_gated_input_is_ignored() {
        let mut player = spawn(Vec2::new(0.0, 0.5));
        let mut world = floor_world(player.tuning());
        settle(&mut player, &mut world);

        player.frame_update(&mut world, FrameInput::new(1.0, true), false, SIM_DT);
        player.fixed_update(&mut world, SIM_DT);
        assert!(player.grapple().is_idle());
        assert_eq!(player.body().velocity().x, 0.0);
        assert!(!player.events().pending().contains(&PlayerEvent::GrappleShoot));
    }

    #[test]
    fn test_reset_clears_stun_and_grapple() {
        let mut player = spawn(Vec2::new(0.0, 0.5));
        let mut world = floor_world(player.tuning());
        let id = add_platform(&mut world, PlatformKind::Attached, Vec2::new(0.0, 5.0));
        settle(&mut player, &mut world);
        shoot(&mut player, &mut world);
        player.body_mut().stunned = true;
        player.drain_events();

        player.reset(&mut world);
        assert!(!player.is_stunned());
        assert_eq!(player.body().velocity(), Vec2::ZERO);
        assert_eq!(player.grapple().phase(), GrapplePhase::Retracting);
        assert!(!latched(&world, id));
        assert_eq!(
            player.drain_events(),
            vec![PlayerEvent::StunExit, PlayerEvent::GrappleDetach]
        );
    }

    #[test]
    fn test_idle_tip_follows_player() {
        let mut player = spawn(Vec2::new(0.0, 0.5));
        let mut world = floor_world(player.tuning());
        player.teleport(Vec2::new(4.0, 0.5));
        assert_eq!(player.grapple().end_point(), Vec2::new(4.0, 1.0));

        step(&mut player, &mut world, FrameInput::default());
        assert_eq!(player.grapple().end_point(), player.start_anchor());
    }
}
