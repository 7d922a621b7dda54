//! Grapple state machine: shoot, latch, swing, detach and retract
//!
//! Shooting and retracting span many frames. Their progress lives in the
//! state itself and [`GrappleStateMachine::advance`] moves it forward exactly
//! once per frame step. Anything that happened in between (a stun, a platform
//! breaking) is checked at the top of the next step.
//!
//! Latching onto an `Attached` platform sets its latched flag. Every path out
//! of `Swinging` goes through [`GrappleStateMachine::detach`], which is the
//! only place that clears it again.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::events::{EventQueue, PlayerEvent, SwingPush};
use super::platform::{PlatformContract, PlatformId, PlatformKind};
use super::state::PlayerBody;
use super::world::{JointAnchor, RayHit, SpringJoint, World};
use crate::consts::{GRAPPLE_TIP_LOOKAHEAD, SWING_DEAD_ZONE};
use crate::settings::Tuning;

/// Observable grapple state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrapplePhase {
    Idle,
    Shooting,
    Swinging,
    Retracting,
}

/// Progress of an in-flight shot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShootProgress {
    pub norm_time: f32,
    /// Full-extension point, fixed when the shot was fired
    pub target: Vec2,
}

/// Progress of a retract
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetractProgress {
    pub norm_time: f32,
    pub total_time: f32,
    /// Endpoint position when the grapple was detached
    pub from: Vec2,
}

/// The live connection while swinging
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrappleLink {
    /// Platform that was hit
    pub platform: PlatformId,
    pub kind: PlatformKind,
    /// Connected platform of an attached grapple; latched while held
    pub target: Option<PlatformId>,
    pub joint: SpringJoint,
    /// Start-to-end distance at latch time
    pub length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrappleState {
    Idle,
    Shooting(ShootProgress),
    Swinging(GrappleLink),
    Retracting(RetractProgress),
}

impl GrappleState {
    pub fn phase(&self) -> GrapplePhase {
        match self {
            GrappleState::Idle => GrapplePhase::Idle,
            GrappleState::Shooting(_) => GrapplePhase::Shooting,
            GrappleState::Swinging(_) => GrapplePhase::Swinging,
            GrappleState::Retracting(_) => GrapplePhase::Retracting,
        }
    }
}

/// Grapple button edges for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrappleInput {
    /// Went down this frame
    pub pressed: bool,
    /// Currently down
    pub held: bool,
}

/// Everything a grapple step may touch
pub struct GrappleContext<'a> {
    pub tuning: &'a Tuning,
    pub world: &'a mut World,
    pub body: &'a mut PlayerBody,
    pub events: &'a mut EventQueue,
    /// World position of the start anchor
    pub start: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrappleStateMachine {
    state: GrappleState,
    end_point: Vec2,
    /// Next swing push will report `Pushed`
    push_armed: bool,
}

impl GrappleStateMachine {
    pub fn new(start: Vec2) -> Self {
        Self {
            state: GrappleState::Idle,
            end_point: start,
            push_armed: false,
        }
    }

    pub fn state(&self) -> &GrappleState {
        &self.state
    }

    pub fn phase(&self) -> GrapplePhase {
        self.state.phase()
    }

    /// World position of the grapple tip
    pub fn end_point(&self) -> Vec2 {
        self.end_point
    }

    pub fn link(&self) -> Option<&GrappleLink> {
        match &self.state {
            GrappleState::Swinging(link) => Some(link),
            _ => None,
        }
    }

    pub fn joint(&self) -> Option<&SpringJoint> {
        self.link().map(|link| &link.joint)
    }

    pub fn is_swinging(&self) -> bool {
        matches!(self.state, GrappleState::Swinging(_))
    }

    pub fn is_shooting(&self) -> bool {
        matches!(self.state, GrappleState::Shooting(_))
    }

    pub fn is_retracting(&self) -> bool {
        matches!(self.state, GrappleState::Retracting(_))
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, GrappleState::Idle)
    }

    /// Keep the tip on the start anchor while nothing is in flight
    pub fn pin(&mut self, start: Vec2) {
        if self.is_idle() {
            self.end_point = start;
        }
    }

    /// Evaluate the frame's grapple triggers
    pub fn handle_input(&mut self, ctx: &mut GrappleContext<'_>, input: GrappleInput) {
        if input.pressed && self.is_idle() && !ctx.body.stunned {
            self.shoot(ctx);
        } else if self.is_swinging() && (!input.held || !self.target_is_valid(ctx.world)) {
            self.detach(ctx);
        } else if input.pressed {
            log::debug!("Cannot shoot grapple while {:?}", self.phase());
            ctx.events.push(PlayerEvent::CannotShootGrapple);
        }
    }

    /// Fire the grapple straight along the configured direction
    fn shoot(&mut self, ctx: &mut GrappleContext<'_>) {
        let target = ctx.start + ctx.tuning.shoot_dir() * ctx.tuning.max_grapple_distance;
        self.end_point = ctx.start;
        self.state = GrappleState::Shooting(ShootProgress {
            norm_time: 0.0,
            target,
        });
        log::debug!("Grapple shot from {:?} toward {:?}", ctx.start, target);
        ctx.events.push(PlayerEvent::GrappleShoot);
    }

    /// Resume the running shoot or retract routine by one frame
    pub fn advance(&mut self, ctx: &mut GrappleContext<'_>, dt: f32) {
        match self.state {
            GrappleState::Shooting(progress) => self.advance_shoot(ctx, progress, dt),
            GrappleState::Retracting(progress) => self.advance_retract(ctx, progress, dt),
            GrappleState::Idle | GrappleState::Swinging(_) => {}
        }
    }

    fn advance_shoot(&mut self, ctx: &mut GrappleContext<'_>, mut progress: ShootProgress, dt: f32) {
        // A stun owns the interruption; the shot just stops here
        if ctx.body.stunned {
            return;
        }
        let max_distance = ctx.tuning.max_grapple_distance;
        if progress.norm_time >= 1.0 || ctx.start.distance(self.end_point) >= max_distance {
            log::debug!("Grapple reached full extension without a hit");
            self.detach(ctx);
            return;
        }

        let previous = self.end_point;
        let eased = ctx.tuning.grapple_travel_motion.evaluate(progress.norm_time);
        let tip = ctx.start.lerp(progress.target, eased);
        self.end_point = ctx.start + (tip - ctx.start).clamp_length_max(max_distance);

        // Sweep from the previous tip so a fast shot cannot skip a thin platform
        let direction = (self.end_point - ctx.start).normalize_or(ctx.tuning.shoot_dir());
        let sweep = self.end_point + direction * GRAPPLE_TIP_LOOKAHEAD - previous;
        if let Some(hit) = ctx
            .world
            .raycast(previous, sweep, sweep.length(), ctx.tuning.platform_layer)
        {
            match hit.platform().filter(|id| ctx.world.platform_is_valid(*id)) {
                Some(id) => self.latch(ctx, &hit, id),
                None => {
                    log::debug!("Grapple hit an invalid target at {:?}", hit.point);
                    self.detach(ctx);
                }
            }
            return;
        }

        progress.norm_time += dt / ctx.tuning.grapple_travel_time;
        self.state = GrappleState::Shooting(progress);
    }

    fn latch(&mut self, ctx: &mut GrappleContext<'_>, hit: &RayHit, id: PlatformId) {
        let Some(platform) = ctx.world.platforms.get_mut(id) else {
            self.detach(ctx);
            return;
        };

        let tuning = ctx.tuning;
        ctx.body.grounded = false;
        ctx.body.rigid.velocity *= 1.0 - tuning.latch_velocity_falloff;
        self.end_point = hit.point;

        let kind = platform.kind();
        let (anchor, target) = match kind {
            PlatformKind::Fixed => (JointAnchor::World(hit.point), None),
            PlatformKind::Attached => {
                platform.set_latched(true);
                let local = platform.body.inverse_transform_point(hit.point);
                (JointAnchor::Body { platform: id, local }, Some(id))
            }
        };

        let length = ctx.start.distance(hit.point);
        let joint = SpringJoint {
            anchor,
            max_distance: tuning.joint_max_distance * length,
            min_distance: tuning.joint_min_distance * length,
            spring: tuning.spring,
            damper: tuning.damper,
            mass_scale: tuning.mass_scale,
        };
        self.state = GrappleState::Swinging(GrappleLink {
            platform: id,
            kind,
            target,
            joint,
            length,
        });
        log::info!("Grapple latched to {:?} ({:?}) at {:?}, length {:.2}", id, kind, hit.point, length);
        ctx.events.push(PlayerEvent::GrappleLatch);
    }

    /// Let go of whatever the grapple holds and start retracting.
    ///
    /// Does nothing unless shooting or swinging. Returns true if it detached.
    pub fn detach(&mut self, ctx: &mut GrappleContext<'_>) -> bool {
        let link = match self.state {
            GrappleState::Shooting(_) => None,
            GrappleState::Swinging(link) => Some(link),
            GrappleState::Idle | GrappleState::Retracting(_) => return false,
        };

        if let Some(target) = link.and_then(|link| link.target) {
            // The platform may be inactive by now; the flag is cleared regardless
            if let Some(platform) = ctx.world.platforms.get_mut(target) {
                platform.set_latched(false);
            }
        }

        let length = ctx.start.distance(self.end_point);
        let total_time = retract_duration(ctx.tuning, length);
        self.state = GrappleState::Retracting(RetractProgress {
            norm_time: 0.0,
            total_time,
            from: self.end_point,
        });
        log::debug!("Grapple detached at length {:.2}, retracting over {:.3}s", length, total_time);
        ctx.events.push(PlayerEvent::GrappleDetach);
        true
    }

    fn advance_retract(&mut self, ctx: &mut GrappleContext<'_>, mut progress: RetractProgress, dt: f32) {
        progress.norm_time = if progress.total_time > 0.0 {
            progress.norm_time + dt / progress.total_time
        } else {
            1.0
        };

        if progress.norm_time >= 1.0 {
            self.end_point = ctx.start;
            self.state = GrappleState::Idle;
            ctx.events.push(PlayerEvent::GrappleDoneRetract);
            return;
        }

        let eased = ctx.tuning.grapple_retract_motion.evaluate(progress.norm_time);
        self.end_point = progress.from.lerp(ctx.start, eased);
        self.state = GrappleState::Retracting(progress);
    }

    /// Physics-step half of swinging: follow the anchor and push sideways
    pub fn swing(&mut self, ctx: &mut GrappleContext<'_>, input: f32) {
        let Some(link) = self.link().copied() else {
            return;
        };
        if link.target.is_some() {
            if let Some(anchor) = ctx.world.anchor_position(&link.joint.anchor) {
                self.end_point = anchor;
            }
        }

        ctx.body.rigid.add_force(Vec2::X * input * ctx.tuning.horizontal_force);
        let push = self.swing_push(input);
        ctx.events.push(PlayerEvent::WhileSwinging { input, push });
    }

    /// Debounce the swing input into push edges
    fn swing_push(&mut self, input: f32) -> SwingPush {
        if input.abs() < SWING_DEAD_ZONE {
            self.push_armed = true;
            SwingPush::Released
        } else if self.push_armed {
            self.push_armed = false;
            SwingPush::Pushed
        } else {
            SwingPush::Held
        }
    }

    fn target_is_valid(&self, world: &World) -> bool {
        self.link()
            .is_some_and(|link| world.platform_is_valid(link.platform))
    }
}

/// Retract time for a grapple of `length`; shorter grapples come back faster
pub fn retract_duration(tuning: &Tuning, length: f32) -> f32 {
    let fraction = (length / tuning.max_grapple_distance).clamp(0.0, 1.0);
    tuning.grapple_retract_time_decay.evaluate(fraction) * tuning.grapple_retract_time
}
