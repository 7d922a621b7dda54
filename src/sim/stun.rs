//! Stun on hard side impacts
//!
//! Only airborne hits count. A hit stuns when the player was moving fast
//! enough and the surface faces sideways; the player then bounces off along
//! the contact normal. Landing clears the stun.

use glam::Vec2;

use super::state::PlayerBody;
use crate::settings::Tuning;

/// Result of a stunning impact, consumed in the step it is produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StunEvent {
    pub normal: Vec2,
    pub impact_speed: f32,
    /// Velocity that replaced the player's velocity
    pub bounce_velocity: Vec2,
}

/// Decides whether an impact stuns and applies the bounce
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StunSystem;

impl StunSystem {
    /// Handle a collision. On a stunning hit the player is marked stunned and
    /// its velocity is overwritten with the bounce.
    pub fn on_collision(
        &self,
        tuning: &Tuning,
        body: &mut PlayerBody,
        contact_normal: Vec2,
        contact_speed: f32,
        prior_velocity: Vec2,
    ) -> Option<StunEvent> {
        if body.grounded {
            return None;
        }
        let bounce_velocity = bounce_velocity(tuning, contact_normal, prior_velocity)?;
        body.rigid.velocity = bounce_velocity;
        body.stunned = true;
        log::debug!(
            "Stunned: normal={:?} speed={:.2} bounce={:?}",
            contact_normal,
            contact_speed,
            bounce_velocity
        );
        Some(StunEvent {
            normal: contact_normal,
            impact_speed: contact_speed,
            bounce_velocity,
        })
    }

    /// Clear the stun; true if the player was stunned
    pub fn clear(&self, body: &mut PlayerBody) -> bool {
        std::mem::replace(&mut body.stunned, false)
    }
}

/// Bounce velocity for a stunning hit, `None` if the hit doesn't stun
pub fn bounce_velocity(tuning: &Tuning, contact_normal: Vec2, prior_velocity: Vec2) -> Option<Vec2> {
    let speed = prior_velocity.length();
    if speed < tuning.min_velocity_stun_threshold {
        return None;
    }
    // Side hits only: the normal must lie close to the horizontal axis
    if contact_normal.dot(Vec2::X).abs() <= tuning.stun_side_threshold() {
        return None;
    }
    Some(speed * tuning.stun_bounce_multiplier * contact_normal)
}
