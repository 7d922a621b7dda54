//! Player events for animation/audio consumers
//!
//! Events are fire-and-forget: the simulation pushes them while stepping and
//! whoever drives the loop drains the queue once per iteration. Nothing in
//! the core reads them back.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Debounced swing push state reported with every swinging step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingPush {
    /// Input inside the dead zone; the next push will trigger
    Released,
    /// First step of a new push
    Pushed,
    /// Push held since an earlier step
    Held,
}

/// Something the player did this step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    GrappleShoot,
    GrappleLatch,
    WhileSwinging { input: f32, push: SwingPush },
    GrappleDetach,
    GrappleDoneRetract,
    CannotShootGrapple,
    Landed,
    Air,
    WhileOnLand { input: f32 },
    WhileInAir { input: f32 },
    Stun { velocity: Vec2 },
    StunExit,
}

/// Queue of events produced since the last drain
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<PlayerEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: PlayerEvent) {
        log::trace!("event {:?}", event);
        self.events.push(event);
    }

    /// Take every pending event, oldest first
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending(&self) -> &[PlayerEvent] {
        &self.events
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Count pending events matching `pred`
    #[cfg(test)]
    pub fn count(&self, pred: impl Fn(&PlayerEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}
