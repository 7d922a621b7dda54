//! Ground sensor

use glam::Vec2;

use super::collision::{LayerMask, Obb};
use super::world::{RigidBody, World};
use crate::consts::{GROUND_MARGIN, GROUND_SKIN};

/// Answers "is the body standing on something"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSensor {
    pub mask: LayerMask,
}

impl Default for GroundSensor {
    fn default() -> Self {
        Self {
            mask: LayerMask::ALL,
        }
    }
}

impl GroundSensor {
    /// Sweep a flat box the width of the footprint (minus a skin on each
    /// side) from the body centre down past its feet.
    pub fn is_grounded(&self, world: &World, body: &RigidBody) -> bool {
        world.box_overlap(&Self::probe(body), self.mask)
    }

    /// The swept region of the downward cast
    pub fn probe(body: &RigidBody) -> Obb {
        let half_width = (body.half_extents.x - GROUND_SKIN).max(0.01);
        let depth = body.half_extents.y + GROUND_MARGIN;
        Obb::aabb(
            body.position - Vec2::new(0.0, depth * 0.5),
            Vec2::new(half_width, depth * 0.5),
        )
    }
}
