//! Physics world: static solids, kinematic platforms and the player body
//!
//! The player is the only dynamic body. It is integrated with semi-implicit
//! Euler under gravity, accumulated forces and an optional spring joint,
//! then pushed out of whatever it overlaps. New contacts are reported as
//! collision-enter events.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{LayerMask, Obb, box_box_penetration, ray_box};
use super::platform::{PlatformContract, PlatformId, PlatformRegistry};

/// Extra margin used to keep resting contacts alive between steps
const CONTACT_SLOP: f32 = 0.01;
/// Push-out passes per step (corners need more than one)
const SOLVER_PASSES: usize = 4;

/// Static level geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    pub obb: Obb,
    #[serde(default)]
    pub layer: LayerMask,
}

/// Anything the player can touch or the grapple can hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColliderRef {
    Solid(usize),
    Platform(PlatformId),
}

/// Closest ray hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec2,
    pub normal: Vec2,
    pub distance: f32,
    pub collider: ColliderRef,
}

impl RayHit {
    /// Platform handle if a platform was hit
    pub fn platform(&self) -> Option<PlatformId> {
        match self.collider {
            ColliderRef::Platform(id) => Some(id),
            ColliderRef::Solid(_) => None,
        }
    }
}

/// A contact that did not exist on the previous step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub collider: ColliderRef,
    /// Unit normal pointing from the collider toward the player
    pub normal: Vec2,
    /// Closing speed along the normal
    pub impact_speed: f32,
    /// Player velocity right before the contact was solved
    pub prior_velocity: Vec2,
}

/// The player's rigid body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub position: Vec2,
    pub velocity: Vec2,
    pub half_extents: Vec2,
    pub mass: f32,
    /// Force accumulated for the next integration, cleared afterwards
    #[serde(skip)]
    pub force: Vec2,
}

impl RigidBody {
    pub fn new(position: Vec2, half_extents: Vec2, mass: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            half_extents,
            mass,
            force: Vec2::ZERO,
        }
    }

    pub fn obb(&self) -> Obb {
        Obb::aabb(self.position, self.half_extents)
    }

    pub fn inv_mass(&self) -> f32 {
        if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 }
    }

    pub fn add_force(&mut self, force: Vec2) {
        self.force += force;
    }
}

/// Where the far end of a spring joint is attached
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointAnchor {
    /// Fixed world point, no connected body
    World(Vec2),
    /// Point in a platform's local frame; the platform is the connected body
    Body { platform: PlatformId, local: Vec2 },
}

/// Distance-limited spring between the player and an anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringJoint {
    pub anchor: JointAnchor,
    pub min_distance: f32,
    pub max_distance: f32,
    pub spring: f32,
    pub damper: f32,
    /// Scales the player's inverse mass as seen by the joint
    pub mass_scale: f32,
}

/// Level geometry plus everything needed to move the player
#[derive(Debug, Clone)]
pub struct World {
    pub gravity: Vec2,
    pub solids: Vec<Solid>,
    pub platforms: PlatformRegistry,
    /// Colliders touched on the previous step, sorted
    touching: Vec<ColliderRef>,
}

impl World {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            gravity,
            solids: Vec::new(),
            platforms: PlatformRegistry::new(),
            touching: Vec::new(),
        }
    }

    pub fn add_solid(&mut self, obb: Obb, layer: LayerMask) -> ColliderRef {
        self.solids.push(Solid { obb, layer });
        ColliderRef::Solid(self.solids.len() - 1)
    }

    /// Every collider that currently exists, in a stable order
    pub fn colliders(&self) -> impl Iterator<Item = (ColliderRef, Obb, LayerMask)> + '_ {
        let solids = self
            .solids
            .iter()
            .enumerate()
            .map(|(i, s)| (ColliderRef::Solid(i), s.obb, s.layer));
        let platforms = self
            .platforms
            .iter()
            .filter(|p| p.active)
            .map(|p| (ColliderRef::Platform(p.id), p.body.obb(), p.layer));
        solids.chain(platforms)
    }

    /// Closest hit along a ray, limited to `mask`
    pub fn raycast(&self, origin: Vec2, dir: Vec2, max_distance: f32, mask: LayerMask) -> Option<RayHit> {
        let dir = dir.normalize_or_zero();
        if dir == Vec2::ZERO {
            return None;
        }
        self.colliders()
            .filter(|(_, _, layer)| layer.intersects(mask))
            .filter_map(|(collider, obb, _)| {
                ray_box(origin, dir, max_distance, &obb).map(|hit| RayHit {
                    point: origin + dir * hit.distance,
                    normal: hit.normal,
                    distance: hit.distance,
                    collider,
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// True if `obb` overlaps any collider in `mask`
    pub fn box_overlap(&self, obb: &Obb, mask: LayerMask) -> bool {
        self.colliders()
            .filter(|(_, _, layer)| layer.intersects(mask))
            .any(|(_, other, _)| box_box_penetration(obb, &other).is_some())
    }

    /// World position of a joint anchor; `None` once the platform is gone
    pub fn anchor_position(&self, anchor: &JointAnchor) -> Option<Vec2> {
        match *anchor {
            JointAnchor::World(point) => Some(point),
            JointAnchor::Body { platform, local } => self
                .platforms
                .get(platform)
                .filter(|p| p.active)
                .map(|p| p.body.transform_point(local)),
        }
    }

    fn anchor_velocity(&self, anchor: &JointAnchor, at: Vec2) -> Vec2 {
        match *anchor {
            JointAnchor::World(_) => Vec2::ZERO,
            JointAnchor::Body { platform, .. } => self
                .platforms
                .get(platform)
                .map(|p| p.body.point_velocity(at))
                .unwrap_or(Vec2::ZERO),
        }
    }

    /// Acceleration a spring joint applies to `body`
    pub fn joint_acceleration(&self, body: &RigidBody, joint: &SpringJoint) -> Vec2 {
        let Some(anchor) = self.anchor_position(&joint.anchor) else {
            return Vec2::ZERO;
        };
        let offset = body.position - anchor;
        let len = offset.length();
        if len <= f32::EPSILON {
            return Vec2::ZERO;
        }
        let dir = offset / len;

        let overshoot = if len > joint.max_distance {
            len - joint.max_distance
        } else if len < joint.min_distance {
            len - joint.min_distance
        } else {
            return Vec2::ZERO;
        };

        let relative_speed = (body.velocity - self.anchor_velocity(&joint.anchor, anchor)).dot(dir);
        let force = -(joint.spring * overshoot + joint.damper * relative_speed) * dir;
        force * body.inv_mass() * joint.mass_scale
    }

    /// Integrate the player body for one step and resolve contacts.
    ///
    /// Returns contacts that began this step.
    pub fn step_body(&mut self, body: &mut RigidBody, joint: Option<&SpringJoint>, dt: f32) -> Vec<ContactEvent> {
        let mut accel = self.gravity + body.force * body.inv_mass();
        if let Some(joint) = joint {
            accel += self.joint_acceleration(body, joint);
        }
        body.velocity += accel * dt;
        body.force = Vec2::ZERO;

        let prior_velocity = body.velocity;
        body.position += body.velocity * dt;

        let mut normals: Vec<(ColliderRef, Vec2)> = Vec::new();
        for _ in 0..SOLVER_PASSES {
            let mut moved = false;
            let colliders: Vec<_> = self.colliders().collect();
            for (collider, obb, _) in colliders {
                let Some(pen) = box_box_penetration(&body.obb(), &obb) else {
                    continue;
                };
                body.position += pen.normal * pen.depth;
                let vn = body.velocity.dot(pen.normal);
                if vn < 0.0 {
                    body.velocity -= pen.normal * vn;
                }
                if !normals.iter().any(|(c, _)| *c == collider) {
                    normals.push((collider, pen.normal));
                }
                moved = true;
            }
            if !moved {
                break;
            }
        }

        // Resting contacts sit exactly on the surface; the slop keeps them alive
        let probe = body.obb().inflated(CONTACT_SLOP);
        for (collider, obb, _) in self.colliders() {
            if normals.iter().any(|(c, _)| *c == collider) {
                continue;
            }
            if let Some(pen) = box_box_penetration(&probe, &obb) {
                normals.push((collider, pen.normal));
            }
        }
        normals.sort_by_key(|(c, _)| *c);

        let mut entered = Vec::new();
        for (collider, normal) in &normals {
            if self.touching.binary_search(collider).is_err() {
                entered.push(ContactEvent {
                    collider: *collider,
                    normal: *normal,
                    impact_speed: (-prior_velocity.dot(*normal)).max(0.0),
                    prior_velocity,
                });
            }
        }
        self.touching = normals.into_iter().map(|(c, _)| c).collect();
        entered
    }

    /// Whether the grapple may latch onto `id`
    pub fn platform_is_valid(&self, id: PlatformId) -> bool {
        self.platforms.get(id).is_some_and(|p| p.is_valid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::platform::{PlatformBody, PlatformKind};

    fn world_with_floor() -> World {
        let mut world = World::new(Vec2::new(0.0, -20.0));
        world.add_solid(Obb::aabb(Vec2::new(0.0, -0.5), Vec2::new(50.0, 0.5)), LayerMask::GROUND);
        world
    }

    #[test]
    fn test_body_falls_and_lands() {
        let mut world = world_with_floor();
        let mut body = RigidBody::new(Vec2::new(0.0, 2.0), Vec2::splat(0.5), 1.0);

        let mut landed = Vec::new();
        for _ in 0..120 {
            landed.extend(world.step_body(&mut body, None, SIM_DT));
        }
        assert!((body.position.y - 0.5).abs() < 0.02, "y = {}", body.position.y);
        assert!(body.velocity.y.abs() < 0.5);
        // One enter event for the floor, resting contact after that
        assert_eq!(landed.len(), 1);
        assert_eq!(landed[0].collider, ColliderRef::Solid(0));
        assert!((landed[0].normal - Vec2::Y).length() < 1e-4);
        assert!(landed[0].prior_velocity.y < -5.0);
    }

    #[test]
    fn test_side_contact_reports_normal_toward_player() {
        let mut world = World::new(Vec2::ZERO);
        world.add_solid(Obb::aabb(Vec2::new(2.0, 0.0), Vec2::new(0.5, 5.0)), LayerMask::WALL);
        let mut body = RigidBody::new(Vec2::ZERO, Vec2::splat(0.5), 1.0);
        body.velocity = Vec2::new(12.0, 0.0);

        let mut events = Vec::new();
        for _ in 0..10 {
            events.extend(world.step_body(&mut body, None, SIM_DT));
        }
        assert_eq!(events.len(), 1);
        let contact = events[0];
        assert!((contact.normal - Vec2::NEG_X).length() < 1e-4);
        assert!((contact.impact_speed - 12.0).abs() < 1e-3);
        assert!(body.velocity.x.abs() < 1e-4);
        assert!(body.position.x <= 1.0 + 1e-4);
    }

    #[test]
    fn test_raycast_returns_nearest_and_filters_layers() {
        let mut world = World::new(Vec2::ZERO);
        world.add_solid(Obb::aabb(Vec2::new(0.0, 3.0), Vec2::new(1.0, 0.25)), LayerMask::WALL);
        let id = world.platforms.spawn(
            PlatformKind::Fixed,
            PlatformBody::new(Vec2::new(0.0, 6.0), Vec2::new(1.0, 0.25), 0.0),
        );

        let hit = world.raycast(Vec2::ZERO, Vec2::Y, 10.0, LayerMask::ALL).unwrap();
        assert_eq!(hit.collider, ColliderRef::Solid(0));
        assert!((hit.point.y - 2.75).abs() < 1e-5);

        let hit = world.raycast(Vec2::ZERO, Vec2::Y, 10.0, LayerMask::PLATFORM).unwrap();
        assert_eq!(hit.platform(), Some(id));
        assert!((hit.distance - 5.75).abs() < 1e-5);
    }

    #[test]
    fn test_inactive_platforms_are_ignored() {
        let mut world = World::new(Vec2::ZERO);
        let id = world.platforms.spawn(
            PlatformKind::Attached,
            PlatformBody::new(Vec2::new(0.0, 4.0), Vec2::new(1.0, 0.25), 0.0),
        );
        world.platforms.get_mut(id).unwrap().active = false;
        assert!(world.raycast(Vec2::ZERO, Vec2::Y, 10.0, LayerMask::ALL).is_none());
        assert!(!world.platform_is_valid(id));
        let anchor = JointAnchor::Body {
            platform: id,
            local: Vec2::ZERO,
        };
        assert!(world.anchor_position(&anchor).is_none());
    }

    #[test]
    fn test_joint_only_pulls_outside_limits() {
        let world = World::new(Vec2::ZERO);
        let joint = SpringJoint {
            anchor: JointAnchor::World(Vec2::new(0.0, 5.0)),
            min_distance: 1.0,
            max_distance: 4.0,
            spring: 10.0,
            damper: 0.0,
            mass_scale: 1.0,
        };

        let body = RigidBody::new(Vec2::new(0.0, 2.0), Vec2::splat(0.5), 1.0);
        assert_eq!(world.joint_acceleration(&body, &joint), Vec2::ZERO);

        // Stretched 1 past max: pulled toward the anchor
        let body = RigidBody::new(Vec2::new(0.0, 0.0), Vec2::splat(0.5), 1.0);
        let accel = world.joint_acceleration(&body, &joint);
        assert!((accel - Vec2::new(0.0, 10.0)).length() < 1e-4);

        // Compressed inside min: pushed away
        let body = RigidBody::new(Vec2::new(0.0, 4.5), Vec2::splat(0.5), 1.0);
        assert!(world.joint_acceleration(&body, &joint).y < 0.0);
    }

    #[test]
    fn test_joint_mass_scale_and_damper() {
        let world = World::new(Vec2::ZERO);
        let joint = SpringJoint {
            anchor: JointAnchor::World(Vec2::ZERO),
            min_distance: 0.0,
            max_distance: 1.0,
            spring: 0.0,
            damper: 2.0,
            mass_scale: 3.0,
        };
        let mut body = RigidBody::new(Vec2::new(2.0, 0.0), Vec2::splat(0.5), 2.0);
        body.velocity = Vec2::new(1.0, 0.0);
        // F = -damper * v = -2, a = F / m * scale = -3
        let accel = world.joint_acceleration(&body, &joint);
        assert!((accel.x + 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_forces_cleared_after_step() {
        let mut world = World::new(Vec2::ZERO);
        let mut body = RigidBody::new(Vec2::ZERO, Vec2::splat(0.5), 2.0);
        body.add_force(Vec2::new(4.0, 0.0));
        world.step_body(&mut body, None, 1.0);
        assert!((body.velocity.x - 2.0).abs() < 1e-6);
        assert_eq!(body.force, Vec2::ZERO);
    }
}
