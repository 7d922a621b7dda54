//! Collision primitives for boxes and rays
//!
//! Everything in the level is a box: the player is axis-aligned, platforms
//! may be rotated. Overlaps use the separating axis test, rays use slabs in
//! the box's local frame.

use std::ops::BitOr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::rotate_vec;

/// Bit set of collision layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    /// Floors the player can stand on
    pub const GROUND: LayerMask = LayerMask(1 << 0);
    /// Walls and ceilings
    pub const WALL: LayerMask = LayerMask(1 << 1);
    /// Grapple-able platforms
    pub const PLATFORM: LayerMask = LayerMask(1 << 2);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// True if any layer is shared
    #[inline]
    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: LayerMask) -> LayerMask {
        LayerMask(self.0 | rhs.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::GROUND
    }
}

/// Oriented box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obb {
    pub center: Vec2,
    pub half_extents: Vec2,
    /// Rotation in radians (counter-clockwise)
    #[serde(default)]
    pub angle: f32,
}

impl Obb {
    pub fn new(center: Vec2, half_extents: Vec2, angle: f32) -> Self {
        Self {
            center,
            half_extents,
            angle,
        }
    }

    /// Axis-aligned box
    pub fn aabb(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center, half_extents, 0.0)
    }

    /// Local X and Y axes in world space
    #[inline]
    pub fn axes(&self) -> [Vec2; 2] {
        let x = Vec2::from_angle(self.angle);
        [x, x.perp()]
    }

    /// World point into the box's local frame
    #[inline]
    pub fn to_local(&self, point: Vec2) -> Vec2 {
        rotate_vec(point - self.center, -self.angle)
    }

    /// Local point into world space
    #[inline]
    pub fn to_world(&self, local: Vec2) -> Vec2 {
        self.center + rotate_vec(local, self.angle)
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        let local = self.to_local(point);
        local.x.abs() <= self.half_extents.x && local.y.abs() <= self.half_extents.y
    }

    /// Projection interval of the box onto `axis` (unit length)
    fn project(&self, axis: Vec2) -> (f32, f32) {
        let [ax, ay] = self.axes();
        let c = self.center.dot(axis);
        let r = self.half_extents.x * ax.dot(axis).abs() + self.half_extents.y * ay.dot(axis).abs();
        (c - r, c + r)
    }

    /// Same box grown by `margin` on every side
    pub fn inflated(&self, margin: f32) -> Self {
        Self {
            half_extents: self.half_extents + Vec2::splat(margin),
            ..*self
        }
    }
}

/// Minimum translation to separate two overlapping boxes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Unit normal pointing from the other box toward the first one
    pub normal: Vec2,
    pub depth: f32,
}

/// Separating axis test between two boxes.
///
/// Returns the smallest push that moves `a` out of `b`, or `None` if they
/// are separated or only touching.
pub fn box_box_penetration(a: &Obb, b: &Obb) -> Option<Penetration> {
    let [a0, a1] = a.axes();
    let [b0, b1] = b.axes();

    let mut best: Option<Penetration> = None;
    for axis in [a0, a1, b0, b1] {
        let (amin, amax) = a.project(axis);
        let (bmin, bmax) = b.project(axis);
        let overlap = amax.min(bmax) - amin.max(bmin);
        if overlap <= 0.0 {
            return None;
        }
        if best.is_none_or(|p| overlap < p.depth) {
            let normal = if (a.center - b.center).dot(axis) < 0.0 {
                -axis
            } else {
                axis
            };
            best = Some(Penetration {
                normal,
                depth: overlap,
            });
        }
    }
    best
}

/// Ray/box intersection result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayBoxHit {
    pub distance: f32,
    /// Surface normal at the hit, pointing out of the box
    pub normal: Vec2,
}

/// Cast a ray against a box.
///
/// `dir` must be unit length. A ray starting inside the box hits at distance
/// zero with a normal facing back along the ray.
pub fn ray_box(origin: Vec2, dir: Vec2, max_distance: f32, obb: &Obb) -> Option<RayBoxHit> {
    let o = obb.to_local(origin);
    let d = rotate_vec(dir, -obb.angle);
    let h = obb.half_extents;

    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    let mut near_normal = Vec2::ZERO;

    for (i, axis) in [Vec2::X, Vec2::Y].into_iter().enumerate() {
        let (oi, di, hi) = (o[i], d[i], h[i]);
        if di.abs() < 1e-8 {
            if oi.abs() > hi {
                return None;
            }
            continue;
        }
        let mut t1 = (-hi - oi) / di;
        let mut t2 = (hi - oi) / di;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        if t1 > t_near {
            t_near = t1;
            // Entered through the face opposing the travel direction
            near_normal = -axis * di.signum();
        }
        t_far = t_far.min(t2);
        if t_near > t_far {
            return None;
        }
    }

    if t_far < 0.0 {
        return None;
    }
    if t_near < 0.0 {
        return Some(RayBoxHit {
            distance: 0.0,
            normal: -dir,
        });
    }
    if t_near > max_distance {
        return None;
    }
    Some(RayBoxHit {
        distance: t_near,
        normal: rotate_vec(near_normal, obb.angle),
    })
}
