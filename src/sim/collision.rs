//! Collision detection and response for circular bodies
//!
//! Every body in the arena (player, agents, bullets, pickups) is a circle.
//! Contact means the circles overlap or touch.

use glam::Vec2;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the surface of `b` (if hit)
    pub point: Vec2,
    /// Unit normal from `b` toward `a`
    pub normal: Vec2,
    /// Overlap depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check contact between circle `a` and circle `b`
///
/// Concentric circles report a hit with an arbitrary (+X) normal so callers can
/// still push the bodies apart.
pub fn circle_collision(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> CollisionResult {
    let offset = a_pos - b_pos;
    let reach = a_radius + b_radius;
    let dist_sq = offset.length_squared();
    if dist_sq > reach * reach {
        return CollisionResult::miss();
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > f32::EPSILON {
        offset / dist
    } else {
        Vec2::X
    };
    CollisionResult {
        hit: true,
        point: b_pos + normal * b_radius,
        normal,
        penetration: reach - dist,
    }
}

/// Quick overlap test without building a `CollisionResult`
#[inline]
pub fn circles_touch(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a_pos.distance_squared(b_pos) <= reach * reach
}

/// Slide `a` out of `b` so the two bodies just touch (b stays put)
pub fn resolve_penetration(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> Vec2 {
    let result = circle_collision(a_pos, a_radius, b_pos, b_radius);
    if result.hit && result.penetration > 0.0 {
        a_pos + result.normal * result.penetration
    } else {
        a_pos
    }
}
