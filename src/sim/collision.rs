//! Proximity and overlap tests for world-space circles
//!
//! Everything in the world is a point with a radius, so all checks reduce
//! to squared-distance comparisons.

use glam::DVec2;

use super::state::{EntityId, Enemy, Node, Obstacle};

/// What stopped a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocker {
    Obstacle(EntityId),
    Enemy(EntityId),
}

/// True if `a` and `b` are at most `radius` apart
#[inline]
pub fn within_radius(a: DVec2, b: DVec2, radius: f64) -> bool {
    a.distance_squared(b) <= radius * radius
}

/// True if two circles overlap (touching does not count)
#[inline]
pub fn circles_overlap(a: DVec2, a_radius: f64, b: DVec2, b_radius: f64) -> bool {
    let reach = a_radius + b_radius;
    a.distance_squared(b) < reach * reach
}

/// True if any node lies within `radius` of `point`
pub fn any_node_within(nodes: &[Node], point: DVec2, radius: f64) -> bool {
    nodes.iter().any(|n| within_radius(n.pos, point, radius))
}

/// First obstacle overlapping a circle at `pos`
pub fn obstacle_blocking(obstacles: &[Obstacle], pos: DVec2, radius: f64) -> Option<Blocker> {
    obstacles
        .iter()
        .find(|o| circles_overlap(pos, radius, o.pos, o.radius))
        .map(|o| Blocker::Obstacle(o.id))
}

/// First enemy overlapping a circle at `pos`
pub fn enemy_blocking(enemies: &[Enemy], pos: DVec2, radius: f64) -> Option<Blocker> {
    enemies
        .iter()
        .find(|e| circles_overlap(pos, radius, e.pos, e.radius))
        .map(|e| Blocker::Enemy(e.id))
}

/// Distance from `pos` to the nearest obstacle rim (negative when inside)
pub fn nearest_rim_distance(obstacles: &[Obstacle], pos: DVec2) -> Option<f64> {
    obstacles
        .iter()
        .map(|o| pos.distance(o.pos) - o.radius)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}
