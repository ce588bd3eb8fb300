//! Axis-aligned wall obstacles
//!
//! Tanks, drones and bullets are circles, so every wall query reduces to a
//! closest-point test against a rectangle. Sight lines are segment tests
//! against the four rectangle edges.

use std::cmp::Ordering;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Candidate escape directions for a circle whose center sits inside a wall
const NUDGE_DIRECTIONS: [Vec2; 4] = [Vec2::NEG_X, Vec2::X, Vec2::NEG_Y, Vec2::Y];
const NUDGE_STEP: f32 = 1.0;

/// An axis-aligned rectangular wall
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Wall {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Taller than wide
    pub fn is_vertical(&self) -> bool {
        self.h > self.w
    }

    /// Closest point of the rectangle to `p` (p itself when inside)
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.left(), self.right()),
            p.y.clamp(self.top(), self.bottom()),
        )
    }

    /// Check if a circle overlaps the rectangle
    pub fn collides_circle(&self, center: Vec2, radius: f32) -> bool {
        (center - self.closest_point(center)).length_squared() < radius * radius
    }

    /// Point inside or on the boundary
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// Rectangles share interior area (touching edges do not count)
    pub fn overlaps(&self, other: &Wall) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    /// Minimum distance between two rectangles (0 if they touch or overlap)
    pub fn distance_to(&self, other: &Wall) -> f32 {
        let dx = (other.left() - self.right())
            .max(self.left() - other.right())
            .max(0.0);
        let dy = (other.top() - self.bottom())
            .max(self.top() - other.bottom())
            .max(0.0);
        dx.hypot(dy)
    }

    /// Push a circle out of the wall along the shortest separating vector
    ///
    /// Returns the position unchanged when there is no overlap.
    pub fn resolve_circle(&self, center: Vec2, radius: f32) -> Vec2 {
        let offset = center - self.closest_point(center);
        let dist_sq = offset.length_squared();
        if dist_sq >= radius * radius {
            return center;
        }
        if dist_sq <= f32::EPSILON {
            return self.nudge_out(center, radius);
        }
        let dist = dist_sq.sqrt();
        center + offset / dist * (radius - dist)
    }

    /// Center on or inside the rectangle: walk each candidate direction until
    /// the circle is clear and keep the shortest escape
    fn nudge_out(&self, center: Vec2, radius: f32) -> Vec2 {
        let max_steps = ((self.w + self.h + 2.0 * radius) / NUDGE_STEP).ceil() as u32 + 1;
        NUDGE_DIRECTIONS
            .iter()
            .filter_map(|&dir| {
                (1..=max_steps)
                    .map(|step| center + dir * (step as f32 * NUDGE_STEP))
                    .find(|&p| !self.collides_circle(p, radius))
            })
            .min_by(|a, b| {
                a.distance_squared(center)
                    .partial_cmp(&b.distance_squared(center))
                    .unwrap_or(Ordering::Equal)
            })
            .unwrap_or(center)
    }

    /// Check if segment `a`-`b` touches the wall
    ///
    /// An endpoint inside the rectangle counts as an intersection.
    pub fn intersects_segment(&self, a: Vec2, b: Vec2) -> bool {
        if self.contains_point(a) || self.contains_point(b) {
            return true;
        }
        let corners = [
            Vec2::new(self.left(), self.top()),
            Vec2::new(self.right(), self.top()),
            Vec2::new(self.right(), self.bottom()),
            Vec2::new(self.left(), self.bottom()),
        ];
        (0..4).any(|i| segments_intersect(a, b, corners[i], corners[(i + 1) % 4]))
    }
}

#[inline]
fn ccw(a: Vec2, b: Vec2, c: Vec2) -> bool {
    (c.y - a.y) * (b.x - a.x) > (b.y - a.y) * (c.x - a.x)
}

/// Proper intersection test for segments `p1`-`p2` and `p3`-`p4`
pub fn segments_intersect(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> bool {
    ccw(p1, p3, p4) != ccw(p2, p3, p4) && ccw(p1, p2, p3) != ccw(p1, p2, p4)
}

/// Check if the straight path `a`-`b` is clear of every wall
pub fn line_of_sight(a: Vec2, b: Vec2, walls: &[Wall]) -> bool {
    !walls.iter().any(|w| w.intersects_segment(a, b))
}

/// The arena's wall list plus its interaction toggles
///
/// Suspending the set (during the boss fight) keeps the layout but makes the
/// walls invisible and non-blocking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallSet {
    pub walls: Vec<Wall>,
    /// Walls block movement and sight
    pub collision_enabled: bool,
    /// Walls should be drawn
    pub visible: bool,
}

impl Default for WallSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl WallSet {
    pub fn new(walls: Vec<Wall>) -> Self {
        Self {
            walls,
            collision_enabled: true,
            visible: true,
        }
    }

    /// Walls currently taking part in collision (empty while suspended)
    pub fn active(&self) -> &[Wall] {
        if self.collision_enabled {
            &self.walls
        } else {
            &[]
        }
    }

    pub fn blocks_circle(&self, center: Vec2, radius: f32) -> bool {
        self.active().iter().any(|w| w.collides_circle(center, radius))
    }

    /// Push a circle out of every wall it overlaps
    pub fn resolve(&self, center: Vec2, radius: f32) -> Vec2 {
        self.active()
            .iter()
            .fold(center, |pos, w| w.resolve_circle(pos, radius))
    }

    pub fn line_of_sight(&self, a: Vec2, b: Vec2) -> bool {
        line_of_sight(a, b, self.active())
    }

    /// Hide and disable (true) or restore (false) the walls
    pub fn set_suspended(&mut self, suspended: bool) {
        self.visible = !suspended;
        self.collision_enabled = !suspended;
    }

    pub fn replace(&mut self, walls: Vec<Wall>) {
        self.walls = walls;
    }

    pub fn len(&self) -> usize {
        self.walls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walls.is_empty()
    }
}

/// Move a circle axis by axis (vertical first), reverting any axis whose
/// step lands inside an active wall so the mover slides along obstacles
///
/// Each axis is clamped to `[0, world]` before the wall test.
pub fn slide_move(pos: &mut Vec2, delta: Vec2, radius: f32, walls: Option<&WallSet>, world: Vec2) {
    let blocked = |p: Vec2| walls.is_some_and(|w| w.blocks_circle(p, radius));
    let prev = *pos;

    pos.y = (prev.y + delta.y).clamp(0.0, world.y);
    if blocked(*pos) {
        pos.y = prev.y;
    }

    pos.x = (prev.x + delta.x).clamp(0.0, world.x);
    if blocked(*pos) {
        pos.x = prev.x;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pillar() -> Wall {
        Wall::new(100.0, 100.0, 16.0, 200.0)
    }

    #[test]
    fn test_collides_circle() {
        let wall = pillar();
        assert!(wall.collides_circle(Vec2::new(90.0, 150.0), 20.0));
        assert!(!wall.collides_circle(Vec2::new(70.0, 150.0), 20.0));
        // Exactly touching is not a collision
        assert!(!wall.collides_circle(Vec2::new(80.0, 150.0), 20.0));
        // Corner distance
        assert!(!wall.collides_circle(Vec2::new(85.0, 85.0), 20.0));
        assert!(wall.collides_circle(Vec2::new(90.0, 90.0), 20.0));
    }

    #[test]
    fn test_resolve_pushes_out_shortest() {
        let wall = pillar();
        let resolved = wall.resolve_circle(Vec2::new(90.0, 150.0), 20.0);
        assert!((resolved.x - 80.0).abs() < 1e-4);
        assert!((resolved.y - 150.0).abs() < 1e-4);
        assert!(!wall.collides_circle(resolved + Vec2::new(-0.001, 0.0), 20.0));
    }

    #[test]
    fn test_resolve_without_overlap_is_identity() {
        let wall = pillar();
        let p = Vec2::new(50.0, 50.0);
        assert_eq!(wall.resolve_circle(p, 20.0), p);
    }

    #[test]
    fn test_resolve_center_inside_nudges_out() {
        let wall = pillar();
        // Center inside, nearer the left edge
        let start = Vec2::new(104.0, 200.0);
        let resolved = wall.resolve_circle(start, 20.0);
        assert!(!wall.collides_circle(resolved, 20.0));
        assert!(resolved.x < 100.0);
        assert_eq!(resolved.y, start.y);
    }

    #[test]
    fn test_distance_between_walls() {
        let a = Wall::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.distance_to(&Wall::new(30.0, 0.0, 10.0, 10.0)), 20.0);
        assert_eq!(a.distance_to(&Wall::new(5.0, 5.0, 10.0, 10.0)), 0.0);
        assert!((a.distance_to(&Wall::new(13.0, 14.0, 5.0, 5.0)) - 5.0).abs() < 1e-5);
        assert!(a.overlaps(&Wall::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Wall::new(10.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_line_of_sight() {
        let walls = vec![pillar()];
        // Straight through the pillar
        assert!(!line_of_sight(Vec2::new(50.0, 200.0), Vec2::new(200.0, 200.0), &walls));
        // Passing above it
        assert!(line_of_sight(Vec2::new(50.0, 50.0), Vec2::new(200.0, 50.0), &walls));
        // Endpoint inside the wall
        assert!(!line_of_sight(Vec2::new(108.0, 200.0), Vec2::new(108.0, 200.0), &walls));
        assert!(line_of_sight(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0), &[]));
    }

    #[test]
    fn test_suspended_walls_do_not_interact() {
        let mut set = WallSet::new(vec![pillar()]);
        let a = Vec2::new(50.0, 200.0);
        let b = Vec2::new(200.0, 200.0);
        assert!(!set.line_of_sight(a, b));
        assert!(set.blocks_circle(Vec2::new(108.0, 200.0), 5.0));

        set.set_suspended(true);
        assert!(!set.visible);
        assert!(set.line_of_sight(a, b));
        assert!(!set.blocks_circle(Vec2::new(108.0, 200.0), 5.0));
        assert_eq!(set.len(), 1);

        set.set_suspended(false);
        assert!(set.visible && set.collision_enabled);
        assert!(!set.line_of_sight(a, b));
    }

    #[test]
    fn test_slide_move_keeps_free_axis() {
        let set = WallSet::new(vec![pillar()]);
        let world = Vec2::new(1000.0, 1000.0);
        let mut pos = Vec2::new(78.0, 200.0);
        slide_move(&mut pos, Vec2::new(5.0, 5.0), 20.0, Some(&set), world);
        // Horizontal step into the wall is reverted, vertical step survives
        assert_eq!(pos.x, 78.0);
        assert_eq!(pos.y, 205.0);
    }

    #[test]
    fn test_slide_move_clamps_to_world() {
        let world = Vec2::new(100.0, 100.0);
        let mut pos = Vec2::new(98.0, 1.0);
        slide_move(&mut pos, Vec2::new(5.0, -5.0), 10.0, None, world);
        assert_eq!(pos, Vec2::new(100.0, 0.0));
    }
}
