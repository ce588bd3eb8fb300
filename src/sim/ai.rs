//! Bot steering
//!
//! Bots circle their target at a preferred range, keep apart from each other
//! and drift a little. When a wall hides the target they fall back to a
//! one-axis patrol until it comes back into view.

use glam::Vec2;
use rand::Rng;

use super::entity::{AiState, Axis, Patrol};
use super::wall::{WallSet, slide_move};
use crate::{SimConfig, angle_to, heading};

const ORBIT_WEIGHT: f32 = 1.0;
const APPROACH_WEIGHT: f32 = 0.5;
const RETREAT_WEIGHT: f32 = 0.6;
const SEPARATION_WEIGHT: f32 = 0.8;
const SEPARATION_CAP: f32 = 2.0;
const WANDER_STRENGTH: f32 = 0.3;
const WANDER_JITTER: f32 = 0.15;
const MIN_STEER_SPEED: f32 = 0.5;
const TARGET_SPEED_FACTOR: f32 = 0.75;
const PATROL_TICKS: (u32, u32) = (60, 180);

/// Range tuning shared by bots and the boss
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringParams {
    pub preferred_distance: f32,
    pub separation_radius: f32,
}

impl SteeringParams {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            preferred_distance: config.preferred_distance,
            separation_radius: config.separation_radius,
        }
    }
}

/// What the steering chases
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringTarget {
    pub pos: Vec2,
    /// Target's movement speed; bots move at a fraction of it
    pub speed: f32,
}

/// Result of one steering step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteerOutcome {
    /// Angle from the (moved) bot to the target
    pub aim: f32,
    /// Displacement actually applied
    pub moved: Vec2,
    pub patrolling: bool,
}

/// Bot speed for a given target speed
#[inline]
pub fn steer_speed(target_speed: f32) -> f32 {
    (target_speed * TARGET_SPEED_FACTOR).max(MIN_STEER_SPEED)
}

/// Desired movement from orbit, radial, separation and wander forces
///
/// Advances the wander phase. The result is not yet scaled to speed.
fn combined_force(
    pos: Vec2,
    ai: &mut AiState,
    neighbors: &[Vec2],
    target: Vec2,
    params: &SteeringParams,
    rng: &mut impl Rng,
) -> Vec2 {
    let offset = target - pos;
    let dist = offset.length() + 1e-5;
    let dir = offset / dist;

    let orbit = dir.perp() * ai.orbit_dir * ORBIT_WEIGHT;

    let radial = if dist < params.preferred_distance * 0.8 {
        -dir * RETREAT_WEIGHT
    } else if dist > params.preferred_distance * 1.2 {
        dir * APPROACH_WEIGHT
    } else {
        Vec2::ZERO
    };

    let separation: Vec2 = neighbors
        .iter()
        .filter_map(|&other| {
            let away = pos - other;
            let d = away.length();
            (d > 1.0 && d < params.separation_radius)
                .then(|| away / d * (params.separation_radius / d - 1.0).min(SEPARATION_CAP))
        })
        .sum();

    ai.wander_angle += rng.random_range(-WANDER_JITTER..=WANDER_JITTER);
    let wander = heading(ai.wander_angle) * WANDER_STRENGTH;

    orbit + radial + separation * SEPARATION_WEIGHT + wander
}

/// Patrol velocity direction, creating or flipping the patrol as needed
fn patrol_direction(ai: &mut AiState, rng: &mut impl Rng) -> Vec2 {
    let patrol = ai.patrol.get_or_insert_with(|| Patrol {
        axis: if rng.random_bool(0.75) { Axis::Y } else { Axis::X },
        dir: if rng.random_bool(0.5) { 1.0 } else { -1.0 },
        timer: rng.random_range(PATROL_TICKS.0..=PATROL_TICKS.1),
    });

    patrol.timer = patrol.timer.saturating_sub(1);
    if patrol.timer == 0 {
        patrol.dir = -patrol.dir;
        patrol.timer = rng.random_range(PATROL_TICKS.0..=PATROL_TICKS.1);
    }

    match patrol.axis {
        Axis::X => Vec2::new(patrol.dir, 0.0),
        Axis::Y => Vec2::new(0.0, patrol.dir),
    }
}

/// Move one bot for one tick and aim it at the target
///
/// With `walls` supplied and the target out of sight, the blended force is
/// replaced by a patrol along a single axis. Movement slides along walls and
/// stays inside `world`.
#[allow(clippy::too_many_arguments)]
pub fn steer(
    pos: &mut Vec2,
    radius: f32,
    ai: &mut AiState,
    neighbors: &[Vec2],
    target: SteeringTarget,
    walls: Option<&WallSet>,
    world: Vec2,
    params: &SteeringParams,
    rng: &mut impl Rng,
) -> SteerOutcome {
    let speed = steer_speed(target.speed);
    let mut desired = combined_force(*pos, ai, neighbors, target.pos, params, rng);

    let blind = walls.is_some_and(|w| !w.line_of_sight(*pos, target.pos));
    if blind {
        desired = patrol_direction(ai, rng);
    } else {
        ai.patrol = None;
    }

    let step = if desired.length_squared() > 0.0 {
        desired.normalize() * speed
    } else {
        Vec2::ZERO
    };

    let before = *pos;
    slide_move(pos, step, radius, walls, world);

    SteerOutcome {
        aim: angle_to(*pos, target.pos),
        moved: *pos - before,
        patrolling: blind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::wall::Wall;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const WORLD: Vec2 = Vec2::new(1600.0, 1200.0);

    fn params() -> SteeringParams {
        SteeringParams {
            preferred_distance: 220.0,
            separation_radius: 60.0,
        }
    }

    fn calm_ai() -> AiState {
        AiState {
            orbit_dir: 1.0,
            wander_angle: 0.0,
            patrol: None,
        }
    }

    #[test]
    fn test_speed_floor() {
        assert_eq!(steer_speed(0.1), MIN_STEER_SPEED);
        assert!((steer_speed(4.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_moves_at_target_speed_and_aims() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut pos = Vec2::new(200.0, 600.0);
        let mut ai = calm_ai();
        let target = SteeringTarget {
            pos: Vec2::new(1000.0, 600.0),
            speed: 4.0,
        };
        let out = steer(&mut pos, 20.0, &mut ai, &[], target, None, WORLD, &params(), &mut rng);
        assert!((out.moved.length() - 3.0).abs() < 1e-4);
        // Far away: approach dominates the x component
        assert!(out.moved.x > 0.0);
        assert!(out.aim.abs() < 0.05);
        assert!(!out.patrolling);
    }

    #[test]
    fn test_retreats_when_too_close() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut ai = calm_ai();
        let force = combined_force(
            Vec2::new(900.0, 600.0),
            &mut ai,
            &[],
            Vec2::new(1000.0, 600.0),
            &params(),
            &mut rng,
        );
        // Retreat (-0.6) plus at most 0.3 of wander along x
        assert!(force.x < 0.0);
    }

    #[test]
    fn test_separation_pushes_apart() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut lonely = calm_ai();
        let mut crowded = calm_ai();
        let pos = Vec2::new(500.0, 600.0);
        let target = Vec2::new(720.0, 600.0);
        let alone = combined_force(pos, &mut lonely, &[], target, &params(), &mut rng);
        let mut rng = Pcg32::seed_from_u64(3);
        let pushed = combined_force(pos, &mut crowded, &[Vec2::new(520.0, 600.0)], target, &params(), &mut rng);
        // Neighbour 20 to the right: strength min(60/20 - 1, 2) = 2, weighted 0.8
        assert!((alone.x - pushed.x - 1.6).abs() < 1e-4);
    }

    #[test]
    fn test_patrol_moves_on_one_axis_until_sight_returns() {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut walls = WallSet::new(vec![Wall::new(600.0, 0.0, 16.0, 1200.0)]);
        let mut pos = Vec2::new(300.0, 600.0);
        let mut ai = calm_ai();
        let target = SteeringTarget {
            pos: Vec2::new(1000.0, 600.0),
            speed: 3.0,
        };

        for _ in 0..50 {
            let out = steer(&mut pos, 20.0, &mut ai, &[], target, Some(&walls), WORLD, &params(), &mut rng);
            assert!(out.patrolling);
            assert!(out.moved.x == 0.0 || out.moved.y == 0.0);
            assert!(out.aim.abs() < 1.0);
        }
        assert!(ai.patrol.is_some());

        walls.set_suspended(true);
        let out = steer(&mut pos, 20.0, &mut ai, &[], target, Some(&walls), WORLD, &params(), &mut rng);
        assert!(!out.patrolling);
        assert!(ai.patrol.is_none());
    }

    #[test]
    fn test_diagonal_into_wall_keeps_free_axis() {
        let walls = WallSet::new(vec![Wall::new(600.0, 0.0, 16.0, 1200.0)]);
        let mut pos = Vec2::new(578.0, 600.0);
        slide_move(&mut pos, Vec2::new(3.0, 2.0), 20.0, Some(&walls), WORLD);
        assert_eq!(pos, Vec2::new(578.0, 602.0));
    }
}
