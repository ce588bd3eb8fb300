//! Procedural wall layouts with a connectivity guarantee
//!
//! Random placement alone regularly seals off pockets of the arena, so every
//! generated layout goes through [`ensure_connectivity`], which flood-fills a
//! coarse cell grid and carves (or drops) walls until the key points can reach
//! each other.

use std::collections::VecDeque;

use glam::Vec2;
use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::wall::{Wall, WallSet};
use crate::SimConfig;
use crate::clamp_to_world;

/// Pieces this thin (or thinner) left over after a split are discarded
const MIN_PIECE: f32 = 8.0;
/// Carved gaps stay this far from the ends of the wall being split
const EDGE_PAD: f32 = 4.0;
/// Gaps in generated pairs never start closer than this to the world edge
const MIN_GAP_START: f32 = 20.0;
const GAP_RANGE: (i32, i32) = (120, 300);
const MAX_BLOCKS: usize = 2;
/// Fraction of a block trimmed away to leave its open side
const BLOCK_TRIM: f32 = 0.3;

/// Blocked-cell overlay of the world used for reachability
#[derive(Debug, Clone)]
pub struct CellGrid {
    pub cols: usize,
    pub rows: usize,
    pub cell_size: f32,
    blocked: Vec<bool>,
}

impl CellGrid {
    /// Mark every cell that shares area with a wall
    pub fn build(walls: &[Wall], world: Vec2, cell_size: f32) -> Self {
        let cols = ((world.x / cell_size).ceil() as usize).max(1);
        let rows = ((world.y / cell_size).ceil() as usize).max(1);
        let mut blocked = vec![false; cols * rows];

        for wall in walls {
            let i0 = ((wall.left() / cell_size).floor().max(0.0) as usize).min(cols - 1);
            let j0 = ((wall.top() / cell_size).floor().max(0.0) as usize).min(rows - 1);
            let i1 = ((wall.right() / cell_size).floor().max(0.0) as usize).min(cols - 1);
            let j1 = ((wall.bottom() / cell_size).floor().max(0.0) as usize).min(rows - 1);
            for j in j0..=j1 {
                for i in i0..=i1 {
                    let cell = Wall::new(
                        i as f32 * cell_size,
                        j as f32 * cell_size,
                        cell_size,
                        cell_size,
                    );
                    if wall.overlaps(&cell) {
                        blocked[j * cols + i] = true;
                    }
                }
            }
        }

        Self {
            cols,
            rows,
            cell_size,
            blocked,
        }
    }

    /// Flat index of the cell containing `p` (clamped into the grid)
    pub fn cell_index(&self, p: Vec2) -> usize {
        let i = ((p.x / self.cell_size).floor().max(0.0) as usize).min(self.cols - 1);
        let j = ((p.y / self.cell_size).floor().max(0.0) as usize).min(self.rows - 1);
        j * self.cols + i
    }

    pub fn is_blocked(&self, index: usize) -> bool {
        self.blocked.get(index).copied().unwrap_or(true)
    }

    /// Breadth-first flood over 4-neighbours
    ///
    /// Returns a per-cell reachability mask; all false when `start` is blocked.
    pub fn flood_from(&self, start: Vec2) -> Vec<bool> {
        let mut reached = vec![false; self.blocked.len()];
        let origin = self.cell_index(start);
        if self.blocked[origin] {
            return reached;
        }

        let mut queue = VecDeque::new();
        reached[origin] = true;
        queue.push_back(origin);

        while let Some(idx) = queue.pop_front() {
            let (i, j) = (idx % self.cols, idx / self.cols);
            let neighbours = [
                (i + 1 < self.cols).then(|| idx + 1),
                (i > 0).then(|| idx - 1),
                (j + 1 < self.rows).then(|| idx + self.cols),
                (j > 0).then(|| idx - self.cols),
            ];
            for next in neighbours.into_iter().flatten() {
                if !reached[next] && !self.blocked[next] {
                    reached[next] = true;
                    queue.push_back(next);
                }
            }
        }
        reached
    }
}

/// Check if `to` can be reached from `from` through open cells
pub fn is_reachable(walls: &[Wall], from: Vec2, to: Vec2, config: &SimConfig) -> bool {
    let grid = CellGrid::build(walls, config.world_size(), config.connectivity_cell_size);
    grid.flood_from(from)[grid.cell_index(to)]
}

/// Circle lies inside the world and clear of every wall
pub fn is_position_free(pos: Vec2, radius: f32, walls: &[Wall], world: Vec2) -> bool {
    let inside = pos.x - radius >= 0.0
        && pos.y - radius >= 0.0
        && pos.x + radius <= world.x
        && pos.y + radius <= world.y;
    inside && !walls.iter().any(|w| w.collides_circle(pos, radius))
}

/// Smallest gap between any two walls (None with fewer than two walls)
pub fn min_clearance(walls: &[Wall]) -> Option<f32> {
    walls
        .iter()
        .enumerate()
        .flat_map(|(i, a)| walls[i + 1..].iter().map(move |b| a.distance_to(b)))
        .reduce(f32::min)
}

/// Outcome of a connectivity repair pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub iterations: u32,
    pub carved: u32,
    pub removed: u32,
    /// Every key point was reachable when the pass finished
    pub connected: bool,
}

/// Carve or remove walls until every key point is reachable from the first
///
/// Mutates `walls` in place. Gives up after `max_repair_iterations` passes;
/// the report says whether it got there.
pub fn ensure_connectivity(
    walls: &mut Vec<Wall>,
    key_points: &[Vec2],
    config: &SimConfig,
) -> RepairReport {
    let mut report = RepairReport::default();
    let Some((&start, targets)) = key_points.split_first() else {
        report.connected = true;
        return report;
    };
    let world = config.world_size();
    let cell_size = config.connectivity_cell_size;

    while report.iterations < config.max_repair_iterations {
        let grid = CellGrid::build(walls, world, cell_size);
        let reached = grid.flood_from(start);
        let unreachable: Vec<Vec2> = targets
            .iter()
            .copied()
            .filter(|&p| !reached[grid.cell_index(p)])
            .collect();
        if unreachable.is_empty() {
            report.connected = true;
            break;
        }
        report.iterations += 1;

        for target in unreachable {
            let crossing = walls
                .iter()
                .enumerate()
                .filter(|(_, w)| w.intersects_segment(start, target))
                .map(|(i, w)| (i, w.closest_point(start).distance(start)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i);

            match crossing {
                Some(idx) => {
                    if carve_gap(walls, idx, start, target, config) {
                        report.carved += 1;
                    } else {
                        report.removed += 1;
                    }
                }
                None => {
                    // Nothing on the straight line: find a single wall whose
                    // removal opens a path
                    let opener = (0..walls.len()).find(|&i| {
                        let mut trial = walls.clone();
                        trial.remove(i);
                        is_reachable(&trial, start, target, config)
                    });
                    if let Some(idx) = opener {
                        walls.remove(idx);
                        report.removed += 1;
                    }
                }
            }
        }
    }

    if !report.connected {
        // Final pass may have fixed everything on the last iteration
        let grid = CellGrid::build(walls, world, cell_size);
        let reached = grid.flood_from(start);
        report.connected = targets.iter().all(|&p| reached[grid.cell_index(p)]);
    }

    debug!(
        "connectivity repair: {} iterations, {} carved, {} removed, connected={}",
        report.iterations, report.carved, report.removed, report.connected
    );
    report
}

/// Split `walls[idx]` around a gap where the `start`-`target` segment crosses
/// its long axis
///
/// Returns true when the wall was split, false when it had to be removed
/// (no piece survived, or a piece would crowd a neighbour).
fn carve_gap(walls: &mut Vec<Wall>, idx: usize, start: Vec2, target: Vec2, config: &SimConfig) -> bool {
    let wall = walls[idx];
    let half = config.carve_gap_size / 2.0;
    let mid = (start + target) / 2.0;
    let delta = target - start;

    let pieces: Vec<Wall> = if wall.is_vertical() {
        let axis_x = wall.center().x;
        let cross_y = if delta.x.abs() > f32::EPSILON {
            start.y + delta.y * (axis_x - start.x) / delta.x
        } else {
            mid.y
        };
        let gap_center = guarded_clamp(
            cross_y,
            wall.top() + half + EDGE_PAD,
            wall.bottom() - half - EDGE_PAD,
        );
        let top_h = gap_center - half - wall.top();
        let bottom_y = gap_center + half;
        let bottom_h = wall.bottom() - bottom_y;
        [
            (top_h > MIN_PIECE).then(|| Wall::new(wall.x, wall.y, wall.w, top_h)),
            (bottom_h > MIN_PIECE).then(|| Wall::new(wall.x, bottom_y, wall.w, bottom_h)),
        ]
        .into_iter()
        .flatten()
        .collect()
    } else {
        let axis_y = wall.center().y;
        let cross_x = if delta.y.abs() > f32::EPSILON {
            start.x + delta.x * (axis_y - start.y) / delta.y
        } else {
            mid.x
        };
        let gap_center = guarded_clamp(
            cross_x,
            wall.left() + half + EDGE_PAD,
            wall.right() - half - EDGE_PAD,
        );
        let left_w = gap_center - half - wall.left();
        let right_x = gap_center + half;
        let right_w = wall.right() - right_x;
        [
            (left_w > MIN_PIECE).then(|| Wall::new(wall.x, wall.y, left_w, wall.h)),
            (right_w > MIN_PIECE).then(|| Wall::new(right_x, wall.y, right_w, wall.h)),
        ]
        .into_iter()
        .flatten()
        .collect()
    };

    let crowded = pieces.iter().any(|piece| {
        walls
            .iter()
            .enumerate()
            .any(|(i, other)| i != idx && piece.distance_to(other) < config.min_wall_clearance)
    });

    if pieces.is_empty() || crowded {
        walls.remove(idx);
        return false;
    }
    walls.remove(idx);
    for (offset, piece) in pieces.into_iter().enumerate() {
        walls.insert(idx + offset, piece);
    }
    true
}

/// Clamp that tolerates `lo > hi` by settling on their midpoint
fn guarded_clamp(v: f32, lo: f32, hi: f32) -> f32 {
    if lo > hi { (lo + hi) / 2.0 } else { v.clamp(lo, hi) }
}

/// Integer-valued uniform pick in `[lo, hi]` (collapses to `lo` when empty)
fn pick(rng: &mut impl Rng, lo: f32, hi: f32) -> f32 {
    let (lo, hi) = (lo as i32, hi as i32);
    if hi <= lo {
        lo as f32
    } else {
        rng.random_range(lo..=hi) as f32
    }
}

fn keeps_clearance(candidate: &[Wall], placed: &[Wall], clearance: f32) -> bool {
    candidate
        .iter()
        .all(|c| placed.iter().all(|p| c.distance_to(p) >= clearance))
}

/// Deterministic baseline layout
///
/// A vertical divider at a third of the width with a centred 160-unit gap, a
/// horizontal divider at two thirds of the height to the right of it with a
/// 200-unit gap, and two pillars flanking the centre. On small worlds any
/// piece that would crowd an earlier one is left out.
pub fn generate_default_layout(config: &SimConfig) -> Vec<Wall> {
    let (w, h) = (config.world_width, config.world_height);
    let t = config.wall_thickness;

    let gap_h = 160.0;
    let gap_y = h / 2.0 - gap_h / 2.0;
    let vx = w / 3.0;

    let hy = h * 2.0 / 3.0;
    let h_start = vx + t + 100.0;
    let gap_x = w * 0.6;
    let gap_w = 200.0;

    let cx = w / 2.0 - 80.0;
    let cy = h / 2.0 - 80.0;

    let candidates = [
        Wall::new(vx, 0.0, t, gap_y),
        Wall::new(vx, gap_y + gap_h, t, h - (gap_y + gap_h)),
        Wall::new(h_start, hy, gap_x - h_start, t),
        Wall::new(gap_x + gap_w, hy, w - (gap_x + gap_w), t),
        Wall::new(cx, cy, 40.0, 160.0),
        Wall::new(cx + 120.0, cy, 40.0, 160.0),
    ];

    let mut walls: Vec<Wall> = Vec::with_capacity(candidates.len());
    for wall in candidates {
        if wall.w <= MIN_PIECE || wall.h <= MIN_PIECE {
            continue;
        }
        if keeps_clearance(&[wall], &walls, config.min_wall_clearance) {
            walls.push(wall);
        } else {
            debug!(
                "default layout: dropped wall at ({:.0}, {:.0}) for clearance",
                wall.x, wall.y
            );
        }
    }

    ensure_connectivity(&mut walls, &config.key_points(), config);
    walls
}

/// Seeded random layout of split wall pairs and small blocks
///
/// Each vertical pair spans the full height with one gap; horizontal pairs
/// mirror that. Candidates that would crowd an existing wall are retried up to
/// `placement_attempts` times and skipped after that. No connectivity repair
/// is applied here.
pub fn generate_random_layout(
    config: &SimConfig,
    seed: u64,
    vertical: u32,
    horizontal: u32,
) -> Vec<Wall> {
    let mut rng = Pcg32::seed_from_u64(seed);
    let (w, h) = (config.world_width, config.world_height);
    let t = config.wall_thickness;
    let clearance = config.min_wall_clearance;
    let mut walls: Vec<Wall> = Vec::new();

    for _ in 0..vertical {
        for _ in 0..config.placement_attempts {
            let x = pick(&mut rng, w * 0.15, w * 0.85);
            let gap = pick(&mut rng, GAP_RANGE.0 as f32, GAP_RANGE.1 as f32);
            let gap_center = pick(&mut rng, h * 0.2, h * 0.8);
            let gap_y = (gap_center - (gap / 2.0).floor()).max(MIN_GAP_START);
            let bottom_h = h - (gap_y + gap);

            let candidate: Vec<Wall> = [
                (gap_y > MIN_PIECE).then(|| Wall::new(x, 0.0, t, gap_y)),
                (bottom_h > MIN_PIECE).then(|| Wall::new(x, gap_y + gap, t, bottom_h)),
            ]
            .into_iter()
            .flatten()
            .collect();

            if keeps_clearance(&candidate, &walls, clearance) {
                walls.extend(candidate);
                break;
            }
        }
    }

    for _ in 0..horizontal {
        for _ in 0..config.placement_attempts {
            let y = pick(&mut rng, h * 0.15, h * 0.85);
            let gap = pick(&mut rng, GAP_RANGE.0 as f32, GAP_RANGE.1 as f32);
            let gap_center = pick(&mut rng, w * 0.2, w * 0.8);
            let gap_x = (gap_center - (gap / 2.0).floor()).max(MIN_GAP_START);
            let right_w = w - (gap_x + gap);

            let candidate: Vec<Wall> = [
                (gap_x > MIN_PIECE).then(|| Wall::new(0.0, y, gap_x, t)),
                (right_w > MIN_PIECE).then(|| Wall::new(gap_x + gap, y, right_w, t)),
            ]
            .into_iter()
            .flatten()
            .collect();

            if keeps_clearance(&candidate, &walls, clearance) {
                walls.extend(candidate);
                break;
            }
        }
    }

    for _ in 0..MAX_BLOCKS {
        for _ in 0..config.placement_attempts {
            let bx = pick(&mut rng, w * 0.3, w * 0.7);
            let by = pick(&mut rng, h * 0.3, h * 0.7);
            let bw = pick(&mut rng, 40.0, 120.0);
            let bh = pick(&mut rng, 40.0, 160.0);
            let keep = 1.0 - BLOCK_TRIM;

            // Trim one side to leave the block open there
            let block = match rng.random_range(0..4) {
                0 => Wall::new(bx, by + (bh * BLOCK_TRIM).floor(), bw, (bh * keep).floor()),
                1 => Wall::new(bx, by, bw, (bh * keep).floor()),
                2 => Wall::new(bx + (bw * BLOCK_TRIM).floor(), by, (bw * keep).floor(), bh),
                _ => Wall::new(bx, by, (bw * keep).floor(), bh),
            };

            if keeps_clearance(&[block], &walls, clearance) {
                walls.push(block);
                break;
            }
        }
    }

    walls
}

/// Random layout repaired for connectivity over the standard key points,
/// falling back to the default layout when the repair gives up
pub fn generate_arena(config: &SimConfig, seed: u64) -> Vec<Wall> {
    let mut walls =
        generate_random_layout(config, seed, config.vertical_walls, config.horizontal_walls);
    let report = ensure_connectivity(&mut walls, &config.key_points(), config);
    if !report.connected {
        warn!("arena seed {seed} could not be connected, using default layout");
        return generate_default_layout(config);
    }
    info!("generated arena: seed={seed}, {} walls", walls.len());
    walls
}

/// Find a spot where a circle of `radius` overlaps no wall
///
/// Tries `tries` random samples, then a square spiral outward from the world
/// centre, and finally returns the centre clamped into bounds.
pub fn find_free_position(
    radius: f32,
    walls: &[Wall],
    tries: u32,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> Vec2 {
    let world = config.world_size();

    if world.x >= 2.0 * radius && world.y >= 2.0 * radius {
        for _ in 0..tries {
            let p = Vec2::new(
                rng.random_range(radius..=world.x - radius),
                rng.random_range(radius..=world.y - radius),
            );
            if is_position_free(p, radius, walls, world) {
                return p;
            }
        }
    }

    let center = config.world_center();
    let step = radius.max(8.0);
    let max_shift = world.x.max(world.y);
    let steps_per_side = |ring: f32| (2.0 * ring / step).round() as i32;

    let mut ring = step;
    while ring < max_shift {
        let n = steps_per_side(ring);
        // Top and bottom rows, then the side columns without the corners
        let rows = (0..=n).flat_map(|k| {
            let dx = -ring + k as f32 * step;
            [Vec2::new(dx, -ring), Vec2::new(dx, ring)]
        });
        let cols = (1..n).flat_map(|k| {
            let dy = -ring + k as f32 * step;
            [Vec2::new(-ring, dy), Vec2::new(ring, dy)]
        });
        if let Some(offset) = rows
            .chain(cols)
            .find(|&o| is_position_free(center + o, radius, walls, world))
        {
            return center + offset;
        }
        ring += step;
    }

    warn!("no free position for radius {radius}, using world centre");
    clamp_to_world(center, world, radius)
}

/// Replace the arena with a fresh layout, dropping any wall that comes
/// within `min_distance` of `pos`
pub fn respawn_avoiding_entity(
    walls: &mut WallSet,
    config: &SimConfig,
    seed: u64,
    pos: Vec2,
    min_distance: f32,
) {
    let mut fresh = generate_arena(config, seed);
    let before = fresh.len();
    fresh.retain(|w| !w.collides_circle(pos, min_distance));
    debug!(
        "respawned arena around ({:.0}, {:.0}): dropped {} walls",
        pos.x,
        pos.y,
        before - fresh.len()
    );
    walls.replace(fresh);
}
