//! Tank Arena - a top-down tank battle simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (walls, maze generation, tanks, bot AI, boss fight)
//! - `settings`: Data-driven tuning loaded from JSON
//!
//! Drawing, HUD and key bindings live outside this crate. A front-end calls
//! [`sim::tick`] once per frame and renders [`sim::GameState::snapshot`].

pub mod settings;
pub mod sim;

pub use settings::{ConfigError, DifficultyPreset, SimConfig};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Simulation ticks per second (one tick per rendered frame)
    pub const FPS: u32 = 60;
    /// Maximum ticks advanced by a single `tick` call
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default world dimensions
    pub const WORLD_WIDTH: f32 = 1600.0;
    pub const WORLD_HEIGHT: f32 = 1200.0;

    /// Tank defaults
    pub const TANK_RADIUS: f32 = 20.0;
    pub const TANK_MAX_HEALTH: f32 = 100.0;
    pub const TANK_SPEED: f32 = 3.0;
    /// Shots per second
    pub const TANK_FIRE_RATE: f32 = 4.0;
    /// Health regenerated per tick
    pub const TANK_REGEN_RATE: f32 = 0.05;

    /// Standard bullet profile
    pub const BULLET_SPEED: f32 = 7.0;
    pub const BULLET_DAMAGE: f32 = 10.0;
    pub const BULLET_RADIUS: f32 = 4.0;

    /// Shotgun pellets (fired per mount instead of the mount's own bullet)
    pub const PELLETS_PER_MOUNT: usize = 5;
    pub const PELLET_SPEED: f32 = 6.0;
    pub const PELLET_DAMAGE: f32 = 5.0;
    pub const PELLET_RADIUS: f32 = 2.5;
    pub const PELLET_SPREAD: f32 = std::f32::consts::PI / 48.0;

    /// Drones
    pub const DRONE_SPEED: f32 = 4.0;
    pub const DRONE_DAMAGE: f32 = 4.0;
    pub const DRONE_RADIUS: f32 = 6.0;
    pub const DRONE_SPAWN_INTERVAL: u32 = FPS * 3 / 2;
    pub const DRONE_LIFETIME: u32 = FPS * 20;

    /// Bot stat growth per difficulty level
    pub const BOT_BULLET_SPEED_PER_LEVEL: f32 = 0.3;
    pub const BOT_DAMAGE_PER_LEVEL: f32 = 2.0;
    pub const BOT_SPEED_PER_LEVEL: f32 = 0.2;
    pub const BOT_MAX_FIRE_RATE: f32 = 4.0;

    /// Boss
    pub const BOSS_SIZE: f32 = 60.0;
    pub const BOSS_GUN_COUNT: usize = 4;
    /// Rim guns sit this far outside the boss body
    pub const BOSS_GUN_OFFSET: f32 = 6.0;
    pub const BOSS_HEALTH_MULTIPLIER: f32 = 10.0;
    pub const BOSS_SPEED_MULTIPLIER: f32 = 0.5;
    pub const BOSS_FADE_TICKS: u32 = 3 * FPS;
    pub const BOSS_SPECIAL_DURATION: u32 = 5 * FPS;
    pub const BOSS_SPECIAL_COOLDOWN: u32 = 20 * FPS;
    pub const BOSS_SPECIAL_FIRE_MULTIPLIER: f32 = 3.0;
    /// Player bullets hit the boss inside this multiple of its size
    pub const BOSS_HIT_RADIUS_SCALE: f32 = 1.4;
    pub const BOSS_KILL_EXP: u32 = 50;

    /// Visual tags (0xRRGGBB) handed to the renderer
    pub const PLAYER_COLOR: u32 = 0xFFFFFF;
    pub const BOT_COLOR: u32 = 0x00FF00;
    pub const BOSS_COLOR: u32 = 0xC83232;
    pub const BOSS_BULLET_COLOR: u32 = 0xFFC832;
    pub const DRONE_COLOR: u32 = 0x00C8C8;
}

/// Unit vector pointing along `angle` (radians)
#[inline]
pub fn heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle (radians) of the direction from `from` to `to`
#[inline]
pub fn angle_to(from: Vec2, to: Vec2) -> f32 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Clamp a position into `[margin, size - margin]` on both axes
///
/// When the margin exceeds half the world the position collapses to the
/// world center on that axis.
#[inline]
pub fn clamp_to_world(pos: Vec2, size: Vec2, margin: f32) -> Vec2 {
    let clamp_axis = |v: f32, extent: f32| {
        if 2.0 * margin > extent {
            extent / 2.0
        } else {
            v.clamp(margin, extent - margin)
        }
    };
    Vec2::new(clamp_axis(pos.x, size.x), clamp_axis(pos.y, size.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_heading_unit_length() {
        let h = heading(PI / 3.0);
        assert!((h.length() - 1.0).abs() < 1e-5);
        assert!((heading(0.0) - Vec2::X).length() < 1e-6);
    }

    #[test]
    fn test_angle_to() {
        let a = angle_to(Vec2::ZERO, Vec2::new(0.0, 10.0));
        assert!((a - PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_clamp_to_world() {
        let size = Vec2::new(100.0, 50.0);
        assert_eq!(clamp_to_world(Vec2::new(-5.0, 60.0), size, 0.0), Vec2::new(0.0, 50.0));
        assert_eq!(clamp_to_world(Vec2::new(5.0, 5.0), size, 10.0), Vec2::new(10.0, 10.0));
        // Margin larger than the world collapses to the center
        assert_eq!(clamp_to_world(Vec2::new(5.0, 5.0), size, 30.0), Vec2::new(30.0, 25.0));
    }
}
