//! Simulation tuning
//!
//! Everything a front-end may want to tweak without touching the fixed game
//! constants in [`crate::consts`]. Loaded from JSON; missing fields keep their
//! defaults.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Difficulty preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DifficultyPreset {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl DifficultyPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyPreset::Easy => "Easy",
            DifficultyPreset::Normal => "Normal",
            DifficultyPreset::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(DifficultyPreset::Easy),
            "normal" | "norm" => Some(DifficultyPreset::Normal),
            "hard" => Some(DifficultyPreset::Hard),
            _ => None,
        }
    }

    /// Multiplier on the ticks between bot spawns
    pub fn spawn_interval_scale(&self) -> f32 {
        match self {
            DifficultyPreset::Easy => 1.5,
            DifficultyPreset::Normal => 1.0,
            DifficultyPreset::Hard => 0.7,
        }
    }

    /// Extra bots allowed alive at once (may be negative)
    pub fn max_bots_delta(&self) -> i32 {
        match self {
            DifficultyPreset::Easy => -2,
            DifficultyPreset::Normal => 0,
            DifficultyPreset::Hard => 3,
        }
    }

    /// Multiplier on bot fire rate
    pub fn fire_rate_scale(&self) -> f32 {
        match self {
            DifficultyPreset::Easy => 0.8,
            DifficultyPreset::Normal => 1.0,
            DifficultyPreset::Hard => 1.25,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("carve gap {gap} is narrower than the wall clearance {clearance}")]
    GapBelowClearance { gap: f32, clearance: f32 },
}

/// Simulation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub difficulty: DifficultyPreset,

    // === World ===
    pub world_width: f32,
    pub world_height: f32,

    // === Walls / maze ===
    pub wall_thickness: f32,
    /// Minimum gap kept between any two walls (a tank diameter plus slack)
    pub min_wall_clearance: f32,
    /// Grid cell size for connectivity analysis
    pub connectivity_cell_size: f32,
    /// Width of the gap carved into a blocking wall
    pub carve_gap_size: f32,
    pub max_repair_iterations: u32,
    /// Retries per wall candidate during random placement
    pub placement_attempts: u32,
    pub vertical_walls: u32,
    pub horizontal_walls: u32,
    pub free_position_tries: u32,
    /// Walls within this distance of the player are dropped after a boss fight
    pub respawn_clearance: f32,

    // === Progression ===
    pub exp_per_kill: u32,
    pub upgrade_cost: u32,
    pub kills_per_level: u32,
    pub boss_unlock_kills: u32,

    // === Bots ===
    /// Ticks between bot spawns (before the difficulty preset)
    pub bot_spawn_interval: u32,
    pub max_bots: u32,
    pub bot_spawn_min_distance: f32,
    /// Orbit distance bots try to hold from their target
    pub preferred_distance: f32,
    pub separation_radius: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            difficulty: DifficultyPreset::Normal,

            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,

            wall_thickness: 16.0,
            min_wall_clearance: TANK_RADIUS * 2.0 + 4.0,
            connectivity_cell_size: 32.0,
            carve_gap_size: 120.0,
            max_repair_iterations: 50,
            placement_attempts: 30,
            vertical_walls: 2,
            horizontal_walls: 2,
            free_position_tries: 1000,
            respawn_clearance: 40.0,

            exp_per_kill: 5,
            upgrade_cost: 5,
            kills_per_level: 10,
            boss_unlock_kills: 10,

            bot_spawn_interval: 50,
            max_bots: 5,
            bot_spawn_min_distance: 300.0,
            preferred_distance: 220.0,
            separation_radius: 60.0,
        }
    }
}

impl SimConfig {
    /// Create a config from a difficulty preset (other fields default)
    pub fn from_preset(preset: DifficultyPreset) -> Self {
        Self {
            difficulty: preset,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("world_width", self.world_width),
            ("world_height", self.world_height),
            ("wall_thickness", self.wall_thickness),
            ("connectivity_cell_size", self.connectivity_cell_size),
            ("carve_gap_size", self.carve_gap_size),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive {
                    field,
                    value: value as f64,
                });
            }
        }

        let counts = [
            ("kills_per_level", self.kills_per_level),
            ("bot_spawn_interval", self.bot_spawn_interval),
            ("max_repair_iterations", self.max_repair_iterations),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::NotPositive {
                    field,
                    value: value as f64,
                });
            }
        }

        if self.carve_gap_size < self.min_wall_clearance {
            return Err(ConfigError::GapBelowClearance {
                gap: self.carve_gap_size,
                clearance: self.min_wall_clearance,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(self.world_width, self.world_height)
    }

    #[inline]
    pub fn world_center(&self) -> Vec2 {
        self.world_size() / 2.0
    }

    /// Points the maze must keep mutually reachable: world center first,
    /// then the four quadrant centers
    pub fn key_points(&self) -> Vec<Vec2> {
        let (w, h) = (self.world_width, self.world_height);
        vec![
            self.world_center(),
            Vec2::new(w * 0.25, h * 0.25),
            Vec2::new(w * 0.75, h * 0.25),
            Vec2::new(w * 0.25, h * 0.75),
            Vec2::new(w * 0.75, h * 0.75),
        ]
    }

    /// Ticks between bot spawns after the difficulty preset
    pub fn effective_spawn_interval(&self) -> u32 {
        let scaled = self.bot_spawn_interval as f32 * self.difficulty.spawn_interval_scale();
        (scaled.round() as u32).max(1)
    }

    /// Bots allowed alive at once after the difficulty preset
    pub fn effective_max_bots(&self) -> usize {
        (self.max_bots as i32 + self.difficulty.max_bots_delta()).max(1) as usize
    }

    /// Bot shots per second at a given difficulty level
    pub fn bot_fire_rate(&self, difficulty_level: u32) -> f32 {
        let base = 1.0 + 0.1 * difficulty_level as f32;
        (base * self.difficulty.fire_rate_scale()).min(BOT_MAX_FIRE_RATE)
    }
}
