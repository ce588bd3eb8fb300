//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (spawn order)
//! - No rendering or platform dependencies

pub mod ai;
pub mod boss;
pub mod entity;
pub mod maze;
pub mod state;
pub mod tick;
pub mod upgrades;
pub mod wall;

pub use ai::{SteerOutcome, SteeringParams, SteeringTarget, steer};
pub use boss::{Boss, BossEncounter, BossPhase};
pub use entity::{
    AiState, AngleMode, Bullet, BulletProfile, Drone, DroneSpawnerMount, GunMount, Mount, Owner, Tank,
};
pub use maze::{
    ensure_connectivity, find_free_position, generate_arena, generate_default_layout,
    generate_random_layout, respawn_avoiding_entity,
};
pub use state::{GameEvent, GameState, PLAYER_ID, Snapshot};
pub use tick::{TickInput, tick};
pub use upgrades::{SpecMenu, SpecRoot, Specialization, UpgradeKind};
pub use wall::{Wall, WallSet, line_of_sight, slide_move};
