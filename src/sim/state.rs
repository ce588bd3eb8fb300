//! Simulation context, commands and snapshots
//!
//! `GameState` owns every mutable piece of a run: tanks, projectiles, walls,
//! the boss encounter and the single RNG. Front-ends drive it through
//! [`super::tick`] and the command methods here, and read it back through
//! [`GameState::snapshot`].

use glam::Vec2;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use super::boss::{Boss, BossEncounter, BossPhase};
use super::entity::{Bullet, Drone, Tank};
use super::maze::{find_free_position, generate_arena, is_position_free};
use super::upgrades::{SpecMenu, SpecRoot, UpgradeKind, root_defaults, specialization_options};
use super::wall::WallSet;
use crate::SimConfig;
use crate::consts::*;

/// Player tank id
pub const PLAYER_ID: u32 = 0;

/// Something the front-end may want to react to (sound, HUD flash)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameEvent {
    BotKilled { id: u32 },
    LevelUp { level: u32 },
    SpecializationOffered,
    BossUnlocked,
    BossDefeated,
    PlayerDied,
}

/// Complete simulation state (deterministic for a given seed and input)
#[derive(Debug, Clone)]
pub struct GameState {
    pub config: SimConfig,
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub player: Tank,
    pub bots: Vec<Tank>,
    /// Player and bot bullets (boss bullets live in the encounter)
    pub bullets: Vec<Bullet>,
    pub drones: Vec<Drone>,
    pub walls: WallSet,
    pub boss: BossEncounter,
    /// Bot scaling level, raised with the player's level
    pub difficulty: u32,
    pub spec_menu: SpecMenu,
    /// Player kill count when the last specialization was offered
    pub kills_at_last_spec: u32,
    /// Ticks since the last bot spawn
    pub spawn_timer: u32,
    pub game_over: bool,
    /// Events raised during the last `tick` call
    pub events: Vec<GameEvent>,
    /// Next entity ID
    next_id: u32,
}

/// Borrowed, serializable view for drawing
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub time_ticks: u64,
    pub player: &'a Tank,
    pub bots: &'a [Tank],
    pub bullets: &'a [Bullet],
    pub boss_bullets: &'a [Bullet],
    pub drones: &'a [Drone],
    pub walls: &'a WallSet,
    pub boss: Option<&'a Boss>,
    pub boss_phase: BossPhase,
    pub spec_menu: SpecMenu,
    pub difficulty: u32,
    pub game_over: bool,
}

impl GameState {
    /// Create a new game with default tuning
    pub fn new(seed: u64) -> Self {
        Self::with_config(SimConfig::default(), seed)
    }

    pub fn with_config(config: SimConfig, seed: u64) -> Self {
        let mut state = Self {
            boss: BossEncounter::new(config.boss_unlock_kills),
            config,
            seed,
            rng: Pcg32::seed_from_u64(seed),
            time_ticks: 0,
            player: Tank::player(PLAYER_ID, Vec2::ZERO),
            bots: Vec::new(),
            bullets: Vec::new(),
            drones: Vec::new(),
            walls: WallSet::default(),
            difficulty: 1,
            spec_menu: SpecMenu::Closed,
            kills_at_last_spec: 0,
            spawn_timer: 0,
            game_over: false,
            events: Vec::new(),
            next_id: PLAYER_ID + 1,
        };
        state.reset_game();
        state
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Start a fresh run: new arena, fresh player, everything else cleared
    pub fn reset_game(&mut self) {
        let arena_seed = self.rng.random::<u64>();
        self.walls = WallSet::new(generate_arena(&self.config, arena_seed));

        let center = self.config.world_center();
        let spawn = if is_position_free(center, TANK_RADIUS, &self.walls.walls, self.config.world_size()) {
            center
        } else {
            find_free_position(
                TANK_RADIUS,
                &self.walls.walls,
                self.config.free_position_tries,
                &self.config,
                &mut self.rng,
            )
        };

        self.player = Tank::player(PLAYER_ID, spawn);
        self.bots.clear();
        self.bullets.clear();
        self.drones.clear();
        self.boss = BossEncounter::new(self.config.boss_unlock_kills);
        self.difficulty = 1;
        self.spec_menu = SpecMenu::Closed;
        self.kills_at_last_spec = 0;
        self.spawn_timer = 0;
        self.game_over = false;
        self.time_ticks = 0;
        self.events.clear();
        self.next_id = PLAYER_ID + 1;

        info!(
            "game reset: seed={}, arena seed={arena_seed}, {} walls, player at ({:.0}, {:.0})",
            self.seed,
            self.walls.len(),
            spawn.x,
            spawn.y
        );
    }

    /// Specialization menu is open (simulation paused)
    pub fn is_paused(&self) -> bool {
        self.spec_menu.is_open()
    }

    /// Spawn one bot away from the player
    ///
    /// Returns the new bot's id, or None while the bot cap is reached or the
    /// boss fight is running.
    pub fn spawn_bot(&mut self) -> Option<u32> {
        if self.boss.is_active() || self.bots.len() >= self.config.effective_max_bots() {
            return None;
        }

        let min_dist_sq = self.config.bot_spawn_min_distance.powi(2);
        let mut pos = self.player.pos;
        for _ in 0..self.config.placement_attempts {
            pos = find_free_position(
                TANK_RADIUS,
                self.walls.active(),
                self.config.free_position_tries,
                &self.config,
                &mut self.rng,
            );
            if pos.distance_squared(self.player.pos) >= min_dist_sq {
                break;
            }
        }

        let id = self.next_entity_id();
        let bot = Tank::bot(id, pos, self.difficulty, &self.config, &mut self.rng);
        debug!(
            "spawned bot {id} at ({:.0}, {:.0}), difficulty {}",
            pos.x, pos.y, self.difficulty
        );
        self.bots.push(bot);
        Some(id)
    }

    /// Credit the player with a bot kill and run the progression checks
    pub fn award_kill(&mut self, bot_id: u32) {
        let per_level = self.config.kills_per_level.max(1);
        let player = &mut self.player;
        player.exp += self.config.exp_per_kill;
        player.kills += 1;
        self.events.push(GameEvent::BotKilled { id: bot_id });
        debug!("bot {bot_id} killed, player kills={}", player.kills);

        if player.kills % per_level == 0 {
            player.level += 1;
            self.difficulty += 1;
            self.events.push(GameEvent::LevelUp {
                level: player.level,
            });
            info!("level up: {} (difficulty {})", player.level, self.difficulty);
        }

        let due = player.kills - self.kills_at_last_spec >= per_level;
        if due && !self.spec_menu.is_open() && !player.specialization.complete {
            self.spec_menu = match player.specialization.root {
                Some(root) => SpecMenu::Options(root),
                None => SpecMenu::Root,
            };
            self.kills_at_last_spec = player.kills;
            self.events.push(GameEvent::SpecializationOffered);
        }

        if self.boss.check_unlock(self.player.kills) {
            self.events.push(GameEvent::BossUnlocked);
        }
    }

    /// Answer the open specialization menu
    ///
    /// At the root stage `root` is applied with its default mounts (the
    /// option index is ignored). At the option stage `root` must match the
    /// offered branch and `option` must name one of its two options.
    /// Anything else is ignored and returns false.
    pub fn select_specialization(&mut self, root: SpecRoot, option: Option<usize>) -> bool {
        if self.game_over {
            return false;
        }
        let color = self.player.color;
        match self.spec_menu {
            SpecMenu::Root => {
                self.player.apply_mounts(&root_defaults(root, color), false);
                self.player.specialization.root = Some(root);
                info!("specialization root chosen: {}", root.as_str());
            }
            SpecMenu::Options(offered) if offered == root => {
                let Some(index) = option else {
                    return false;
                };
                let options = specialization_options(root, color);
                let Some(choice) = options.get(index) else {
                    return false;
                };
                self.player.apply_mounts(&choice.mounts, choice.shotgun);
                let spec = &mut self.player.specialization;
                spec.option = Some(index);
                spec.complete = true;
                info!("specialization complete: {} / {}", root.as_str(), choice.label);
            }
            _ => return false,
        }
        self.spec_menu = SpecMenu::Closed;
        true
    }

    /// Buy a stat upgrade with experience
    ///
    /// Ignored (false) without enough experience, while the menu is open or
    /// after game over.
    pub fn apply_upgrade(&mut self, kind: UpgradeKind) -> bool {
        if self.game_over || self.is_paused() || self.player.exp < self.config.upgrade_cost {
            return false;
        }
        self.player.exp -= self.config.upgrade_cost;
        kind.apply(&mut self.player);
        debug!("upgrade applied: {}", kind.as_str());
        true
    }

    /// Start the boss fight if it is unlocked and not already running
    pub fn start_boss_fight(&mut self) -> bool {
        if self.game_over || !self.boss.can_start() {
            return false;
        }
        let id = self.next_entity_id();
        self.boss.start(
            id,
            &mut self.player,
            &mut self.bots,
            &mut self.bullets,
            &mut self.walls,
            &self.config,
            &mut self.rng,
        )
    }

    /// Read-only view of everything a renderer draws
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            time_ticks: self.time_ticks,
            player: &self.player,
            bots: &self.bots,
            bullets: &self.bullets,
            boss_bullets: &self.boss.bullets,
            drones: &self.drones,
            walls: &self.walls,
            boss: self.boss.boss.as_ref(),
            boss_phase: self.boss.phase,
            spec_menu: self.spec_menu,
            difficulty: self.difficulty,
            game_over: self.game_over,
        }
    }
}
