//! Boss encounter
//!
//! Phase flow: `Locked -> Unlocked -> FadeIn -> Fighting -> Ended`, with
//! `Ended -> FadeIn` for replays. While the encounter is active the regular
//! bots are gone and the walls are suspended; the boss keeps its own bullet
//! pool.

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ai::{SteeringParams, SteeringTarget, steer};
use super::entity::{AiState, Bullet, GunMount, Owner, Tank, frames_per_shot};
use super::maze::respawn_avoiding_entity;
use super::wall::WallSet;
use crate::consts::*;
use crate::{SimConfig, angle_to, clamp_to_world, heading};

/// Boss bullets are dropped this far outside the world
const BOSS_BULLET_MARGIN: f32 = 100.0;

/// Encounter phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BossPhase {
    #[default]
    Locked,
    /// Threshold reached, waiting for the start command
    Unlocked,
    /// Boss is materialising; it neither moves, fires nor takes hits
    FadeIn { remaining: u32 },
    Fighting,
    /// Boss defeated; can be started again
    Ended,
}

/// The boss: a large tank with four rim guns and a periodic frenzy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boss {
    pub tank: Tank,
    /// Visual and collision radius
    pub size: f32,
    /// Inside the tripled fire-rate window
    pub special_active: bool,
    /// Ticks left in the current special window
    pub special_left: u32,
    /// Ticks until the next special window opens
    pub special_timer: u32,
    /// Fade-in opacity (0..=255)
    pub alpha: u8,
}

impl Boss {
    /// Create a boss scaled from the player's current stats
    pub fn spawn(id: u32, pos: Vec2, player: &Tank, rng: &mut impl Rng) -> Self {
        let mut tank = Tank::new(id, pos, BOSS_COLOR);
        tank.radius = BOSS_SIZE;
        tank.max_health = player.max_health * BOSS_HEALTH_MULTIPLIER;
        tank.health = tank.max_health;
        tank.speed = player.speed * BOSS_SPEED_MULTIPLIER;
        tank.fire_rate = player.fire_rate.max(0.01);
        tank.regen_rate = 0.0;

        let mut profile = player.forward_profile();
        profile.color = BOSS_BULLET_COLOR;
        tank.gun_mounts = (0..BOSS_GUN_COUNT)
            .map(|i| GunMount::body(i as f32 * TAU / BOSS_GUN_COUNT as f32, profile))
            .collect();
        tank.ai = Some(AiState::new(rng));

        Self {
            tank,
            size: BOSS_SIZE,
            special_active: false,
            special_left: 0,
            special_timer: rng.random_range(FPS..=BOSS_SPECIAL_COOLDOWN),
            alpha: 0,
        }
    }

    /// World positions of the rim guns
    pub fn rim_positions(&self) -> Vec<Vec2> {
        self.tank
            .gun_mounts
            .iter()
            .map(|m| self.tank.pos + heading(m.offset) * (self.size + BOSS_GUN_OFFSET))
            .collect()
    }

    /// One bullet from every rim gun, each aimed at `target` from its own spot
    pub fn fire_at(&self, target: Vec2) -> Vec<Bullet> {
        self.tank
            .gun_mounts
            .iter()
            .zip(self.rim_positions())
            .map(|(mount, origin)| {
                Bullet::from_profile(
                    origin,
                    angle_to(origin, target),
                    &mount.profile,
                    Owner::Boss,
                    Some(self.tank.id),
                )
            })
            .collect()
    }

    pub fn effective_fire_rate(&self) -> f32 {
        if self.special_active {
            self.tank.fire_rate * BOSS_SPECIAL_FIRE_MULTIPLIER
        } else {
            self.tank.fire_rate
        }
    }

    /// Advance the special-window countdowns by one tick
    fn tick_special(&mut self) {
        if self.special_timer == 0 {
            self.special_active = true;
            self.special_left = BOSS_SPECIAL_DURATION;
            self.special_timer = BOSS_SPECIAL_COOLDOWN;
        } else {
            self.special_timer -= 1;
        }

        if self.special_active {
            if self.special_left > 0 {
                self.special_left -= 1;
            } else {
                self.special_active = false;
            }
        }
    }

    /// Orbit-approach used when steering produced no movement
    fn move_towards(&mut self, target: Vec2, params: &SteeringParams) {
        let angle = angle_to(self.tank.pos, target);
        let desired = target + heading(angle + FRAC_PI_2) * params.preferred_distance;
        let offset = desired - self.tank.pos;
        let dist = offset.length() + 1e-6;
        self.tank.pos += offset / dist * self.tank.speed;
    }
}

/// Boss encounter controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossEncounter {
    pub phase: BossPhase,
    pub boss: Option<Boss>,
    /// Boss bullets (kept apart from the main bullet list)
    pub bullets: Vec<Bullet>,
    /// Player kills needed to unlock the fight
    pub unlock_kills: u32,
}

impl BossEncounter {
    pub fn new(unlock_kills: u32) -> Self {
        Self {
            phase: BossPhase::Locked,
            boss: None,
            bullets: Vec::new(),
            unlock_kills,
        }
    }

    /// Unlock once `kills` reaches the threshold; true on the transition
    pub fn check_unlock(&mut self, kills: u32) -> bool {
        if self.phase == BossPhase::Locked && kills >= self.unlock_kills {
            self.phase = BossPhase::Unlocked;
            info!("boss unlocked at {kills} kills");
            return true;
        }
        false
    }

    pub fn can_start(&self) -> bool {
        matches!(self.phase, BossPhase::Unlocked | BossPhase::Ended)
    }

    /// Fade-in or fighting
    pub fn is_active(&self) -> bool {
        matches!(self.phase, BossPhase::FadeIn { .. } | BossPhase::Fighting)
    }

    pub fn is_fighting(&self) -> bool {
        self.phase == BossPhase::Fighting
    }

    /// Begin the fight
    ///
    /// Clears the bots and every non-player bullet, suspends the walls, heals
    /// the player and spawns the boss at the world centre. Returns false when
    /// the encounter is locked or already running.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        boss_id: u32,
        player: &mut Tank,
        bots: &mut Vec<Tank>,
        bullets: &mut Vec<Bullet>,
        walls: &mut WallSet,
        config: &SimConfig,
        rng: &mut impl Rng,
    ) -> bool {
        if !self.can_start() {
            return false;
        }

        bots.clear();
        bullets.retain(|b| b.owner == Owner::Player);
        walls.set_suspended(true);
        player.health = player.max_health;

        let pos = clamp_to_world(config.world_center(), config.world_size(), BOSS_SIZE);
        let boss = Boss::spawn(boss_id, pos, player, rng);
        info!(
            "boss fight started: health {:.0}, fire rate {:.2}",
            boss.tank.max_health, boss.tank.fire_rate
        );

        self.boss = Some(boss);
        self.bullets.clear();
        self.phase = BossPhase::FadeIn {
            remaining: BOSS_FADE_TICKS,
        };
        true
    }

    /// Advance the encounter by one tick
    ///
    /// `bullets` is the main bullet list; player shots that land on the boss
    /// are removed from it. Returns true on the tick the boss is defeated.
    pub fn update(
        &mut self,
        player: &mut Tank,
        bullets: &mut Vec<Bullet>,
        walls: &mut WallSet,
        config: &SimConfig,
        rng: &mut impl Rng,
    ) -> bool {
        match self.phase {
            BossPhase::FadeIn { remaining } => {
                let remaining = remaining.saturating_sub(1);
                let progress = (BOSS_FADE_TICKS - remaining) as f32 / BOSS_FADE_TICKS as f32;
                if let Some(boss) = self.boss.as_mut() {
                    boss.alpha = (progress * 255.0).clamp(0.0, 255.0) as u8;
                }
                self.phase = if remaining == 0 {
                    if let Some(boss) = self.boss.as_mut() {
                        boss.alpha = 255;
                    }
                    info!("boss fade-in complete");
                    BossPhase::Fighting
                } else {
                    BossPhase::FadeIn { remaining }
                };
                false
            }
            BossPhase::Fighting => self.fight(player, bullets, walls, config, rng),
            _ => false,
        }
    }

    fn fight(
        &mut self,
        player: &mut Tank,
        bullets: &mut Vec<Bullet>,
        walls: &mut WallSet,
        config: &SimConfig,
        rng: &mut impl Rng,
    ) -> bool {
        let defeated = match self.boss.as_mut() {
            Some(boss) => fight_step(boss, &mut self.bullets, player, bullets, walls, config, rng),
            None => {
                self.phase = BossPhase::Ended;
                return false;
            }
        };
        if defeated {
            self.end(player, walls, config, rng);
        }
        defeated
    }

    /// Tear down a won fight: reward, clear boss bullets, restore the walls
    /// and lay out a fresh arena around the player
    pub fn end(
        &mut self,
        player: &mut Tank,
        walls: &mut WallSet,
        config: &SimConfig,
        rng: &mut impl Rng,
    ) {
        player.exp += BOSS_KILL_EXP;
        self.bullets.clear();
        self.boss = None;
        self.phase = BossPhase::Ended;

        walls.set_suspended(false);
        let seed = rng.random::<u64>();
        respawn_avoiding_entity(walls, config, seed, player.pos, config.respawn_clearance);
        info!("boss defeated: +{BOSS_KILL_EXP} exp, arena respawned with {} walls", walls.len());
    }
}

/// One fighting tick: move, fire, resolve both bullet pools
///
/// Returns true once the boss is dead.
fn fight_step(
    boss: &mut Boss,
    boss_bullets: &mut Vec<Bullet>,
    player: &mut Tank,
    bullets: &mut Vec<Bullet>,
    walls: &WallSet,
    config: &SimConfig,
    rng: &mut impl Rng,
) -> bool {
    if boss.tank.is_dead() {
        return true;
    }

    let world = config.world_size();
    let params = SteeringParams::from_config(config);
    let target = SteeringTarget {
        pos: player.pos,
        speed: player.speed,
    };

    // Movement
    let mut ai = boss.tank.ai.take().unwrap_or_else(|| AiState::new(rng));
    let outcome = steer(
        &mut boss.tank.pos,
        boss.size,
        &mut ai,
        &[],
        target,
        Some(walls),
        world,
        &params,
        rng,
    );
    boss.tank.ai = Some(ai);
    if outcome.moved == Vec2::ZERO {
        boss.move_towards(player.pos, &params);
    }
    boss.tank.pos = clamp_to_world(boss.tank.pos, world, boss.size);
    boss.tank.aim_angle = angle_to(boss.tank.pos, player.pos);

    // Firing
    boss.tick_special();
    if boss.tank.fire_cooldown == 0 {
        boss_bullets.extend(boss.fire_at(player.pos));
        boss.tank.fire_cooldown = frames_per_shot(boss.effective_fire_rate());
    } else {
        boss.tank.fire_cooldown -= 1;
    }

    // Boss bullets only hit the player
    boss_bullets.retain_mut(|b| {
        b.advance();
        if b.pos.distance(player.pos) < player.radius {
            player.take_damage(b.damage);
            return false;
        }
        b.pos.x >= -BOSS_BULLET_MARGIN
            && b.pos.x <= world.x + BOSS_BULLET_MARGIN
            && b.pos.y >= -BOSS_BULLET_MARGIN
            && b.pos.y <= world.y + BOSS_BULLET_MARGIN
    });

    // Player shots use a generous hit radius
    let hit_radius = boss.size * BOSS_HIT_RADIUS_SCALE;
    bullets.retain(|b| {
        if boss.tank.is_dead() || !b.owner.hits_bots() {
            return true;
        }
        if b.pos.distance(boss.tank.pos) < hit_radius {
            boss.tank.take_damage(b.damage);
            return false;
        }
        true
    });

    boss.tank.is_dead()
}
