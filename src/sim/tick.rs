//! Fixed timestep simulation tick
//!
//! Advances the arena deterministically: player, drones, bots, bullets, then
//! the boss encounter.

use glam::Vec2;
use log::info;

use super::ai::{SteeringParams, SteeringTarget, steer};
use super::entity::{AiState, Bullet, Owner};
use super::state::{GameEvent, GameState};
use super::wall::slide_move;
use crate::clamp_to_world;
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Aim direction in radians (from the mouse position)
    pub aim_angle: f32,
    /// Fire held
    pub fire: bool,
}

impl TickInput {
    /// Movement axes in {-1, 0, 1}
    pub fn axes(&self) -> Vec2 {
        let axis = |neg: bool, pos: bool| pos as i8 as f32 - neg as i8 as f32;
        Vec2::new(axis(self.left, self.right), axis(self.up, self.down))
    }
}

/// Advance the game by `elapsed_frames` fixed steps (capped at `MAX_SUBSTEPS`)
///
/// Events raised during the call are left in `state.events`.
pub fn tick(state: &mut GameState, input: &TickInput, elapsed_frames: u32) {
    state.events.clear();
    for _ in 0..elapsed_frames.min(MAX_SUBSTEPS) {
        if state.game_over || state.is_paused() {
            break;
        }
        step(state, input);
    }
}

fn step(state: &mut GameState, input: &TickInput) {
    let world = state.config.world_size();

    // Player movement
    let player = &mut state.player;
    player.pos = clamp_to_world(state.walls.resolve(player.pos, player.radius), world, 0.0);
    slide_move(
        &mut player.pos,
        input.axes() * player.speed,
        player.radius,
        Some(&state.walls),
        world,
    );

    player.tick_cooldown();
    player.regenerate();
    player.aim_angle = input.aim_angle;

    // Drones
    let released = state.player.update_drone_spawners(world);
    state.drones.extend(released);
    update_drones(state, world);

    // Player fire
    if input.fire {
        let aim = state.player.aim_angle;
        let shots = state.player.fire(aim, Owner::Player, &mut state.rng);
        state.bullets.extend(shots);
    }

    // Bot spawning
    state.spawn_timer += 1;
    if state.spawn_timer >= state.config.effective_spawn_interval() {
        state.spawn_timer = 0;
        state.spawn_bot();
    }

    update_bots(state, world);
    update_bullets(state);

    // Boss
    if state.boss.is_active() {
        let defeated = state.boss.update(
            &mut state.player,
            &mut state.bullets,
            &mut state.walls,
            &state.config,
            &mut state.rng,
        );
        if defeated {
            state.events.push(GameEvent::BossDefeated);
        }
    }

    if state.player.is_dead() {
        state.game_over = true;
        state.events.push(GameEvent::PlayerDied);
        info!(
            "game over at tick {}: level {}, {} kills",
            state.time_ticks, state.player.level, state.player.kills
        );
    }

    state.time_ticks += 1;
}

/// Home every drone on the nearest bot (and the boss while fighting)
fn update_drones(state: &mut GameState, world: Vec2) {
    if state.drones.is_empty() {
        return;
    }

    let mut targets: Vec<(Vec2, f32)> = state.bots.iter().map(|b| (b.pos, b.radius)).collect();
    let boss_slot = state.bots.len();
    if state.boss.is_fighting() {
        if let Some(boss) = &state.boss.boss {
            targets.push((boss.tank.pos, boss.size));
        }
    }

    for drone in &mut state.drones {
        let Some(idx) = drone.step(&targets, world) else {
            continue;
        };
        if idx < boss_slot {
            state.bots[idx].take_damage(drone.damage);
        } else if let Some(boss) = state.boss.boss.as_mut() {
            boss.tank.take_damage(drone.damage);
        }
    }
    state.drones.retain(|d| d.is_alive());

    remove_dead_bots(state);
}

/// Steer, cool down and fire every bot
fn update_bots(state: &mut GameState, world: Vec2) {
    let params = SteeringParams::from_config(&state.config);
    let target = SteeringTarget {
        pos: state.player.pos,
        speed: state.player.speed,
    };
    let positions: Vec<Vec2> = state.bots.iter().map(|b| b.pos).collect();

    for (i, bot) in state.bots.iter_mut().enumerate() {
        let neighbors: Vec<Vec2> = positions
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, &p)| p)
            .collect();

        let mut ai = match bot.ai.take() {
            Some(ai) => ai,
            None => AiState::new(&mut state.rng),
        };
        let outcome = steer(
            &mut bot.pos,
            bot.radius,
            &mut ai,
            &neighbors,
            target,
            Some(&state.walls),
            world,
            &params,
            &mut state.rng,
        );
        bot.ai = Some(ai);
        bot.aim_angle = outcome.aim;

        bot.tick_cooldown();
        let shots = bot.fire(outcome.aim, Owner::Bot, &mut state.rng);
        state.bullets.extend(shots);
    }
}

/// Move bullets and resolve hits
///
/// Player and drone bullets strike the first bot they overlap; bot bullets
/// strike only the player. A bullet that hits is consumed, one that leaves
/// the world is dropped.
pub(crate) fn update_bullets(state: &mut GameState) {
    let world = state.config.world_size();
    let mut bullets = std::mem::take(&mut state.bullets);

    bullets.retain_mut(|b: &mut Bullet| {
        b.advance();
        if b.owner.hits_bots() {
            if let Some(bot) = state
                .bots
                .iter_mut()
                .find(|bot| !bot.is_dead() && b.pos.distance(bot.pos) < bot.radius)
            {
                bot.take_damage(b.damage);
                return false;
            }
        }
        if b.owner.hits_player() && b.pos.distance(state.player.pos) < state.player.radius {
            state.player.take_damage(b.damage);
            return false;
        }
        b.in_bounds(world)
    });

    state.bullets = bullets;
    remove_dead_bots(state);
}

/// Drop dead bots (in spawn order) and credit the player for each
fn remove_dead_bots(state: &mut GameState) {
    if !state.bots.iter().any(|b| b.is_dead()) {
        return;
    }
    let (dead, alive): (Vec<_>, Vec<_>) = std::mem::take(&mut state.bots)
        .into_iter()
        .partition(|b| b.is_dead());
    state.bots = alive;
    for bot in dead {
        state.award_kill(bot.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::boss::BossPhase;
    use crate::sim::entity::{AngleMode, BulletProfile, Drone, DroneSpawnerMount, Tank};
    use crate::sim::upgrades::SpecMenu;
    use crate::sim::wall::{Wall, WallSet};
    use proptest::prelude::*;

    fn open_arena(seed: u64) -> GameState {
        let mut state = GameState::new(seed);
        state.walls = WallSet::default();
        state
    }

    fn add_bot(state: &mut GameState, pos: Vec2) -> usize {
        let id = state.next_entity_id();
        let bot = Tank::bot(id, pos, 1, &state.config, &mut state.rng);
        state.bots.push(bot);
        state.bots.len() - 1
    }

    fn player_bullet(pos: Vec2, angle: f32, state: &GameState) -> Bullet {
        let profile = state.player.forward_profile();
        Bullet::from_profile(pos, angle, &profile, Owner::Player, Some(state.player.id))
    }

    #[test]
    fn test_input_axes() {
        let input = TickInput {
            up: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(input.axes(), Vec2::new(1.0, -1.0));
        let both = TickInput {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(both.axes(), Vec2::ZERO);
    }

    #[test]
    fn test_bullet_hit_applies_exact_damage() {
        let mut state = open_arena(1);
        let i = add_bot(&mut state, Vec2::new(500.0, 500.0));
        let bullet = player_bullet(Vec2::new(495.0, 500.0), 0.0, &state);
        let damage = bullet.damage;
        state.bullets.push(bullet);

        update_bullets(&mut state);
        assert_eq!(state.bots[i].health, TANK_MAX_HEALTH - damage);
        assert!(state.bullets.is_empty());
        assert_eq!(state.player.kills, 0);
    }

    #[test]
    fn test_bot_bullets_ignore_other_bots() {
        let mut state = open_arena(2);
        state.player.pos = Vec2::new(1200.0, 900.0);
        add_bot(&mut state, Vec2::new(500.0, 500.0));
        let profile = state.bots[0].forward_profile();
        state
            .bullets
            .push(Bullet::from_profile(Vec2::new(495.0, 500.0), 0.0, &profile, Owner::Bot, Some(99)));

        update_bullets(&mut state);
        assert_eq!(state.bots[0].health, TANK_MAX_HEALTH);
        assert_eq!(state.bullets.len(), 1);
    }

    #[test]
    fn test_bot_bullet_hits_player() {
        let mut state = open_arena(3);
        let target = state.player.pos;
        let profile = BulletProfile::standard(BOT_COLOR);
        state.bullets.push(Bullet::from_profile(
            target - Vec2::new(5.0, 0.0),
            0.0,
            &profile,
            Owner::Bot,
            Some(1),
        ));
        update_bullets(&mut state);
        assert_eq!(state.player.health, TANK_MAX_HEALTH - BULLET_DAMAGE);
        assert!(state.bullets.is_empty());
    }

    #[test]
    fn test_kill_awards_exp_and_removes_bot() {
        let mut state = open_arena(4);
        let i = add_bot(&mut state, Vec2::new(500.0, 500.0));
        state.bots[i].health = 5.0;
        let bullet = player_bullet(Vec2::new(495.0, 500.0), 0.0, &state);
        state.bullets.push(bullet);

        update_bullets(&mut state);
        assert!(state.bots.is_empty());
        assert_eq!(state.player.exp, state.config.exp_per_kill);
        assert_eq!(state.player.kills, 1);
    }

    #[test]
    fn test_bullets_leave_world() {
        let mut state = open_arena(5);
        let bullet = player_bullet(Vec2::new(1598.0, 600.0), 0.0, &state);
        state.bullets.push(bullet);
        update_bullets(&mut state);
        assert!(state.bullets.is_empty());
    }

    #[test]
    fn test_substeps_capped() {
        let mut state = open_arena(6);
        tick(&mut state, &TickInput::default(), 100);
        assert_eq!(state.time_ticks, MAX_SUBSTEPS as u64);
        tick(&mut state, &TickInput::default(), 0);
        assert_eq!(state.time_ticks, MAX_SUBSTEPS as u64);
    }

    #[test]
    fn test_menu_pauses_simulation() {
        let mut state = open_arena(7);
        state.spec_menu = SpecMenu::Root;
        let before = state.player.pos;
        let input = TickInput {
            right: true,
            ..Default::default()
        };
        tick(&mut state, &input, 1);
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.player.pos, before);
    }

    #[test]
    fn test_player_slides_along_wall() {
        let mut state = GameState::new(8);
        state.walls = WallSet::new(vec![Wall::new(600.0, 0.0, 16.0, 1200.0)]);
        state.player.pos = Vec2::new(578.0, 600.0);
        let input = TickInput {
            right: true,
            down: true,
            ..Default::default()
        };
        tick(&mut state, &input, 1);
        assert_eq!(state.player.pos, Vec2::new(578.0, 603.0));
    }

    #[test]
    fn test_player_fire_respects_cooldown() {
        let mut state = open_arena(9);
        let input = TickInput {
            fire: true,
            aim_angle: 1.0,
            ..Default::default()
        };
        tick(&mut state, &input, 1);
        assert_eq!(state.bullets.iter().filter(|b| b.owner == Owner::Player).count(), 1);
        assert_eq!(state.player.fire_cooldown, 15);
        tick(&mut state, &input, 1);
        assert_eq!(state.bullets.iter().filter(|b| b.owner == Owner::Player).count(), 1);
    }

    #[test]
    fn test_bots_spawn_on_interval() {
        let mut state = open_arena(10);
        let interval = state.config.effective_spawn_interval();
        for _ in 0..interval - 1 {
            tick(&mut state, &TickInput::default(), 1);
        }
        assert!(state.bots.is_empty());
        tick(&mut state, &TickInput::default(), 1);
        assert_eq!(state.bots.len(), 1);
    }

    #[test]
    fn test_no_spawning_during_boss_fight() {
        let mut state = open_arena(11);
        state.boss.check_unlock(state.config.boss_unlock_kills);
        assert!(state.start_boss_fight());
        for _ in 0..30 {
            tick(&mut state, &TickInput::default(), MAX_SUBSTEPS);
        }
        assert!(state.bots.is_empty());
        assert!(matches!(state.boss.phase, BossPhase::Fighting));
    }

    #[test]
    fn test_drone_kill_credits_player() {
        let mut state = open_arena(12);
        state.player.drone_spawners = vec![DroneSpawnerMount {
            mode: AngleMode::Aim,
            offset: 0.0,
        }];
        let near = state.player.pos + Vec2::new(80.0, 0.0);
        let i = add_bot(&mut state, near);
        state.bots[i].health = 1.0;

        for _ in 0..60 {
            tick(&mut state, &TickInput::default(), 1);
        }
        assert_eq!(state.player.kills, 1);
    }

    #[test]
    fn test_drone_released_at_edge_stays_in_world() {
        let mut state = open_arena(15);
        state.player.pos = Vec2::new(0.0, 600.0);
        state.player.drone_spawners = vec![DroneSpawnerMount {
            mode: AngleMode::Aim,
            offset: 0.0,
        }];
        let input = TickInput {
            aim_angle: std::f32::consts::PI,
            ..Default::default()
        };
        tick(&mut state, &input, 1);
        assert_eq!(state.drones.len(), 1);
        assert!(state.drones[0].pos.x >= 0.0);
    }

    #[test]
    fn test_drones_expire() {
        let mut state = open_arena(13);
        let mut drone = Drone::new(Vec2::new(100.0, 100.0), 0);
        drone.life = 1;
        state.drones.push(drone);
        tick(&mut state, &TickInput::default(), 1);
        assert!(state.drones.is_empty());
    }

    #[test]
    fn test_death_ends_game() {
        let mut state = open_arena(14);
        state.player.health = -10.0;
        tick(&mut state, &TickInput::default(), 1);
        assert!(state.game_over);
        assert!(state.events.contains(&GameEvent::PlayerDied));

        let ticks = state.time_ticks;
        tick(&mut state, &TickInput::default(), 4);
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_determinism() {
        let mut a = GameState::new(99999);
        let mut b = GameState::new(99999);
        let inputs = [
            TickInput {
                right: true,
                fire: true,
                aim_angle: 0.5,
                ..Default::default()
            },
            TickInput {
                up: true,
                fire: true,
                aim_angle: -2.0,
                ..Default::default()
            },
            TickInput::default(),
        ];

        for n in 0..300 {
            let input = inputs[n % inputs.len()];
            tick(&mut a, &input, 1);
            tick(&mut b, &input, 1);
        }

        assert_eq!(a.time_ticks, b.time_ticks);
        assert_eq!(a.player.pos, b.player.pos);
        assert_eq!(a.player.health, b.player.health);
        assert_eq!(a.bots.len(), b.bots.len());
        for (x, y) in a.bots.iter().zip(&b.bots) {
            assert_eq!(x.pos, y.pos);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_entities_stay_in_world(
            seed in any::<u64>(),
            moves in prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()), 1..40),
        ) {
            let mut state = GameState::new(seed);
            state.player.drone_spawners = vec![DroneSpawnerMount {
                mode: AngleMode::Aim,
                offset: std::f32::consts::PI,
            }];
            let world = state.config.world_size();
            for (up, down, left, right) in moves {
                let input = TickInput { up, down, left, right, fire: true, aim_angle: 0.3 };
                tick(&mut state, &input, MAX_SUBSTEPS);
                let inside = |p: Vec2| p.x >= 0.0 && p.x <= world.x && p.y >= 0.0 && p.y <= world.y;
                prop_assert!(inside(state.player.pos));
                for bot in &state.bots {
                    prop_assert!(inside(bot.pos));
                }
                for bullet in &state.bullets {
                    prop_assert!(inside(bullet.pos));
                }
                for drone in &state.drones {
                    prop_assert!(inside(drone.pos));
                }
            }
        }
    }
}
