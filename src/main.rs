//! Tank Arena headless runner
//!
//! Plays a seeded game with a simple autopilot and reports how it went.
//! Useful for soak-testing the simulation and for reproducing a seed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use glam::Vec2;
use log::{debug, info, warn};

use tank_arena::sim::{
    Bullet, GameEvent, GameState, SpecMenu, SpecRoot, TickInput, UpgradeKind, tick,
};
use tank_arena::{DifficultyPreset, SimConfig, angle_to, heading};

/// Run the tank arena simulation without a window
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Run seed
    #[arg(short, long, default_value_t = 12345)]
    seed: u64,

    /// Frames to simulate (stops early on game over)
    #[arg(short, long, default_value_t = 3600)]
    frames: u32,

    /// JSON tuning file; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Difficulty preset (easy, normal, hard); overrides the config file
    #[arg(short, long)]
    difficulty: Option<String>,

    /// Print the final snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(path: Option<&Path>) -> SimConfig {
    let Some(path) = path else {
        return SimConfig::default();
    };
    match SimConfig::from_path(path) {
        Ok(config) => {
            info!("loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("failed to load config {}: {e}, using defaults", path.display());
            SimConfig::default()
        }
    }
}

/// Upgrade order: survivability first
const UPGRADE_PRIORITY: [UpgradeKind; 5] = [
    UpgradeKind::Health,
    UpgradeKind::FireRate,
    UpgradeKind::Damage,
    UpgradeKind::Speed,
    UpgradeKind::BulletSpeed,
];

/// Bots closer than this are backed away from
const KITE_MIN: f32 = 320.0;
/// Bots farther than this are closed in on
const KITE_MAX: f32 = 460.0;
/// Bullets are dodged once they get this close along their path
const DODGE_LOOKAHEAD: f32 = 160.0;

/// Scripted player for headless runs
///
/// Leads its shots, kites at range and sidesteps incoming bullets. It plays
/// well enough to reach specializations and upgrades on most seeds but makes
/// no promise of surviving a whole run.
struct Autopilot {
    upgrades_bought: usize,
    root: SpecRoot,
    option: usize,
    /// Last seen position per enemy id, for velocity estimates
    last_seen: HashMap<u32, Vec2>,
}

impl Autopilot {
    fn new(seed: u64) -> Self {
        Self {
            upgrades_bought: 0,
            root: SpecRoot::ALL[(seed % SpecRoot::ALL.len() as u64) as usize],
            option: (seed / 4 % 2) as usize,
            last_seen: HashMap::new(),
        }
    }

    /// Answer menus, spend experience and start the boss when possible
    fn manage(&mut self, state: &mut GameState) {
        match state.spec_menu {
            SpecMenu::Root => {
                state.select_specialization(self.root, None);
            }
            SpecMenu::Options(root) => {
                state.select_specialization(root, Some(self.option));
            }
            SpecMenu::Closed => {}
        }

        loop {
            let kind = UPGRADE_PRIORITY[self.upgrades_bought % UPGRADE_PRIORITY.len()];
            if !state.apply_upgrade(kind) {
                break;
            }
            self.upgrades_bought += 1;
        }

        // Only take the boss on with a healthy tank
        let healthy = state.player.health >= state.player.max_health * 0.8;
        if healthy && state.boss.can_start() && state.start_boss_fight() {
            info!("autopilot started the boss fight at tick {}", state.time_ticks);
        }
    }

    /// Pick movement and aim for the next tick
    fn input(&mut self, state: &GameState) -> TickInput {
        let player = state.player.pos;
        let boss = state
            .boss
            .is_fighting()
            .then(|| state.boss.boss.as_ref().map(|b| (b.tank.id, b.tank.pos)))
            .flatten();
        let enemies: Vec<(u32, Vec2)> = state.bots.iter().map(|b| (b.id, b.pos)).chain(boss).collect();

        let velocities: HashMap<u32, Vec2> = enemies
            .iter()
            .map(|&(id, pos)| (id, self.last_seen.get(&id).map_or(Vec2::ZERO, |&prev| pos - prev)))
            .collect();
        self.last_seen = enemies.iter().copied().collect();

        let nearest = enemies
            .iter()
            .min_by(|a, b| a.1.distance_squared(player).total_cmp(&b.1.distance_squared(player)));

        let threats = state.bullets.iter().chain(&state.boss.bullets);
        let dodge = dodge_vector(player, state.player.radius, threats);

        let Some(&(id, target)) = nearest else {
            // Drift back toward the middle while nothing is around
            let home = state.config.world_center() - player;
            let drift = if home.length() > 50.0 { home.normalize() } else { Vec2::ZERO };
            return steer_input(drift + dodge * 2.0, 0.0, false);
        };

        let offset = target - player;
        let dir = offset.normalize_or_zero();
        let dist = offset.length();
        let radial = if dist < KITE_MIN {
            -dir
        } else if dist > KITE_MAX {
            dir * 0.5
        } else {
            Vec2::ZERO
        };

        let bullet_speed = state.player.forward_profile().speed;
        let velocity = velocities.get(&id).copied().unwrap_or(Vec2::ZERO);
        let aim_point = lead_target(player, target, velocity, bullet_speed);
        steer_input(
            dir.perp() * 0.6 + radial + dodge * 2.0,
            angle_to(player, aim_point),
            true,
        )
    }
}

/// Where to aim so a bullet at `bullet_speed` meets a target moving at
/// `velocity` per tick (one refinement of the straight-line flight time)
fn lead_target(shooter: Vec2, target: Vec2, velocity: Vec2, bullet_speed: f32) -> Vec2 {
    if bullet_speed <= 0.0 {
        return target;
    }
    let t = shooter.distance(target) / bullet_speed;
    let predicted = target + velocity * t;
    let t = shooter.distance(predicted) / bullet_speed;
    target + velocity * t
}

/// Sideways push away from every hostile bullet about to pass through the
/// player
fn dodge_vector<'a>(player: Vec2, radius: f32, bullets: impl Iterator<Item = &'a Bullet>) -> Vec2 {
    bullets
        .filter(|b| b.owner.hits_player())
        .filter_map(|b| {
            let path = heading(b.angle);
            let rel = player - b.pos;
            let along = rel.dot(path);
            if along <= 0.0 || along > DODGE_LOOKAHEAD {
                return None;
            }
            let miss = rel - path * along;
            if miss.length() > radius + b.radius + 8.0 {
                return None;
            }
            let side = if miss.length_squared() > 1e-6 {
                miss.normalize()
            } else {
                path.perp()
            };
            Some(side)
        })
        .sum()
}

fn steer_input(desired: Vec2, aim_angle: f32, fire: bool) -> TickInput {
    let d = desired.normalize_or_zero();
    TickInput {
        up: d.y < -0.3,
        down: d.y > 0.3,
        left: d.x < -0.3,
        right: d.x > 0.3,
        aim_angle,
        fire,
    }
}

fn main() {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = load_config(args.config.as_deref());
    if let Some(name) = args.difficulty.as_deref() {
        match DifficultyPreset::from_str(name) {
            Some(preset) => config.difficulty = preset,
            None => warn!("unknown difficulty '{name}', keeping {}", config.difficulty.as_str()),
        }
    }

    info!(
        "Tank Arena (headless) starting: seed {}, {} frames, difficulty {}",
        args.seed,
        args.frames,
        config.difficulty.as_str()
    );

    let mut state = GameState::with_config(config, args.seed);
    let mut pilot = Autopilot::new(args.seed);
    let mut bosses_defeated = 0;

    for _ in 0..args.frames {
        pilot.manage(&mut state);
        let input = pilot.input(&state);
        tick(&mut state, &input, 1);

        for event in &state.events {
            debug!("tick {}: {event:?}", state.time_ticks);
            if *event == GameEvent::BossDefeated {
                bosses_defeated += 1;
            }
        }
        if state.game_over {
            break;
        }
    }

    let player = &state.player;
    info!(
        "finished after {} ticks: level {}, {} kills, {} exp, health {:.0}/{:.0}, bosses defeated {}, game over {}",
        state.time_ticks,
        player.level,
        player.kills,
        player.exp,
        player.health,
        player.max_health,
        bosses_defeated,
        state.game_over
    );

    if args.json {
        match serde_json::to_string_pretty(&state.snapshot()) {
            Ok(json) => println!("{json}"),
            Err(e) => log::error!("failed to serialize snapshot: {e}"),
        }
    }
}
