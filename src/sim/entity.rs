//! Tanks, mounts and projectiles
//!
//! Everything here is plain data plus the per-entity rules (firing, cooldown,
//! regeneration, drone spawning). Cross-entity interaction lives in `tick`.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::upgrades::Specialization;
use crate::consts::*;
use crate::{SimConfig, clamp_to_world, heading};

/// Who fired a bullet; decides which tanks it can hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Bot,
    Boss,
    Drone,
}

impl Owner {
    /// Bullets that damage bots (and the boss)
    pub fn hits_bots(&self) -> bool {
        matches!(self, Owner::Player | Owner::Drone)
    }

    /// Bullets that damage the player
    pub fn hits_player(&self) -> bool {
        matches!(self, Owner::Bot | Owner::Boss)
    }
}

/// Bullet stats carried by a gun mount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulletProfile {
    pub speed: f32,
    pub damage: f32,
    pub radius: f32,
    /// Visual tag (0xRRGGBB)
    pub color: u32,
}

impl BulletProfile {
    pub fn standard(color: u32) -> Self {
        Self {
            speed: BULLET_SPEED,
            damage: BULLET_DAMAGE,
            radius: BULLET_RADIUS,
            color,
        }
    }

    /// Slow, big and hard-hitting
    pub fn heavy(color: u32) -> Self {
        Self {
            speed: BULLET_SPEED * 0.6,
            damage: 20.0,
            radius: 6.0,
            color,
        }
    }

    /// Fast and thin
    pub fn sniper(color: u32) -> Self {
        Self {
            speed: BULLET_SPEED * 1.5,
            damage: 15.0,
            radius: 3.0,
            color,
        }
    }

    pub fn pellet(color: u32) -> Self {
        Self {
            speed: PELLET_SPEED,
            damage: PELLET_DAMAGE,
            radius: PELLET_RADIUS,
            color,
        }
    }
}

/// How a mount's offset is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleMode {
    /// Relative to the current aim direction
    Aim,
    /// Fixed world angle around the body
    Body,
}

impl AngleMode {
    /// Emission angle for a mount with `offset` given the current aim
    #[inline]
    pub fn resolve(&self, aim: f32, offset: f32) -> f32 {
        match self {
            AngleMode::Aim => aim + offset,
            AngleMode::Body => offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GunMount {
    pub mode: AngleMode,
    pub offset: f32,
    pub profile: BulletProfile,
}

impl GunMount {
    pub fn aim(offset: f32, profile: BulletProfile) -> Self {
        Self {
            mode: AngleMode::Aim,
            offset,
            profile,
        }
    }

    pub fn body(offset: f32, profile: BulletProfile) -> Self {
        Self {
            mode: AngleMode::Body,
            offset,
            profile,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DroneSpawnerMount {
    pub mode: AngleMode,
    pub offset: f32,
}

/// Anything a specialization can bolt onto a tank
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Mount {
    Gun(GunMount),
    DroneSpawner(DroneSpawnerMount),
}

/// A projectile in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bullet {
    pub pos: Vec2,
    /// Direction of travel (radians)
    pub angle: f32,
    pub speed: f32,
    pub damage: f32,
    pub radius: f32,
    pub color: u32,
    pub owner: Owner,
    pub owner_id: Option<u32>,
}

impl Bullet {
    pub fn from_profile(
        pos: Vec2,
        angle: f32,
        profile: &BulletProfile,
        owner: Owner,
        owner_id: Option<u32>,
    ) -> Self {
        Self {
            pos,
            angle,
            speed: profile.speed,
            damage: profile.damage,
            radius: profile.radius,
            color: profile.color,
            owner,
            owner_id,
        }
    }

    /// Straight-line step
    #[inline]
    pub fn advance(&mut self) {
        self.pos += heading(self.angle) * self.speed;
    }

    pub fn in_bounds(&self, world: Vec2) -> bool {
        self.pos.x >= 0.0 && self.pos.x <= world.x && self.pos.y >= 0.0 && self.pos.y <= world.y
    }
}

/// Homing projectile released by a drone spawner
///
/// Flies straight at the nearest hostile and passes through walls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drone {
    pub pos: Vec2,
    pub speed: f32,
    pub damage: f32,
    pub radius: f32,
    /// Remaining ticks
    pub life: u32,
    pub owner_id: u32,
    pub color: u32,
}

impl Drone {
    pub fn new(pos: Vec2, owner_id: u32) -> Self {
        Self {
            pos,
            speed: DRONE_SPEED,
            damage: DRONE_DAMAGE,
            radius: DRONE_RADIUS,
            life: DRONE_LIFETIME,
            owner_id,
            color: DRONE_COLOR,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life > 0
    }

    /// Age one tick and home on the nearest of `targets` (center, radius),
    /// staying inside `world`
    ///
    /// Returns the index of the target struck this tick. A drone that hits
    /// self-destructs; the caller applies the damage.
    pub fn step(&mut self, targets: &[(Vec2, f32)], world: Vec2) -> Option<usize> {
        self.life = self.life.saturating_sub(1);
        self.pos = clamp_to_world(self.pos, world, 0.0);

        let (idx, &(target, target_radius)) = targets.iter().enumerate().min_by(|a, b| {
            a.1.0
                .distance_squared(self.pos)
                .total_cmp(&b.1.0.distance_squared(self.pos))
        })?;

        let to_target = target - self.pos;
        if to_target.length_squared() > 0.0 {
            self.pos = clamp_to_world(self.pos + to_target.normalize() * self.speed, world, 0.0);
        }

        if self.pos.distance(target) < target_radius {
            self.life = 0;
            return Some(idx);
        }
        None
    }
}

/// Patrol axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
}

/// Back-and-forth sweep used while a bot cannot see its target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Patrol {
    pub axis: Axis,
    /// +1.0 or -1.0
    pub dir: f32,
    /// Ticks until the direction flips
    pub timer: u32,
}

/// Per-bot steering memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiState {
    /// +1.0 (counter-clockwise) or -1.0
    pub orbit_dir: f32,
    pub wander_angle: f32,
    pub patrol: Option<Patrol>,
}

impl AiState {
    pub fn new(rng: &mut impl Rng) -> Self {
        Self {
            orbit_dir: if rng.random_bool(0.5) { 1.0 } else { -1.0 },
            wander_angle: rng.random_range(0.0..TAU),
            patrol: None,
        }
    }
}

/// Ticks between shots for a fire rate in shots/second
///
/// Never less than one tick; a non-positive rate fires once a second.
pub fn frames_per_shot(fire_rate: f32) -> u32 {
    if fire_rate <= 0.0 {
        return FPS;
    }
    (FPS as f32 / fire_rate).ceil().max(1.0) as u32
}

/// A tank (player, bot or the boss body)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tank {
    pub id: u32,
    pub pos: Vec2,
    pub radius: f32,
    pub health: f32,
    pub max_health: f32,
    pub speed: f32,
    /// Shots per second
    pub fire_rate: f32,
    /// Ticks until the next shot is allowed
    pub fire_cooldown: u32,
    /// Health restored per tick
    pub regen_rate: f32,
    /// Never empty
    pub gun_mounts: Vec<GunMount>,
    pub drone_spawners: Vec<DroneSpawnerMount>,
    /// Ticks until the spawners release the next drones
    pub drone_timer: u32,
    pub exp: u32,
    pub level: u32,
    pub kills: u32,
    pub specialization: Specialization,
    /// Each mount fires a pellet fan instead of its own bullet
    pub shotgun: bool,
    /// Last aim direction (radians)
    pub aim_angle: f32,
    pub color: u32,
    /// Steering memory (bots and boss only)
    pub ai: Option<AiState>,
}

impl Tank {
    pub fn new(id: u32, pos: Vec2, color: u32) -> Self {
        Self {
            id,
            pos,
            radius: TANK_RADIUS,
            health: TANK_MAX_HEALTH,
            max_health: TANK_MAX_HEALTH,
            speed: TANK_SPEED,
            fire_rate: TANK_FIRE_RATE,
            fire_cooldown: 0,
            regen_rate: TANK_REGEN_RATE,
            gun_mounts: vec![GunMount::aim(0.0, BulletProfile::standard(color))],
            drone_spawners: Vec::new(),
            drone_timer: 0,
            exp: 0,
            level: 1,
            kills: 0,
            specialization: Specialization::default(),
            shotgun: false,
            aim_angle: 0.0,
            color,
            ai: None,
        }
    }

    pub fn player(id: u32, pos: Vec2) -> Self {
        Self::new(id, pos, PLAYER_COLOR)
    }

    /// A bot scaled to `difficulty`: faster, harder-hitting bullets, quicker
    /// movement and fire rate; a single aimed gun and no regeneration
    pub fn bot(
        id: u32,
        pos: Vec2,
        difficulty: u32,
        config: &SimConfig,
        rng: &mut impl Rng,
    ) -> Self {
        let d = difficulty as f32;
        let mut tank = Self::new(id, pos, BOT_COLOR);
        tank.speed += d * BOT_SPEED_PER_LEVEL;
        tank.fire_rate = config.bot_fire_rate(difficulty);
        tank.regen_rate = 0.0;

        let mut profile = BulletProfile::standard(BOT_COLOR);
        profile.speed += d * BOT_BULLET_SPEED_PER_LEVEL;
        profile.damage += d * BOT_DAMAGE_PER_LEVEL;
        tank.gun_mounts = vec![GunMount::aim(0.0, profile)];

        tank.ai = Some(AiState::new(rng));
        tank
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }

    #[inline]
    pub fn can_fire(&self) -> bool {
        self.fire_cooldown == 0
    }

    pub fn tick_cooldown(&mut self) {
        self.fire_cooldown = self.fire_cooldown.saturating_sub(1);
    }

    pub fn regenerate(&mut self) {
        if self.health < self.max_health {
            self.health = (self.health + self.regen_rate).min(self.max_health);
        }
    }

    /// Apply damage; returns true when this took the tank to zero or below
    pub fn take_damage(&mut self, amount: f32) -> bool {
        let was_alive = !self.is_dead();
        self.health -= amount;
        was_alive && self.is_dead()
    }

    /// Profile of the forward-most gun (the first mount)
    pub fn forward_profile(&self) -> BulletProfile {
        self.gun_mounts
            .first()
            .map(|m| m.profile)
            .unwrap_or_else(|| BulletProfile::standard(self.color))
    }

    /// Fire every gun mount if the cooldown allows
    ///
    /// Emits one bullet per mount, or `PELLETS_PER_MOUNT` pellets per mount
    /// with a random spread in shotgun mode, then resets the cooldown. Returns
    /// nothing while cooling down.
    pub fn fire(&mut self, aim: f32, owner: Owner, rng: &mut impl Rng) -> Vec<Bullet> {
        if !self.can_fire() {
            return Vec::new();
        }

        let per_mount = if self.shotgun { PELLETS_PER_MOUNT } else { 1 };
        let mut bullets = Vec::with_capacity(self.gun_mounts.len() * per_mount);
        for mount in &self.gun_mounts {
            let angle = mount.mode.resolve(aim, mount.offset);
            if self.shotgun {
                let pellet = BulletProfile::pellet(self.color);
                for _ in 0..PELLETS_PER_MOUNT {
                    let spread = rng.random_range(-PELLET_SPREAD..=PELLET_SPREAD);
                    bullets.push(Bullet::from_profile(
                        self.pos,
                        angle + spread,
                        &pellet,
                        owner,
                        Some(self.id),
                    ));
                }
            } else {
                bullets.push(Bullet::from_profile(
                    self.pos,
                    angle,
                    &mount.profile,
                    owner,
                    Some(self.id),
                ));
            }
        }

        self.fire_cooldown = frames_per_shot(self.fire_rate);
        bullets
    }

    /// Replace mounts wholesale
    ///
    /// Keeps the current guns when `mounts` carries none, so the gun list is
    /// never emptied. Drone spawners are always replaced.
    pub fn apply_mounts(&mut self, mounts: &[Mount], shotgun: bool) {
        let guns: Vec<GunMount> = mounts
            .iter()
            .filter_map(|m| match m {
                Mount::Gun(g) => Some(*g),
                Mount::DroneSpawner(_) => None,
            })
            .collect();
        let spawners = mounts
            .iter()
            .filter_map(|m| match m {
                Mount::DroneSpawner(s) => Some(*s),
                Mount::Gun(_) => None,
            })
            .collect();

        if !guns.is_empty() {
            self.gun_mounts = guns;
        }
        self.drone_spawners = spawners;
        self.drone_timer = 0;
        self.shotgun = shotgun;
    }

    /// Count down the spawner timer and release one drone per spawner when
    /// it runs out
    ///
    /// Release points are clamped into `world`.
    pub fn update_drone_spawners(&mut self, world: Vec2) -> Vec<Drone> {
        if self.drone_spawners.is_empty() {
            return Vec::new();
        }
        if self.drone_timer > 0 {
            self.drone_timer -= 1;
            return Vec::new();
        }

        self.drone_timer = DRONE_SPAWN_INTERVAL;
        self.drone_spawners
            .iter()
            .map(|s| {
                let angle = s.mode.resolve(self.aim_angle, s.offset);
                let pos = self.pos + heading(angle) * (self.radius - 2.0);
                Drone::new(clamp_to_world(pos, world, 0.0), self.id)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::f32::consts::PI;

    const WORLD: Vec2 = Vec2::new(WORLD_WIDTH, WORLD_HEIGHT);

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(1)
    }

    #[test]
    fn test_frames_per_shot() {
        assert_eq!(frames_per_shot(4.0), 15);
        // 60 / 7 = 8.57 rounds up
        assert_eq!(frames_per_shot(7.0), 9);
        assert_eq!(frames_per_shot(1000.0), 1);
        assert_eq!(frames_per_shot(0.0), FPS);
        assert_eq!(frames_per_shot(-2.0), FPS);
    }

    #[test]
    fn test_fire_one_bullet_per_mount() {
        let mut tank = Tank::player(0, Vec2::new(100.0, 100.0));
        tank.gun_mounts.push(GunMount::aim(PI, BulletProfile::heavy(PLAYER_COLOR)));
        tank.gun_mounts.push(GunMount::body(PI / 2.0, BulletProfile::standard(PLAYER_COLOR)));

        let bullets = tank.fire(0.5, Owner::Player, &mut rng());
        assert_eq!(bullets.len(), 3);
        assert!((bullets[0].angle - 0.5).abs() < 1e-6);
        assert!((bullets[1].angle - (0.5 + PI)).abs() < 1e-6);
        // Body mounts ignore the aim
        assert!((bullets[2].angle - PI / 2.0).abs() < 1e-6);
        assert_eq!(bullets[1].damage, 20.0);
        assert!(bullets.iter().all(|b| b.owner_id == Some(0)));
        assert_eq!(tank.fire_cooldown, 15);
    }

    #[test]
    fn test_fire_blocked_by_cooldown() {
        let mut tank = Tank::player(0, Vec2::ZERO);
        tank.fire_cooldown = 3;
        assert!(tank.fire(0.0, Owner::Player, &mut rng()).is_empty());
        assert_eq!(tank.fire_cooldown, 3);
    }

    #[test]
    fn test_shotgun_fires_pellet_fans() {
        let mut tank = Tank::player(0, Vec2::ZERO);
        tank.gun_mounts = (0..5)
            .map(|i| GunMount::aim(i as f32 * 0.3, BulletProfile::pellet(PLAYER_COLOR)))
            .collect();
        tank.shotgun = true;

        let bullets = tank.fire(0.0, Owner::Player, &mut rng());
        assert_eq!(bullets.len(), 5 * PELLETS_PER_MOUNT);
        for (i, chunk) in bullets.chunks(PELLETS_PER_MOUNT).enumerate() {
            let base = i as f32 * 0.3;
            for pellet in chunk {
                assert!((pellet.angle - base).abs() <= PELLET_SPREAD + 1e-6);
                assert_eq!(pellet.damage, PELLET_DAMAGE);
            }
        }
    }

    #[test]
    fn test_apply_mounts_keeps_guns_when_none_given() {
        let mut tank = Tank::player(0, Vec2::ZERO);
        let spawner = DroneSpawnerMount {
            mode: AngleMode::Aim,
            offset: PI,
        };
        tank.apply_mounts(&[Mount::DroneSpawner(spawner)], false);
        assert_eq!(tank.gun_mounts.len(), 1);
        assert_eq!(tank.drone_spawners.len(), 1);
    }

    #[test]
    fn test_drone_spawner_timer() {
        let mut tank = Tank::player(0, Vec2::new(200.0, 200.0));
        tank.drone_spawners.push(DroneSpawnerMount {
            mode: AngleMode::Body,
            offset: 0.0,
        });

        // Timer starts expired: first call spawns immediately
        let drones = tank.update_drone_spawners(WORLD);
        assert_eq!(drones.len(), 1);
        assert!((drones[0].pos - Vec2::new(218.0, 200.0)).length() < 1e-4);

        for _ in 0..DRONE_SPAWN_INTERVAL {
            assert!(tank.update_drone_spawners(WORLD).is_empty());
        }
        assert_eq!(tank.update_drone_spawners(WORLD).len(), 1);
    }

    #[test]
    fn test_drone_homes_and_strikes() {
        let mut drone = Drone::new(Vec2::new(0.0, 0.0), 0);
        let targets = [(Vec2::new(100.0, 0.0), 20.0), (Vec2::new(0.0, 30.0), 25.0)];
        // Nearest target is the second one; 30 - 4 = 26 is still outside it
        assert_eq!(drone.step(&targets, WORLD), None);
        assert!((drone.pos - Vec2::new(0.0, 4.0)).length() < 1e-5);
        assert_eq!(drone.step(&targets, WORLD), Some(1));
        assert!(!drone.is_alive());
    }

    #[test]
    fn test_drone_released_at_edge_stays_in_world() {
        let mut tank = Tank::player(0, Vec2::new(0.0, 600.0));
        tank.aim_angle = PI;
        tank.drone_spawners.push(DroneSpawnerMount {
            mode: AngleMode::Aim,
            offset: 0.0,
        });
        let mut drones = tank.update_drone_spawners(WORLD);
        assert!((drones[0].pos - Vec2::new(0.0, 600.0)).length() < 1e-3);
        assert_eq!(drones[0].color, DRONE_COLOR);

        // No hostiles: the drone idles but never leaves the world
        let drone = &mut drones[0];
        drone.pos = Vec2::new(-18.0, 1250.0);
        assert_eq!(drone.step(&[], WORLD), None);
        assert_eq!(drone.pos, Vec2::new(0.0, WORLD_HEIGHT));
    }

    #[test]
    fn test_drone_expires() {
        let mut drone = Drone::new(Vec2::ZERO, 0);
        drone.life = 1;
        assert_eq!(drone.step(&[], WORLD), None);
        assert!(!drone.is_alive());
    }

    #[test]
    fn test_bot_scaling() {
        let config = SimConfig::default();
        let bot = Tank::bot(3, Vec2::ZERO, 5, &config, &mut rng());
        assert_eq!(bot.gun_mounts.len(), 1);
        assert!((bot.forward_profile().damage - 20.0).abs() < 1e-5);
        assert!((bot.forward_profile().speed - 8.5).abs() < 1e-5);
        assert!((bot.speed - 4.0).abs() < 1e-5);
        assert!((bot.fire_rate - 1.5).abs() < 1e-5);
        assert_eq!(bot.regen_rate, 0.0);
        assert!(bot.ai.is_some());
    }

    #[test]
    fn test_take_damage_reports_kill_once() {
        let mut tank = Tank::player(0, Vec2::ZERO);
        assert!(!tank.take_damage(60.0));
        assert!(tank.take_damage(60.0));
        assert!(!tank.take_damage(10.0));
    }

    proptest! {
        #[test]
        fn prop_fire_count_matches_mounts(mounts in 1usize..8, shotgun in any::<bool>(), rate in 0.1f32..20.0) {
            let mut tank = Tank::player(0, Vec2::ZERO);
            tank.gun_mounts = vec![GunMount::aim(0.0, BulletProfile::standard(PLAYER_COLOR)); mounts];
            tank.shotgun = shotgun;
            tank.fire_rate = rate;
            let bullets = tank.fire(0.0, Owner::Player, &mut rng());
            let expected = if shotgun { mounts * PELLETS_PER_MOUNT } else { mounts };
            prop_assert_eq!(bullets.len(), expected);
            prop_assert_eq!(tank.fire_cooldown, ((FPS as f32 / rate).ceil() as u32).max(1));
        }
    }
}
