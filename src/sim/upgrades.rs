//! Specialization tree and stat upgrades
//!
//! A specialization is picked in two stages: a root (applied immediately with
//! its default mounts) and, at the next offer, one of that root's two options,
//! which replaces the mounts for good.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use super::entity::{AngleMode, BulletProfile, DroneSpawnerMount, GunMount, Mount, Tank};

const THIRD_TURN: f32 = 2.0 * PI / 3.0;

/// Root branches of the specialization tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecRoot {
    DualBarrel,
    TwinGun,
    HeavyCannon,
    SniperBarrel,
}

impl SpecRoot {
    /// Menu order
    pub const ALL: [SpecRoot; 4] = [
        SpecRoot::DualBarrel,
        SpecRoot::TwinGun,
        SpecRoot::HeavyCannon,
        SpecRoot::SniperBarrel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecRoot::DualBarrel => "dual_barrel",
            SpecRoot::TwinGun => "twin_gun",
            SpecRoot::HeavyCannon => "heavy_cannon",
            SpecRoot::SniperBarrel => "sniper_barrel",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "dual_barrel" | "dual" => Some(SpecRoot::DualBarrel),
            "twin_gun" | "twin" => Some(SpecRoot::TwinGun),
            "heavy_cannon" | "heavy" => Some(SpecRoot::HeavyCannon),
            "sniper_barrel" | "sniper" => Some(SpecRoot::SniperBarrel),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SpecRoot::DualBarrel => "Dual barrel",
            SpecRoot::TwinGun => "Twin gun",
            SpecRoot::HeavyCannon => "Heavy cannon",
            SpecRoot::SniperBarrel => "Sniper barrel",
        }
    }
}

/// Where a tank stands in the specialization tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialization {
    pub root: Option<SpecRoot>,
    pub option: Option<usize>,
    /// Second stage taken; no further offers
    pub complete: bool,
}

/// Second-stage choice under a root
#[derive(Debug, Clone, PartialEq)]
pub struct SpecOption {
    pub label: &'static str,
    pub mounts: Vec<Mount>,
    pub shotgun: bool,
}

fn gun(offset: f32, profile: BulletProfile) -> Mount {
    Mount::Gun(GunMount::aim(offset, profile))
}

/// The two options offered under `root`, with bullets tagged `color`
pub fn specialization_options(root: SpecRoot, color: u32) -> [SpecOption; 2] {
    let standard = BulletProfile::standard(color);
    match root {
        SpecRoot::DualBarrel => [
            SpecOption {
                label: "Triple barrel",
                mounts: vec![gun(0.0, standard), gun(0.2, standard), gun(-0.2, standard)],
                shotgun: false,
            },
            SpecOption {
                label: "Double barrel + rear gun",
                mounts: vec![gun(-0.12, standard), gun(0.12, standard), gun(PI, standard)],
                shotgun: false,
            },
        ],
        SpecRoot::TwinGun => [
            SpecOption {
                label: "Big front + small rear",
                mounts: vec![gun(0.0, BulletProfile::heavy(color)), gun(PI, standard)],
                shotgun: false,
            },
            SpecOption {
                label: "Three guns at 120°",
                mounts: vec![
                    gun(0.0, standard),
                    gun(THIRD_TURN, standard),
                    gun(-THIRD_TURN, standard),
                ],
                shotgun: false,
            },
        ],
        SpecRoot::HeavyCannon => {
            let pellet = BulletProfile::pellet(color);
            [
                SpecOption {
                    label: "Heavy",
                    mounts: vec![gun(0.0, BulletProfile::heavy(color))],
                    shotgun: false,
                },
                SpecOption {
                    label: "Shotgun cannon",
                    mounts: [-0.6021, -0.3011, 0.0, 0.3011, 0.6021]
                        .into_iter()
                        .map(|offset| gun(offset, pellet))
                        .collect(),
                    shotgun: true,
                },
            ]
        }
        SpecRoot::SniperBarrel => [
            SpecOption {
                label: "Long barrel",
                mounts: vec![gun(
                    0.0,
                    BulletProfile {
                        speed: 11.0,
                        damage: 16.0,
                        radius: 3.0,
                        color,
                    },
                )],
                shotgun: false,
            },
            SpecOption {
                label: "Sniper + drone spawner",
                mounts: vec![
                    gun(0.0, standard),
                    Mount::DroneSpawner(DroneSpawnerMount {
                        mode: AngleMode::Aim,
                        offset: PI,
                    }),
                ],
                shotgun: false,
            },
        ],
    }
}

/// Mounts applied as soon as a root is picked
pub fn root_defaults(root: SpecRoot, color: u32) -> Vec<Mount> {
    let standard = BulletProfile::standard(color);
    match root {
        SpecRoot::DualBarrel => vec![gun(-0.12, standard), gun(0.12, standard)],
        SpecRoot::TwinGun => vec![gun(0.0, standard), gun(PI, standard)],
        SpecRoot::HeavyCannon => vec![gun(0.0, BulletProfile::heavy(color))],
        SpecRoot::SniperBarrel => vec![gun(0.0, BulletProfile::sniper(color))],
    }
}

/// Specialization menu state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecMenu {
    #[default]
    Closed,
    /// Pick one of the four roots
    Root,
    /// Pick one of the root's two options
    Options(SpecRoot),
}

impl SpecMenu {
    pub fn is_open(&self) -> bool {
        !matches!(self, SpecMenu::Closed)
    }
}

/// Stat upgrades bought with experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeKind {
    Speed,
    BulletSpeed,
    Damage,
    Health,
    FireRate,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 5] = [
        UpgradeKind::Speed,
        UpgradeKind::BulletSpeed,
        UpgradeKind::Damage,
        UpgradeKind::Health,
        UpgradeKind::FireRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradeKind::Speed => "speed",
            UpgradeKind::BulletSpeed => "bullet_speed",
            UpgradeKind::Damage => "damage",
            UpgradeKind::Health => "health",
            UpgradeKind::FireRate => "fire_rate",
        }
    }

    /// Apply the stat change (cost is handled by the caller)
    pub fn apply(&self, tank: &mut Tank) {
        match self {
            UpgradeKind::Speed => tank.speed += 0.5,
            UpgradeKind::BulletSpeed => {
                for mount in &mut tank.gun_mounts {
                    mount.profile.speed += 1.0;
                }
            }
            UpgradeKind::Damage => {
                for mount in &mut tank.gun_mounts {
                    mount.profile.damage += 2.0;
                }
            }
            UpgradeKind::Health => {
                tank.max_health += 20.0;
                tank.health = (tank.health + 20.0).min(tank.max_health);
            }
            UpgradeKind::FireRate => tank.fire_rate += 0.5,
        }
    }
}
