use breakphys_core::Vec2;
use serde::{Deserialize, Serialize};

/// Solver and integration parameters. Serializable so scenes can carry them.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub gravity: Vec2,
    pub velocity_iterations: u32,
    /// Fraction of penetration (beyond `slop`) fed back as velocity bias per step.
    pub baumgarte: f32,
    pub slop: f32,
    /// Approach speeds below this never bounce.
    pub restitution_threshold: f32,
    pub warm_starting: bool,
    pub rng_seed: u64,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81),
            velocity_iterations: 8,
            baumgarte: 0.2,
            slop: 0.005,
            restitution_threshold: 1.0,
            warm_starting: true,
            rng_seed: 0x9E37_79B9_7F4A_7C15,
        }
    }
}

/// Periodic debug dump of world state through `tracing::debug!`. All off by default.
#[derive(Copy, Clone, Debug)]
pub struct DebugSettings {
    /// 0 = never
    pub print_every: u32,
    pub show_bodies: bool,
    pub show_contacts: bool,
    pub show_events: bool,
    pub max_lines: usize,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self { print_every: 0, show_bodies: false, show_contacts: false, show_events: false, max_lines: 32 }
    }
}
