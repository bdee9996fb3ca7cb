use breakphys_core::types::Vec2;
use serde::{Deserialize, Serialize};

/// Per-fixture material. Density drives mass; friction/restitution are mixed per contact pair.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material { pub density: f32, pub friction: f32, pub restitution: f32 }

impl Default for Material {
    fn default() -> Self { Self { density: 1.0, friction: 0.4, restitution: 0.0 } }
}

impl Material {
    pub fn with_density(density: f32) -> Self { Self { density, ..Self::default() } }

    /// Geometric-mean friction, max restitution (symmetric in a/b).
    pub fn mix(a: &Material, b: &Material) -> (f32, f32) {
        ((a.friction * b.friction).sqrt(), a.restitution.max(b.restitution))
    }
}

/// Mass properties of one shape in its body's local frame.
/// `inertia` is about the body origin, not about `center`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MassData {
    pub mass: f32,
    pub center: Vec2,
    pub inertia: f32,
}

impl MassData {
    pub fn zero() -> Self { Self::default() }
}
