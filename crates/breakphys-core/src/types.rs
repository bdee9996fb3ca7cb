use serde::{Deserialize, Serialize};
use crate::Scalar;

pub type Vec2 = glam::Vec2;

#[inline] pub fn vec2(x: Scalar, y: Scalar) -> Vec2 { Vec2::new(x, y) }
#[inline] pub fn iso(pos: Vec2, angle: Scalar) -> Isometry { Isometry { pos, angle } }

/// 2-D cross product of two vectors (z component).
#[inline] pub fn cross(a: Vec2, b: Vec2) -> Scalar { a.x * b.y - a.y * b.x }
/// scalar × vector: ω × r
#[inline] pub fn cross_sv(s: Scalar, v: Vec2) -> Vec2 { Vec2::new(-s * v.y, s * v.x) }
/// vector × scalar
#[inline] pub fn cross_vs(v: Vec2, s: Scalar) -> Vec2 { Vec2::new(s * v.y, -s * v.x) }

/// Position + rotation (radians, CCW).
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Isometry { pub pos: Vec2, pub angle: Scalar }

impl Isometry {
    pub const IDENTITY: Self = Self { pos: Vec2::ZERO, angle: 0.0 };

    /// Unit rotor (cos, sin).
    #[inline] pub fn rot(&self) -> Vec2 { Vec2::from_angle(self.angle) }

    #[inline] pub fn transform_point(&self, p: Vec2) -> Vec2 { self.pos + self.rot().rotate(p) }
    #[inline] pub fn transform_vector(&self, v: Vec2) -> Vec2 { self.rot().rotate(v) }

    #[inline] pub fn inverse_transform_point(&self, p: Vec2) -> Vec2 {
        Vec2::from_angle(-self.angle).rotate(p - self.pos)
    }
    #[inline] pub fn inverse_transform_vector(&self, v: Vec2) -> Vec2 {
        Vec2::from_angle(-self.angle).rotate(v)
    }
}

impl Default for Isometry {
    fn default() -> Self { Self::IDENTITY }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity { pub lin: Vec2, pub ang: Scalar }

#[cfg(test)]
mod tests {
    use super::*;

    #[test] fn round_trip_point() {
        let x = iso(vec2(1.0, 2.0), 0.7);
        let p = vec2(-0.3, 4.0);
        let q = x.inverse_transform_point(x.transform_point(p));
        assert!((p - q).length() < 1e-5);
    }

    #[test] fn quarter_turn() {
        let x = iso(Vec2::ZERO, core::f32::consts::FRAC_PI_2);
        let v = x.transform_vector(Vec2::X);
        assert!((v - Vec2::Y).length() < 1e-6);
    }

    #[test] fn cross_identities() {
        let r = vec2(0.5, -2.0);
        let w = 3.0;
        // (ω × r) · r == 0
        assert!(cross_sv(w, r).dot(r).abs() < 1e-6);
        assert!((cross(r, cross_sv(w, r)) - w * r.length_squared()).abs() < 1e-4);
    }
}
