use breakphys_core::types::Vec2;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Aabb { pub min: Vec2, pub max: Vec2 }

impl Aabb {
    #[inline] pub fn new(min: Vec2, max: Vec2) -> Self { Self { min, max } }
    #[inline] pub fn from_center_half_extents(c: Vec2, he: Vec2) -> Self {
        Self { min: c - he, max: c + he }
    }
    #[inline] pub fn overlaps(&self, other: &Aabb) -> bool {
        !(self.max.x < other.min.x || self.min.x > other.max.x ||
            self.max.y < other.min.y || self.min.y > other.max.y)
    }
    #[inline] pub fn expand_by(&mut self, r: f32) {
        let e = Vec2::splat(r);
        self.min -= e; self.max += e;
    }
    #[inline] pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb { min: self.min.min(other.min), max: self.max.max(other.max) }
    }
    #[inline] pub fn center(&self) -> Vec2 { (self.min + self.max) * 0.5 }
}
