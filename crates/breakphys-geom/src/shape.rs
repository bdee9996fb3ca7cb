use breakphys_core::types::{cross, Isometry, Vec2};
use crate::aabb::Aabb;
use crate::mass::MassData;

/// Convex polygon in body-local coordinates, wound CCW.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vec2>,
    normals: Vec<Vec2>,
    centroid: Vec2,
}

impl Polygon {
    /// Build from a closed loop. The loop is assumed convex; clockwise input is reversed.
    /// Fewer than three vertices gives a zero-area polygon.
    pub fn new(mut vertices: Vec<Vec2>) -> Self {
        if signed_area(&vertices) < 0.0 { vertices.reverse(); }
        let n = vertices.len();
        let mut normals = Vec::with_capacity(n);
        for i in 0..n {
            let e = vertices[(i + 1) % n] - vertices[i];
            normals.push(Vec2::new(e.y, -e.x).normalize_or_zero());
        }
        let centroid = centroid_of(&vertices);
        Self { vertices, normals, centroid }
    }

    /// Axis-aligned box with half extents, centered on the body origin.
    pub fn rect(hx: f32, hy: f32) -> Self {
        Self::new(vec![
            Vec2::new(-hx, -hy), Vec2::new(hx, -hy),
            Vec2::new(hx, hy), Vec2::new(-hx, hy),
        ])
    }

    /// Oriented box placed at `center` with rotation `angle` in the body frame.
    pub fn oriented_rect(hx: f32, hy: f32, center: Vec2, angle: f32) -> Self {
        let xf = Isometry { pos: center, angle };
        Self::new(Polygon::rect(hx, hy).vertices.iter().map(|&v| xf.transform_point(v)).collect())
    }

    #[inline] pub fn vertices(&self) -> &[Vec2] { &self.vertices }
    #[inline] pub fn normals(&self) -> &[Vec2] { &self.normals }
    #[inline] pub fn centroid(&self) -> Vec2 { self.centroid }
    #[inline] pub fn len(&self) -> usize { self.vertices.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.vertices.is_empty() }

    pub fn area(&self) -> f32 { signed_area(&self.vertices).abs() }

    fn mass_data(&self, density: f32) -> MassData {
        let n = self.vertices.len();
        if n < 3 { return MassData::zero(); }

        // Triangle fan about the first vertex keeps the sums well conditioned.
        let s = self.vertices[0];
        let mut area = 0.0f32;
        let mut center = Vec2::ZERO;
        let mut inertia = 0.0f32;
        for i in 0..n {
            let e1 = self.vertices[i] - s;
            let e2 = self.vertices[(i + 1) % n] - s;
            let d = cross(e1, e2);
            let tri = 0.5 * d;
            area += tri;
            center += (e1 + e2) * (tri / 3.0);
            let intx2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let inty2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 / 3.0 * d) * (intx2 + inty2);
        }
        if area <= f32::EPSILON { return MassData::zero(); }

        let mass = density * area;
        center /= area;
        let world_center = center + s;
        // shift from the fan origin to the body origin
        let inertia = density * inertia + mass * (world_center.dot(world_center) - center.dot(center));
        MassData { mass, center: world_center, inertia }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Circle { radius: f32, center: Vec2 },
    Polygon(Polygon),
}

impl Shape {
    pub fn circle(radius: f32) -> Self { Shape::Circle { radius, center: Vec2::ZERO } }
    pub fn rect(hx: f32, hy: f32) -> Self { Shape::Polygon(Polygon::rect(hx, hy)) }
    pub fn polygon(vertices: Vec<Vec2>) -> Self { Shape::Polygon(Polygon::new(vertices)) }

    pub fn mass_data(&self, density: f32) -> MassData {
        match self {
            Shape::Circle { radius, center } => {
                let mass = density * core::f32::consts::PI * radius * radius;
                MassData { mass, center: *center, inertia: mass * (0.5 * radius * radius + center.dot(*center)) }
            }
            Shape::Polygon(p) => p.mass_data(density),
        }
    }
}

#[inline]
pub fn aabb_of(shape: &Shape, xf: &Isometry) -> Aabb {
    match shape {
        Shape::Circle { radius, center } => {
            Aabb::from_center_half_extents(xf.transform_point(*center), Vec2::splat(*radius))
        }
        Shape::Polygon(p) => {
            let mut it = p.vertices().iter().map(|&v| xf.transform_point(v));
            let Some(first) = it.next() else {
                return Aabb::new(xf.pos, xf.pos);
            };
            let (mn, mx) = it.fold((first, first), |(mn, mx), v| (mn.min(v), mx.max(v)));
            Aabb::new(mn, mx)
        }
    }
}

fn signed_area(v: &[Vec2]) -> f32 {
    let n = v.len();
    if n < 3 { return 0.0; }
    let mut a = 0.0;
    for i in 0..n { a += cross(v[i], v[(i + 1) % n]); }
    0.5 * a
}

fn centroid_of(v: &[Vec2]) -> Vec2 {
    let n = v.len();
    if n == 0 { return Vec2::ZERO; }
    let a = signed_area(v);
    if a.abs() <= f32::EPSILON {
        return v.iter().copied().sum::<Vec2>() / n as f32;
    }
    let mut c = Vec2::ZERO;
    for i in 0..n {
        let p = v[i];
        let q = v[(i + 1) % n];
        c += (p + q) * cross(p, q);
    }
    c / (6.0 * a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test] fn box_mass_matches_closed_form() {
        let md = Shape::rect(1.0, 0.5).mass_data(2.0);
        // 2 x 1 box, density 2
        assert_relative_eq!(md.mass, 4.0, epsilon = 1e-5);
        assert_relative_eq!(md.center.length(), 0.0, epsilon = 1e-5);
        // m (w² + h²) / 12
        assert_relative_eq!(md.inertia, 4.0 * (4.0 + 1.0) / 12.0, epsilon = 1e-4);
    }

    #[test] fn offset_box_uses_parallel_axis() {
        let p = Polygon::oriented_rect(0.5, 0.5, Vec2::new(2.0, 0.0), 0.0);
        let md = Shape::Polygon(p).mass_data(1.0);
        assert_relative_eq!(md.mass, 1.0, epsilon = 1e-5);
        assert_relative_eq!(md.center.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(md.inertia, 1.0 * 2.0 / 12.0 + 4.0, epsilon = 1e-4);
    }

    #[test] fn clockwise_loop_is_rewound() {
        let p = Polygon::new(vec![
            Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0),
        ]);
        assert!(signed_area(p.vertices()) > 0.0);
        // outward normal of the bottom edge points down
        assert!(p.normals().iter().any(|n| (*n - Vec2::new(0.0, -1.0)).length() < 1e-6));
    }

    #[test] fn degenerate_loop_has_no_mass() {
        let md = Shape::polygon(vec![Vec2::ZERO, Vec2::X]).mass_data(1.0);
        assert_eq!(md.mass, 0.0);
    }

    #[test] fn cloned_shape_is_independent() {
        let a = Shape::rect(1.0, 1.0);
        let b = a.clone();
        drop(a);
        assert_relative_eq!(b.mass_data(1.0).mass, 4.0, epsilon = 1e-5);
    }

    #[test] fn rotated_polygon_aabb() {
        let s = Shape::rect(1.0, 1.0);
        let bb = aabb_of(&s, &Isometry { pos: Vec2::ZERO, angle: core::f32::consts::FRAC_PI_4 });
        assert_relative_eq!(bb.max.x, 2.0f32.sqrt(), epsilon = 1e-5);
    }
}
