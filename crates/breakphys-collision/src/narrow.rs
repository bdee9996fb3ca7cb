//! Narrowphase: contact manifolds between pairs of shapes in world space.
//!
//! The manifold normal always points from shape A to shape B.

use breakphys_core::types::{Isometry, Vec2};
use breakphys_geom::{Polygon, Shape};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ManifoldPoint {
    /// World point midway between the two surfaces.
    pub point: Vec2,
    /// Penetration depth (positive when overlapping).
    pub depth: f32,
    /// Feature key, stable while the same features stay in contact.
    pub id: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Manifold {
    pub normal: Vec2,
    pub points: Vec<ManifoldPoint>,
}

pub fn collide(a: &Shape, xa: &Isometry, b: &Shape, xb: &Isometry) -> Option<Manifold> {
    match (a, b) {
        (Shape::Circle { radius: ra, center: ca }, Shape::Circle { radius: rb, center: cb }) => {
            circle_circle(xa.transform_point(*ca), *ra, xb.transform_point(*cb), *rb)
        }
        (Shape::Polygon(pa), Shape::Circle { radius, center }) => {
            polygon_circle(pa, xa, xb.transform_point(*center), *radius)
        }
        (Shape::Circle { radius, center }, Shape::Polygon(pb)) => {
            let mut m = polygon_circle(pb, xb, xa.transform_point(*center), *radius)?;
            m.normal = -m.normal;
            Some(m)
        }
        (Shape::Polygon(pa), Shape::Polygon(pb)) => polygon_polygon(pa, xa, pb, xb),
    }
}

fn circle_circle(ca: Vec2, ra: f32, cb: Vec2, rb: f32) -> Option<Manifold> {
    let d = cb - ca;
    let dist2 = d.length_squared();
    let rsum = ra + rb;
    if dist2 > rsum * rsum { return None; }
    let dist = dist2.sqrt();
    let normal = if dist > 1.0e-6 { d / dist } else { Vec2::Y };
    let pa = ca + normal * ra;
    let pb = cb - normal * rb;
    Some(Manifold {
        normal,
        points: vec![ManifoldPoint { point: (pa + pb) * 0.5, depth: rsum - dist, id: 0 }],
    })
}

/// Polygon is A, circle is B.
fn polygon_circle(poly: &Polygon, xf: &Isometry, center_w: Vec2, r: f32) -> Option<Manifold> {
    let verts = poly.vertices();
    let norms = poly.normals();
    let n = verts.len();
    if n < 3 { return None; }

    let c = xf.inverse_transform_point(center_w);

    let mut best = 0usize;
    let mut separation = f32::MIN;
    for i in 0..n {
        let s = norms[i].dot(c - verts[i]);
        if s > r { return None; }
        if s > separation { separation = s; best = i; }
    }

    let v1 = verts[best];
    let v2 = verts[(best + 1) % n];

    // (local normal, local point on the polygon surface)
    let (ln, lp) = if separation < f32::EPSILON {
        // center inside the polygon
        (norms[best], c - norms[best] * separation)
    } else {
        let u1 = (c - v1).dot(v2 - v1);
        let u2 = (c - v2).dot(v1 - v2);
        if u1 <= 0.0 {
            if (c - v1).length_squared() > r * r { return None; }
            ((c - v1).normalize_or_zero(), v1)
        } else if u2 <= 0.0 {
            if (c - v2).length_squared() > r * r { return None; }
            ((c - v2).normalize_or_zero(), v2)
        } else {
            (norms[best], c - norms[best] * separation)
        }
    };
    if ln == Vec2::ZERO { return None; }

    let dist = (c - lp).dot(ln);
    let normal = xf.transform_vector(ln);
    let pa = xf.transform_point(lp);
    let pb = center_w - normal * r;
    Some(Manifold {
        normal,
        points: vec![ManifoldPoint { point: (pa + pb) * 0.5, depth: r - dist, id: best as u32 }],
    })
}

struct WorldPoly { v: Vec<Vec2>, n: Vec<Vec2> }

fn to_world(p: &Polygon, xf: &Isometry) -> WorldPoly {
    WorldPoly {
        v: p.vertices().iter().map(|&v| xf.transform_point(v)).collect(),
        n: p.normals().iter().map(|&n| xf.transform_vector(n)).collect(),
    }
}

/// Largest separation of `b` along the edge normals of `a`.
fn max_separation(a: &WorldPoly, b: &WorldPoly) -> (usize, f32) {
    let mut best = (0usize, f32::MIN);
    for (i, (&n, &v)) in a.n.iter().zip(a.v.iter()).enumerate() {
        let s = b.v.iter().map(|&w| n.dot(w - v)).fold(f32::MAX, f32::min);
        if s > best.1 { best = (i, s); }
    }
    best
}

#[derive(Copy, Clone)]
struct ClipVertex { v: Vec2, id: u32 }

fn clip_segment(input: [ClipVertex; 2], normal: Vec2, offset: f32, clip_id: u32) -> Option<[ClipVertex; 2]> {
    let d0 = normal.dot(input[0].v) - offset;
    let d1 = normal.dot(input[1].v) - offset;
    let mut out: Vec<ClipVertex> = Vec::with_capacity(2);
    if d0 <= 0.0 { out.push(input[0]); }
    if d1 <= 0.0 { out.push(input[1]); }
    if d0 * d1 < 0.0 {
        let t = d0 / (d0 - d1);
        out.push(ClipVertex { v: input[0].v + (input[1].v - input[0].v) * t, id: clip_id });
    }
    if out.len() < 2 { return None; }
    Some([out[0], out[1]])
}

fn polygon_polygon(pa: &Polygon, xa: &Isometry, pb: &Polygon, xb: &Isometry) -> Option<Manifold> {
    if pa.len() < 3 || pb.len() < 3 { return None; }
    let wa = to_world(pa, xa);
    let wb = to_world(pb, xb);

    let (edge_a, sep_a) = max_separation(&wa, &wb);
    if sep_a > 0.0 { return None; }
    let (edge_b, sep_b) = max_separation(&wb, &wa);
    if sep_b > 0.0 { return None; }

    // prefer A as reference unless B is clearly better (stable feature choice)
    const K_TOL: f32 = 0.1 * 0.005;
    let (reff, inc, edge, flip) = if sep_b > sep_a + K_TOL {
        (&wb, &wa, edge_b, true)
    } else {
        (&wa, &wb, edge_a, false)
    };

    let rn = reff.n[edge];
    // incident edge: most anti-parallel normal
    let mut inc_edge = 0usize;
    let mut min_dot = f32::MAX;
    for (i, &n) in inc.n.iter().enumerate() {
        let d = rn.dot(n);
        if d < min_dot { min_dot = d; inc_edge = i; }
    }
    let ni = inc.v.len();
    let incident = [
        ClipVertex { v: inc.v[inc_edge], id: inc_edge as u32 },
        ClipVertex { v: inc.v[(inc_edge + 1) % ni], id: ((inc_edge + 1) % ni) as u32 },
    ];

    let nr = reff.v.len();
    let v1 = reff.v[edge];
    let v2 = reff.v[(edge + 1) % nr];
    let tangent = (v2 - v1).normalize_or_zero();
    let normal = Vec2::new(tangent.y, -tangent.x);
    let front = normal.dot(v1);
    let side1 = -tangent.dot(v1);
    let side2 = tangent.dot(v2);

    let clip1 = clip_segment(incident, -tangent, side1, 0x80 | edge as u32)?;
    let clip2 = clip_segment(clip1, tangent, side2, 0x80 | ((edge + 1) % nr) as u32)?;

    let tag = ((flip as u32) << 16) | ((edge as u32) << 8);
    let mut points = Vec::with_capacity(2);
    for cv in clip2 {
        let separation = normal.dot(cv.v) - front;
        if separation <= 0.0 {
            points.push(ManifoldPoint {
                point: cv.v - normal * (separation * 0.5),
                depth: -separation,
                id: tag | cv.id,
            });
        }
    }
    if points.is_empty() { return None; }

    Some(Manifold { normal: if flip { -normal } else { normal }, points })
}
