//! Sequential-impulse contact solver with accumulated impulses and warm starting.

use std::collections::BTreeMap;

use breakphys_collision::Manifold;
use breakphys_core::types::{cross, cross_sv, Vec2, Velocity};
use breakphys_core::Scalar;
use breakphys_dynamics::Bodies;

use crate::settings::WorldSettings;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) struct WarmImp { pub jn: f32, pub jt: f32 }

/// (collider a, collider b, manifold feature id)
pub(crate) type WarmKey = (u32, u32, u32);

#[derive(Clone, Debug)]
pub(crate) struct PointConstraint {
    pub id: u32,
    pub point: Vec2,
    pub depth: Scalar,
    pub r_a: Vec2,
    pub r_b: Vec2,
    normal_mass: Scalar,
    tangent_mass: Scalar,
    bias: Scalar,
    pub jn: Scalar,
    pub jt: Scalar,
}

#[derive(Clone, Debug)]
pub(crate) struct ContactConstraint {
    pub a_collider: u32,
    pub b_collider: u32,
    pub body_a: u32,
    pub body_b: u32,
    /// A -> B
    pub normal: Vec2,
    pub friction: Scalar,
    pub restitution: Scalar,
    pub points: Vec<PointConstraint>,
}

impl ContactConstraint {
    pub fn new(
        a_collider: u32, b_collider: u32, body_a: u32, body_b: u32,
        m: &Manifold, friction: Scalar, restitution: Scalar,
    ) -> Self {
        let points = m.points.iter().map(|p| PointConstraint {
            id: p.id, point: p.point, depth: p.depth,
            r_a: Vec2::ZERO, r_b: Vec2::ZERO,
            normal_mass: 0.0, tangent_mass: 0.0, bias: 0.0,
            jn: 0.0, jt: 0.0,
        }).collect();
        Self { a_collider, b_collider, body_a, body_b, normal: m.normal, friction, restitution, points }
    }

    #[inline] pub fn tangent(&self) -> Vec2 { Vec2::new(self.normal.y, -self.normal.x) }

    #[inline] pub fn key(&self, id: u32) -> WarmKey { (self.a_collider, self.b_collider, id) }
}

#[inline]
fn point_velocity(v: &Velocity, r: Vec2) -> Vec2 { v.lin + cross_sv(v.ang, r) }

fn apply_pair(bodies: &mut Bodies, c: &ContactConstraint, r_a: Vec2, r_b: Vec2, p: Vec2) {
    let (a, b) = (c.body_a, c.body_b);
    let (ima, iia) = (bodies.inv_mass_of(a), bodies.inv_inertia_of(a));
    let (imb, iib) = (bodies.inv_mass_of(b), bodies.inv_inertia_of(b));

    if ima != 0.0 || iia != 0.0 {
        let mut va = bodies.vel(a);
        va.lin -= p * ima;
        va.ang -= iia * cross(r_a, p);
        bodies.set_vel(a, va);
    }
    if imb != 0.0 || iib != 0.0 {
        let mut vb = bodies.vel(b);
        vb.lin += p * imb;
        vb.ang += iib * cross(r_b, p);
        bodies.set_vel(b, vb);
    }
}

/// Anchors, effective masses and velocity bias. Pulls cached impulses when warm starting.
pub(crate) fn prepare(
    contacts: &mut [ContactConstraint],
    bodies: &Bodies,
    cache: &BTreeMap<WarmKey, WarmImp>,
    s: &WorldSettings,
    dt: Scalar,
) {
    let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };
    for c in contacts.iter_mut() {
        let (a, b) = (c.body_a, c.body_b);
        let (ca, cb) = (bodies.world_center(a), bodies.world_center(b));
        let (ima, iia) = (bodies.inv_mass_of(a), bodies.inv_inertia_of(a));
        let (imb, iib) = (bodies.inv_mass_of(b), bodies.inv_inertia_of(b));
        let (va, vb) = (bodies.vel(a), bodies.vel(b));
        let n = c.normal;
        let t = c.tangent();

        for i in 0..c.points.len() {
            let key = c.key(c.points[i].id);
            let p = &mut c.points[i];
            p.r_a = p.point - ca;
            p.r_b = p.point - cb;

            let rna = cross(p.r_a, n);
            let rnb = cross(p.r_b, n);
            let kn = ima + imb + iia * rna * rna + iib * rnb * rnb;
            p.normal_mass = if kn > 0.0 { 1.0 / kn } else { 0.0 };

            let rta = cross(p.r_a, t);
            let rtb = cross(p.r_b, t);
            let kt = ima + imb + iia * rta * rta + iib * rtb * rtb;
            p.tangent_mass = if kt > 0.0 { 1.0 / kt } else { 0.0 };

            let vn = (point_velocity(&vb, p.r_b) - point_velocity(&va, p.r_a)).dot(n);
            let position_bias = s.baumgarte * inv_dt * (p.depth - s.slop).max(0.0);
            let bounce = if vn < -s.restitution_threshold { -c.restitution * vn } else { 0.0 };
            p.bias = position_bias.max(bounce);

            let w = if s.warm_starting { cache.get(&key).copied().unwrap_or_default() } else { WarmImp::default() };
            p.jn = w.jn;
            p.jt = w.jt;
        }
    }
}

pub(crate) fn warm_start(contacts: &[ContactConstraint], bodies: &mut Bodies) {
    for c in contacts {
        let t = c.tangent();
        for p in &c.points {
            if p.jn == 0.0 && p.jt == 0.0 { continue; }
            apply_pair(bodies, c, p.r_a, p.r_b, c.normal * p.jn + t * p.jt);
        }
    }
}

/// One pass over every contact: friction first, then the normal (so the friction cone uses the latest jn next pass).
pub(crate) fn solve_velocities(contacts: &mut [ContactConstraint], bodies: &mut Bodies) {
    for c in contacts.iter_mut() {
        let n = c.normal;
        let t = c.tangent();
        for i in 0..c.points.len() {
            // friction
            let (r_a, r_b) = (c.points[i].r_a, c.points[i].r_b);
            let dv = point_velocity(&bodies.vel(c.body_b), r_b) - point_velocity(&bodies.vel(c.body_a), r_a);
            let vt = dv.dot(t);
            let p = &mut c.points[i];
            let max_f = c.friction * p.jn;
            let new_jt = (p.jt - p.tangent_mass * vt).clamp(-max_f, max_f);
            let dj = new_jt - p.jt;
            p.jt = new_jt;
            apply_pair(bodies, c, r_a, r_b, t * dj);

            // normal
            let dv = point_velocity(&bodies.vel(c.body_b), r_b) - point_velocity(&bodies.vel(c.body_a), r_a);
            let vn = dv.dot(n);
            let p = &mut c.points[i];
            let new_jn = (p.jn - p.normal_mass * (vn - p.bias)).max(0.0);
            let dj = new_jn - p.jn;
            p.jn = new_jn;
            apply_pair(bodies, c, r_a, r_b, n * dj);
        }
    }
}

pub(crate) fn store_impulses(contacts: &[ContactConstraint]) -> BTreeMap<WarmKey, WarmImp> {
    let mut cache = BTreeMap::new();
    for c in contacts {
        for p in &c.points {
            cache.insert(c.key(p.id), WarmImp { jn: p.jn, jt: p.jt });
        }
    }
    cache
}
