mod error;
mod events;
mod settings;
mod solver;

pub use error::WorldError;
pub use events::{ContactPoint, PostSolve, PostSolveListener, Subscriptions};
pub use settings::{DebugSettings, WorldSettings};

pub use breakphys_dynamics::{BodyDesc, MotionType, UserData};

use std::collections::BTreeMap;

use breakphys_collision::{collide, pairs_sap};
use breakphys_core::{
    hash_iso, hash_vec2, schedule_digest, BodyId, ColliderId, Isometry, Scalar, StepHasher,
    StepStage, StepStats, SubscriptionId, Vec2, Velocity, XorShift64,
};
use breakphys_dynamics::Bodies;
use breakphys_geom::{aabb_of, Aabb, MassData, Material, Shape};
use tracing::debug;

use crate::solver::{ContactConstraint, WarmImp, WarmKey};

const CCD_MAX_MARGIN: f32 = 0.25; // expand AABBs by min(|v|*dt, CCD_MAX_MARGIN)

/* ---------------- Fixtures ---------------- */

/// What to attach to a body.
#[derive(Clone, Debug)]
pub struct FixtureDesc {
    pub shape: Shape,
    pub material: Material,
    pub user_data: Option<UserData>,
}

impl FixtureDesc {
    pub fn new(shape: Shape, material: Material) -> Self { Self { shape, material, user_data: None } }
    pub fn with_user_data(mut self, ud: Option<UserData>) -> Self { self.user_data = ud; self }
}

/// A shape bound to one body.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub body: BodyId,
    pub shape: Shape,
    pub material: Material,
    /// Derived from `shape` and `material.density`, in the body frame.
    pub mass: MassData,
    pub aabb: Aabb,
    pub user_data: Option<UserData>,
}

impl Fixture {
    /// Descriptor that recreates this fixture (deep copy of the geometry) on another body.
    pub fn to_desc(&self) -> FixtureDesc {
        FixtureDesc { shape: self.shape.clone(), material: self.material, user_data: self.user_data }
    }
}

/* ---------------- Builder ---------------- */
pub struct WorldBuilder {
    pub bodies: usize,
    pub colliders: usize,
    pub settings: WorldSettings,
}

impl WorldBuilder {
    pub fn new() -> Self { Self { bodies: 128, colliders: 128, settings: WorldSettings::default() } }

    pub fn with_capacity(mut self, bodies: usize, colliders: usize) -> Self {
        self.bodies = bodies;
        self.colliders = colliders;
        self
    }

    pub fn with_settings(mut self, settings: WorldSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> World {
        World::with_capacity(self.bodies, self.colliders, self.settings)
    }
}

impl Default for WorldBuilder {
    fn default() -> Self { Self::new() }
}

/* ---------------- World ---------------- */
pub struct World {
    settings: WorldSettings,
    rng: XorShift64,
    schedule: Vec<StepStage>,

    bodies: Bodies,
    body_fixtures: Vec<Vec<ColliderId>>,
    fixtures: Vec<Option<Fixture>>,

    subs: Subscriptions,
    events: Vec<PostSolve>,

    tick: u64,
    debug: DebugSettings,
    warm_cache: BTreeMap<WarmKey, WarmImp>,
}

impl World {
    pub fn new(settings: WorldSettings) -> Self { Self::with_capacity(128, 128, settings) }

    pub fn with_capacity(bodies: usize, colliders: usize, settings: WorldSettings) -> Self {
        Self {
            rng: XorShift64::new(settings.rng_seed),
            settings,
            schedule: Vec::with_capacity(8),
            bodies: Bodies::with_capacity(bodies),
            body_fixtures: Vec::with_capacity(bodies),
            fixtures: Vec::with_capacity(colliders),
            subs: Subscriptions::default(),
            events: Vec::new(),
            tick: 0,
            debug: DebugSettings::default(),
            warm_cache: BTreeMap::new(),
        }
    }

    #[inline] pub fn settings(&self) -> &WorldSettings { &self.settings }
    #[inline] pub fn tick_index(&self) -> u64 { self.tick }
    #[inline] pub fn rng_mut(&mut self) -> &mut XorShift64 { &mut self.rng }
    pub fn set_gravity(&mut self, g: Vec2) { self.settings.gravity = g; }
    pub fn set_debug(&mut self, cfg: DebugSettings) { self.debug = cfg; }

    /* ---------- Bodies ---------- */

    pub fn create_body(&mut self, desc: BodyDesc) -> BodyId {
        let id = self.bodies.add(desc);
        self.body_fixtures.push(Vec::new());
        BodyId(id)
    }

    /// Destroys the body together with every fixture still attached to it.
    pub fn destroy_body(&mut self, id: BodyId) -> Result<(), WorldError> {
        self.check_body(id)?;
        let attached = std::mem::take(&mut self.body_fixtures[id.0 as usize]);
        for f in attached {
            self.fixtures[f.0 as usize] = None;
        }
        self.bodies.remove(id.0);
        self.warm_cache.clear();
        Ok(())
    }

    #[inline] pub fn is_body_alive(&self, id: BodyId) -> bool { self.bodies.is_alive(id.0) }
    #[inline] pub fn body_count(&self) -> usize { self.bodies.live_count() }
    pub fn bodies(&self) -> impl Iterator<Item = BodyId> + '_ { self.bodies.live_ids().map(BodyId) }

    pub fn body_pose(&self, id: BodyId) -> Result<Isometry, WorldError> {
        self.check_body(id)?;
        Ok(self.bodies.pose(id.0))
    }

    pub fn set_body_pose(&mut self, id: BodyId, pose: Isometry) -> Result<(), WorldError> {
        self.check_body(id)?;
        self.bodies.set_pose(id.0, pose);
        self.refresh_body_aabbs(id);
        Ok(())
    }

    pub fn body_vel(&self, id: BodyId) -> Result<Velocity, WorldError> {
        self.check_body(id)?;
        Ok(self.bodies.vel(id.0))
    }

    pub fn set_body_vel(&mut self, id: BodyId, vel: Velocity) -> Result<(), WorldError> {
        self.check_body(id)?;
        self.bodies.set_vel(id.0, vel);
        Ok(())
    }

    pub fn body_mass(&self, id: BodyId) -> Result<Scalar, WorldError> {
        self.check_body(id)?;
        Ok(self.bodies.mass_of(id.0))
    }

    pub fn body_world_center(&self, id: BodyId) -> Result<Vec2, WorldError> {
        self.check_body(id)?;
        Ok(self.bodies.world_center(id.0))
    }

    pub fn body_motion(&self, id: BodyId) -> Result<MotionType, WorldError> {
        self.check_body(id)?;
        Ok(self.bodies.motion_of(id.0))
    }

    pub fn body_user_data(&self, id: BodyId) -> Result<Option<UserData>, WorldError> {
        self.check_body(id)?;
        Ok(self.bodies.user_data(id.0))
    }

    /// Linear impulse through the center of mass.
    pub fn apply_linear_impulse(&mut self, id: BodyId, j: Vec2) -> Result<(), WorldError> {
        self.check_body(id)?;
        if !self.bodies.is_dynamic(id.0) {
            return Err(WorldError::StaticBodyImpulse(id));
        }
        self.bodies.apply_impulse(id.0, j);
        Ok(())
    }

    pub fn apply_impulse_at(&mut self, id: BodyId, j: Vec2, world_point: Vec2) -> Result<(), WorldError> {
        self.check_body(id)?;
        if !self.bodies.is_dynamic(id.0) {
            return Err(WorldError::StaticBodyImpulse(id));
        }
        self.bodies.apply_impulse_at(id.0, j, world_point);
        Ok(())
    }

    #[inline]
    fn check_body(&self, id: BodyId) -> Result<(), WorldError> {
        if self.bodies.is_alive(id.0) { Ok(()) } else { Err(WorldError::BodyNotFound(id)) }
    }

    /* ---------- Fixtures ---------- */

    pub fn create_fixture(&mut self, body: BodyId, desc: FixtureDesc) -> Result<ColliderId, WorldError> {
        self.check_body(body)?;
        let pose = self.bodies.pose(body.0);
        let fixture = Fixture {
            body,
            mass: desc.shape.mass_data(desc.material.density),
            aabb: aabb_of(&desc.shape, &pose),
            shape: desc.shape,
            material: desc.material,
            user_data: desc.user_data,
        };
        let id = ColliderId(self.fixtures.len() as u32);
        self.fixtures.push(Some(fixture));
        self.body_fixtures[body.0 as usize].push(id);
        self.refresh_mass(body);
        Ok(id)
    }

    /// Detaches and returns the fixture. The owning body survives with its mass recomputed.
    pub fn destroy_fixture(&mut self, id: ColliderId) -> Result<Fixture, WorldError> {
        let fixture = self
            .fixtures
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .ok_or(WorldError::FixtureNotFound(id))?;
        self.body_fixtures[fixture.body.0 as usize].retain(|&f| f != id);
        self.warm_cache.retain(|k, _| k.0 != id.0 && k.1 != id.0);
        self.refresh_mass(fixture.body);
        Ok(fixture)
    }

    #[inline]
    pub fn fixture(&self, id: ColliderId) -> Option<&Fixture> {
        self.fixtures.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn fixture_user_data(&self, id: ColliderId) -> Result<Option<UserData>, WorldError> {
        self.fixture(id).map(|f| f.user_data).ok_or(WorldError::FixtureNotFound(id))
    }

    #[inline] pub fn body_of(&self, id: ColliderId) -> Option<BodyId> { self.fixture(id).map(|f| f.body) }

    /// Fixtures attached to `body`, in creation order. Empty for dead bodies.
    pub fn fixtures_of(&self, body: BodyId) -> &[ColliderId] {
        if !self.bodies.is_alive(body.0) { return &[]; }
        self.body_fixtures.get(body.0 as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fixture_count(&self) -> usize { self.fixtures.iter().filter(|f| f.is_some()).count() }

    fn refresh_mass(&mut self, body: BodyId) {
        let parts: Vec<MassData> = self.body_fixtures[body.0 as usize]
            .iter()
            .filter_map(|f| self.fixtures[f.0 as usize].as_ref().map(|fx| fx.mass))
            .collect();
        self.bodies.set_mass_data(body.0, parts);
    }

    fn refresh_body_aabbs(&mut self, body: BodyId) {
        let pose = self.bodies.pose(body.0);
        for f in &self.body_fixtures[body.0 as usize] {
            if let Some(fx) = self.fixtures[f.0 as usize].as_mut() {
                fx.aabb = aabb_of(&fx.shape, &pose);
            }
        }
    }

    fn refresh_aabbs(&mut self) {
        for fx in self.fixtures.iter_mut().flatten() {
            let pose = self.bodies.pose(fx.body.0);
            fx.aabb = aabb_of(&fx.shape, &pose);
        }
    }

    /* ---------- Subscriptions ---------- */

    pub fn subscribe_post_solve(&mut self) -> SubscriptionId { self.subs.subscribe() }

    /// False if the subscription was not active.
    pub fn unsubscribe_post_solve(&mut self, id: SubscriptionId) -> bool { self.subs.unsubscribe(id) }

    #[inline] pub fn is_subscribed(&self, id: SubscriptionId) -> bool { self.subs.is_active(id) }

    /// Events produced by the most recent step, one per resolved contact.
    #[inline] pub fn last_post_solve(&self) -> &[PostSolve] { &self.events }

    /* ---------- Step ---------- */

    pub fn step(&mut self, dt: Scalar) -> StepStats { self.step_with(dt, &mut ()) }

    /// Advance one step, delivering every post-solve event to `listener` once per active subscription.
    pub fn step_with(&mut self, dt: Scalar, listener: &mut dyn PostSolveListener) -> StepStats {
        self.schedule.clear();
        self.tick = self.tick.wrapping_add(1);

        self.schedule.push(StepStage::UpdateAabbsPre);
        self.refresh_aabbs();

        // Broadphase (SAP) with speculative margin
        self.schedule.push(StepStage::BroadphaseSap);
        let mut slots: Vec<u32> = Vec::with_capacity(self.fixtures.len());
        let mut aabbs: Vec<Aabb> = Vec::with_capacity(self.fixtures.len());
        for (i, fx) in self.fixtures.iter().enumerate() {
            let Some(fx) = fx else { continue };
            let mut bb = fx.aabb;
            let speed = self.bodies.vel(fx.body.0).lin.length();
            let margin = (speed * dt).min(CCD_MAX_MARGIN);
            if margin > 0.0 { bb.expand_by(margin); }
            slots.push(i as u32);
            aabbs.push(bb);
        }
        let pairs = pairs_sap(&aabbs);

        // Narrowphase
        self.schedule.push(StepStage::Narrowphase);
        let mut contacts: Vec<ContactConstraint> = Vec::new();
        for &(i, j) in &pairs {
            let (ia, ib) = (slots[i], slots[j]);
            let (Some(fa), Some(fb)) = (self.fixture(ColliderId(ia)), self.fixture(ColliderId(ib))) else { continue };
            if fa.body == fb.body { continue; }
            if !self.bodies.is_dynamic(fa.body.0) && !self.bodies.is_dynamic(fb.body.0) { continue; }
            let xa = self.bodies.pose(fa.body.0);
            let xb = self.bodies.pose(fb.body.0);
            if let Some(m) = collide(&fa.shape, &xa, &fb.shape, &xb) {
                let (friction, restitution) = Material::mix(&fa.material, &fb.material);
                contacts.push(ContactConstraint::new(ia, ib, fa.body.0, fb.body.0, &m, friction, restitution));
            }
        }

        self.schedule.push(StepStage::IntegrateVelocities);
        self.bodies.integrate_velocities(self.settings.gravity, dt);

        self.schedule.push(StepStage::Solve);
        solver::prepare(&mut contacts, &self.bodies, &self.warm_cache, &self.settings, dt);
        if self.settings.warm_starting {
            solver::warm_start(&contacts, &mut self.bodies);
        }
        for _ in 0..self.settings.velocity_iterations {
            solver::solve_velocities(&mut contacts, &mut self.bodies);
        }
        self.warm_cache = solver::store_impulses(&contacts);

        self.schedule.push(StepStage::PostSolve);
        self.events = contacts.iter().map(|c| self.post_solve_event(c)).collect();
        let mut delivered = 0u32;
        for ev in &self.events {
            for &sub in self.subs.active() {
                listener.post_solve(sub, ev);
                delivered += 1;
            }
        }

        self.schedule.push(StepStage::IntegratePositions);
        self.bodies.integrate_positions(dt);

        self.schedule.push(StepStage::UpdateAabbsPost);
        self.refresh_aabbs();

        if self.debug.print_every != 0 && self.tick % u64::from(self.debug.print_every) == 0 {
            self.log_debug_block(&contacts);
        }

        StepStats { pairs_tested: pairs.len() as u32, contacts: contacts.len() as u32, events: delivered }
    }

    fn post_solve_event(&self, c: &ContactConstraint) -> PostSolve {
        let xa = self.bodies.pose(c.body_a);
        let xb = self.bodies.pose(c.body_b);
        PostSolve {
            fixture_a: ColliderId(c.a_collider),
            fixture_b: ColliderId(c.b_collider),
            body_a: BodyId(c.body_a),
            body_b: BodyId(c.body_b),
            normal: c.normal,
            points: c.points.iter().map(|p| ContactPoint {
                world_point: p.point,
                local_anchor_a: xa.inverse_transform_vector(p.r_a),
                local_anchor_b: xb.inverse_transform_vector(p.r_b),
                depth: p.depth,
                normal_impulse: p.jn,
                tangent_impulse: p.jt,
            }).collect(),
        }
    }

    pub fn step_hash(&self) -> [u8; 32] {
        let mut h = StepHasher::new();
        h.update_bytes(&self.tick.to_le_bytes());
        h.update_bytes(&self.rng.state().to_le_bytes());
        h.update_bytes(&schedule_digest(&self.schedule));
        for i in self.bodies.live_ids() {
            let pose = self.bodies.pose(i);
            let vel = self.bodies.vel(i);
            h.update_bytes(&i.to_le_bytes());
            hash_iso(&mut h, &pose);
            hash_vec2(&mut h, &vel.lin);
            h.update_bytes(&vel.ang.to_le_bytes());
        }
        h.finalize()
    }

    /* ---------- Debug ---------- */
    fn log_debug_block(&self, contacts: &[ContactConstraint]) {
        debug!(tick = self.tick, bodies = self.bodies.live_count(), contacts = contacts.len(), "world debug");

        if self.debug.show_bodies {
            for i in self.bodies.live_ids().take(self.debug.max_lines) {
                let p = self.bodies.pose(i);
                let v = self.bodies.vel(i);
                debug!("body {:3}  pos=({:+.3},{:+.3}) angle={:+.3}  vel=({:+.3},{:+.3}) w={:+.3}",
                       i, p.pos.x, p.pos.y, p.angle, v.lin.x, v.lin.y, v.ang);
            }
        }

        if self.debug.show_contacts {
            if contacts.is_empty() {
                debug!("contacts: (none)");
            }
            for c in contacts.iter().take(self.debug.max_lines) {
                let depth = c.points.iter().map(|p| p.depth).fold(0.0f32, f32::max);
                debug!("contact  cA={} cB={}  n=({:+.3},{:+.3})  points={} depth={:.5}",
                       c.a_collider, c.b_collider, c.normal.x, c.normal.y, c.points.len(), depth);
            }
        }

        if self.debug.show_events {
            for ev in self.events.iter().take(self.debug.max_lines) {
                let jn = ev.points.iter().map(|p| p.normal_impulse).fold(0.0f32, f32::max);
                debug!("post-solve {} x {}  max_jn={:.4}  subscribers={}",
                       ev.fixture_a, ev.fixture_b, jn, self.subs.len());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use breakphys_core::iso;

    fn ground_and_box(world: &mut World, y: f32) -> (BodyId, BodyId) {
        let boxy = world.create_body(BodyDesc::dynamic(iso(Vec2::new(0.0, y), 0.0)));
        world.create_fixture(boxy, FixtureDesc::new(Shape::rect(0.5, 0.5), Material::default())).unwrap();
        let ground = world.create_body(BodyDesc::fixed(Isometry::IDENTITY));
        world.create_fixture(ground, FixtureDesc::new(Shape::rect(10.0, 0.5), Material::default())).unwrap();
        (boxy, ground)
    }

    #[test] fn fixture_lifecycle_updates_mass() {
        let mut w = World::new(WorldSettings::default());
        let b = w.create_body(BodyDesc::dynamic(Isometry::IDENTITY));
        let f1 = w.create_fixture(b, FixtureDesc::new(Shape::rect(0.5, 0.5), Material::with_density(2.0))).unwrap();
        assert_relative_eq!(w.body_mass(b).unwrap(), 2.0);
        let f2 = w.create_fixture(b, FixtureDesc::new(Shape::rect(0.5, 0.5), Material::with_density(1.0))).unwrap();
        assert_relative_eq!(w.body_mass(b).unwrap(), 3.0);
        assert_eq!(w.fixtures_of(b), &[f1, f2]);

        let removed = w.destroy_fixture(f1).unwrap();
        assert_eq!(removed.body, b);
        assert_relative_eq!(w.body_mass(b).unwrap(), 1.0);
        assert!(w.is_body_alive(b));
        assert_eq!(w.destroy_fixture(f1).unwrap_err(), WorldError::FixtureNotFound(f1));
    }

    #[test] fn destroy_body_takes_fixtures_with_it() {
        let mut w = World::new(WorldSettings::default());
        let b = w.create_body(BodyDesc::dynamic(Isometry::IDENTITY));
        let f = w.create_fixture(b, FixtureDesc::new(Shape::circle(0.5), Material::default())).unwrap();
        w.destroy_body(b).unwrap();
        assert!(w.fixture(f).is_none());
        assert!(w.fixtures_of(b).is_empty());
        assert_eq!(w.destroy_body(b), Err(WorldError::BodyNotFound(b)));
        assert_eq!(w.body_pose(b), Err(WorldError::BodyNotFound(b)));
    }

    #[test] fn impulse_on_static_is_an_error() {
        let mut w = World::new(WorldSettings::default());
        let g = w.create_body(BodyDesc::fixed(Isometry::IDENTITY));
        assert_eq!(w.apply_linear_impulse(g, Vec2::X), Err(WorldError::StaticBodyImpulse(g)));
    }

    #[test] fn box_comes_to_rest_on_ground() {
        let mut w = World::new(WorldSettings::default());
        let (boxy, _) = ground_and_box(&mut w, 1.2);
        for _ in 0..180 { w.step(1.0 / 60.0); }
        let p = w.body_pose(boxy).unwrap();
        assert_relative_eq!(p.pos.y, 1.0, epsilon = 0.02);
        assert!(w.body_vel(boxy).unwrap().lin.length() < 0.05);
    }

    #[test] fn resting_contact_impulse_balances_gravity() {
        let mut w = World::new(WorldSettings::default());
        let (boxy, _) = ground_and_box(&mut w, 0.999);
        let dt = 1.0 / 60.0;
        for _ in 0..120 { w.step(dt); }
        let total: f32 = w.last_post_solve().iter()
            .flat_map(|e| e.points.iter())
            .map(|p| p.normal_impulse)
            .sum();
        let weight_impulse = w.body_mass(boxy).unwrap() * 9.81 * dt;
        assert_relative_eq!(total, weight_impulse, epsilon = weight_impulse * 0.1);
    }

    #[test] fn events_follow_subscriptions() {
        struct Count(u32);
        impl PostSolveListener for Count {
            fn post_solve(&mut self, _: SubscriptionId, _: &PostSolve) { self.0 += 1; }
        }
        let mut w = World::new(WorldSettings::default());
        ground_and_box(&mut w, 0.99);
        let mut count = Count(0);

        let s = w.step_with(1.0 / 60.0, &mut count);
        assert!(s.contacts > 0);
        assert_eq!(count.0, 0);

        let a = w.subscribe_post_solve();
        let _b = w.subscribe_post_solve();
        let s = w.step_with(1.0 / 60.0, &mut count);
        assert_eq!(s.events, 2 * s.contacts);
        assert_eq!(count.0, s.events);

        assert!(w.unsubscribe_post_solve(a));
        count.0 = 0;
        let s = w.step_with(1.0 / 60.0, &mut count);
        assert_eq!(count.0, s.contacts);
    }

    #[test] fn step_hash_is_deterministic() {
        let run = || {
            let mut w = World::new(WorldSettings::default());
            ground_and_box(&mut w, 2.0);
            for _ in 0..30 { w.step(1.0 / 60.0); }
            w.step_hash()
        };
        assert_eq!(run(), run());
    }
}
