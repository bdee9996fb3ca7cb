use breakphys_core::{BodyId, Isometry, SubscriptionId, Vec2, Velocity};
use breakphys_geom::{Material, Shape};
use breakphys_world::{
    BodyDesc, FixtureDesc, MotionType, PostSolve, PostSolveListener, UserData, World, WorldError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use crate::error::FractureError;
use crate::part::BodyPart;

pub const DEFAULT_STRENGTH: f32 = 500.0;

/// Which contacts are allowed to break a body, on top of the impulse threshold.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum AnchorGate {
    /// Some manifold point must sit below the center of mass of fixture A's body,
    /// measured along that body's local up axis.
    #[default]
    BelowCenter,
    /// Impulse alone decides.
    Any,
}

impl AnchorGate {
    fn admits(self, contact: &PostSolve) -> bool {
        match self {
            AnchorGate::BelowCenter => contact.points.iter().any(|p| p.local_anchor_a.y < 0.0),
            AnchorGate::Any => true,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BreakState {
    Intact,
    PendingBreak,
    Broken,
}

/// What one decomposition produced.
#[derive(Clone, Debug)]
pub struct Fracture {
    /// The composite body, already destroyed.
    pub main_body: BodyId,
    /// One new body per part, in part order.
    pub fragments: Vec<BodyId>,
    /// Linear impulse applied to every fragment.
    pub impulse: Vec2,
    /// The contact that flagged the break. `None` for a manual break.
    pub trigger: Option<PostSolve>,
}

/// Construction parameters besides geometry.
#[derive(Copy, Clone, Debug)]
pub struct BreakableDesc {
    pub pose: Isometry,
    pub strength: f32,
    pub anchor_gate: AnchorGate,
    /// Carried by the composite body and later by every fragment body.
    pub user_data: Option<UserData>,
}

impl Default for BreakableDesc {
    fn default() -> Self {
        Self { pose: Isometry::IDENTITY, strength: DEFAULT_STRENGTH, anchor_gate: AnchorGate::default(), user_data: None }
    }
}

impl BreakableDesc {
    pub fn at(pose: Isometry) -> Self { Self { pose, ..Self::default() } }

    /// Create the composite body with one fixture per descriptor, in order, and subscribe to post-solve events.
    pub fn build<I>(self, world: &mut World, fixtures: I) -> Result<BreakableBody, FractureError>
    where
        I: IntoIterator<Item = FixtureDesc>,
    {
        check_strength(self.strength)?;
        let main_body = world.create_body(BodyDesc {
            pose: self.pose,
            vel: Velocity::default(),
            motion: MotionType::Dynamic,
            user_data: self.user_data,
        });

        let mut parts = Vec::new();
        for desc in fixtures {
            let fixture = world.create_fixture(main_body, desc)?;
            let life = world.rng_mut().range_f32(1.0, 5.0);
            parts.push(BodyPart::new(fixture, main_body, life));
        }
        let subscription = world.subscribe_post_solve();

        Ok(BreakableBody {
            main_body,
            parts,
            strength: self.strength,
            anchor_gate: self.anchor_gate,
            broken: false,
            pending_break: false,
            contact_vector: Vec2::ZERO,
            trigger: None,
            subscription: Some(subscription),
            lin_cache: Vec::new(),
            ang_cache: Vec::new(),
        })
    }
}

fn check_strength(s: f32) -> Result<(), FractureError> {
    if s > 0.0 && s.is_finite() { Ok(()) } else { Err(FractureError::InvalidStrength(s)) }
}

/// A dynamic body made of several fixtures that splits into one body per fixture
/// when it takes a hard enough hit.
///
/// Contact inspection happens in [`BreakableBody::post_solve`] while the world is
/// stepping and only records intent. The structural change happens in
/// [`BreakableBody::update`], which must run once per tick after the step.
#[derive(Debug)]
pub struct BreakableBody {
    main_body: BodyId,
    parts: Vec<BodyPart>,
    strength: f32,
    anchor_gate: AnchorGate,
    broken: bool,
    pending_break: bool,
    contact_vector: Vec2,
    trigger: Option<PostSolve>,
    subscription: Option<SubscriptionId>,
    // indexed by part position; grow-only
    lin_cache: Vec<Vec2>,
    ang_cache: Vec<f32>,
}

impl BreakableBody {
    /// One convex polygon fixture per vertex loop, all with the same density.
    pub fn from_vertices(
        world: &mut World,
        pose: Isometry,
        loops: &[Vec<Vec2>],
        density: f32,
    ) -> Result<Self, FractureError> {
        let material = Material::with_density(density);
        BreakableDesc::at(pose).build(
            world,
            loops.iter().map(|l| FixtureDesc::new(Shape::polygon(l.clone()), material)),
        )
    }

    /// One fixture per shape, all with the given material.
    pub fn from_shapes<I>(world: &mut World, pose: Isometry, shapes: I, material: Material) -> Result<Self, FractureError>
    where
        I: IntoIterator<Item = Shape>,
    {
        BreakableDesc::at(pose).build(world, shapes.into_iter().map(|s| FixtureDesc::new(s, material)))
    }

    #[inline] pub fn main_body(&self) -> BodyId { self.main_body }
    #[inline] pub fn parts(&self) -> &[BodyPart] { &self.parts }
    #[inline] pub fn strength(&self) -> f32 { self.strength }
    #[inline] pub fn anchor_gate(&self) -> AnchorGate { self.anchor_gate }
    #[inline] pub fn is_broken(&self) -> bool { self.broken }
    #[inline] pub fn is_pending(&self) -> bool { self.pending_break }
    #[inline] pub fn contact_vector(&self) -> Vec2 { self.contact_vector }
    #[inline] pub fn trigger(&self) -> Option<&PostSolve> { self.trigger.as_ref() }
    /// `None` once the body has broken.
    #[inline] pub fn subscription(&self) -> Option<SubscriptionId> { self.subscription }
    #[inline] pub fn cached_velocities(&self) -> (&[Vec2], &[f32]) { (&self.lin_cache, &self.ang_cache) }

    pub fn state(&self) -> BreakState {
        if self.broken {
            BreakState::Broken
        } else if self.pending_break {
            BreakState::PendingBreak
        } else {
            BreakState::Intact
        }
    }

    pub fn set_strength(&mut self, strength: f32) -> Result<(), FractureError> {
        check_strength(strength)?;
        self.strength = strength;
        Ok(())
    }

    pub fn set_anchor_gate(&mut self, gate: AnchorGate) { self.anchor_gate = gate; }

    /// Break on the next `update`, whatever the contact history.
    pub fn break_now(&mut self) {
        self.pending_break = true;
    }

    fn owns(&self, contact: &PostSolve) -> bool {
        self.parts.iter().any(|p| contact.involves_fixture(p.fixture))
    }

    /// Post-solve hook. Never touches the world.
    pub fn post_solve(&mut self, sub: SubscriptionId, contact: &PostSolve) {
        if self.broken || self.subscription != Some(sub) {
            return;
        }
        if !self.owns(contact) {
            return;
        }

        let max_impulse = contact.points.iter().map(|p| p.normal_impulse).fold(0.0f32, f32::max);
        if !self.anchor_gate.admits(contact) || max_impulse <= self.strength {
            return;
        }

        self.pending_break = true;
        self.contact_vector = contact.normal * (max_impulse * 0.5);
        self.trigger = Some(contact.clone());
        trace!(
            body = %self.main_body, impulse = max_impulse, strength = self.strength,
            a = %contact.fixture_a, b = %contact.fixture_b,
            "break flagged"
        );
    }

    /// Per-tick handler. Runs a pending break, then snapshots part velocities while still intact.
    pub fn update(&mut self, world: &mut World) -> Result<Option<Fracture>, FractureError> {
        let mut fracture = None;
        if self.pending_break && !self.broken {
            fracture = Some(self.decompose(world)?);
            self.broken = true;
        }
        self.pending_break = false;

        if !self.broken {
            self.refresh_velocity_cache(world)?;
        }
        Ok(fracture)
    }

    fn refresh_velocity_cache(&mut self, world: &World) -> Result<(), FractureError> {
        let n = self.parts.len();
        if n > self.lin_cache.len() {
            self.lin_cache = vec![Vec2::ZERO; n];
            self.ang_cache = vec![0.0; n];
        }
        for (i, part) in self.parts.iter().enumerate() {
            let body = world.body_of(part.fixture).ok_or(WorldError::FixtureNotFound(part.fixture))?;
            let v = world.body_vel(body)?;
            self.lin_cache[i] = v.lin;
            self.ang_cache[i] = v.ang;
        }
        Ok(())
    }

    fn decompose(&mut self, world: &mut World) -> Result<Fracture, FractureError> {
        if !world.is_body_alive(self.main_body) {
            warn!(body = %self.main_body, "breakable lost its composite body");
            return Err(FractureError::MainBodyMissing(self.main_body));
        }
        // broke before any tick snapshot was taken
        if self.lin_cache.len() < self.parts.len() {
            self.refresh_velocity_cache(world)?;
        }

        // nothing is touched until every part is known to still sit on the composite body
        let mut descs = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            let fixture = world.fixture(part.fixture).ok_or(WorldError::FixtureNotFound(part.fixture))?;
            if fixture.body != self.main_body {
                warn!(body = %self.main_body, fixture = %part.fixture, "part moved off the composite body");
                return Err(FractureError::PartDetached(part.fixture));
            }
            descs.push(fixture.to_desc());
        }
        let pose = world.body_pose(self.main_body)?;
        let body_data = world.body_user_data(self.main_body)?;
        let impulse = self.contact_vector;

        if let Some(sub) = self.subscription.take() {
            world.unsubscribe_post_solve(sub);
        }

        let mut fragments = Vec::with_capacity(self.parts.len());
        for ((i, part), desc) in self.parts.iter_mut().enumerate().zip(descs) {
            world.destroy_fixture(part.fixture)?;

            let body = world.create_body(BodyDesc {
                pose,
                vel: Velocity::default(),
                motion: MotionType::Dynamic,
                user_data: body_data,
            });
            let fixture = world.create_fixture(body, desc)?;
            world.set_body_vel(body, Velocity { lin: self.lin_cache[i], ang: self.ang_cache[i] })?;
            world.apply_linear_impulse(body, impulse)?;

            part.body = body;
            part.fixture = fixture;
            fragments.push(body);
        }

        world.destroy_body(self.main_body)?;
        info!(
            body = %self.main_body, fragments = fragments.len(),
            impulse_x = impulse.x, impulse_y = impulse.y,
            "breakable body fractured"
        );

        Ok(Fracture { main_body: self.main_body, fragments, impulse, trigger: self.trigger.clone() })
    }
}

impl PostSolveListener for BreakableBody {
    fn post_solve(&mut self, sub: SubscriptionId, contact: &PostSolve) {
        BreakableBody::post_solve(self, sub, contact);
    }
}
