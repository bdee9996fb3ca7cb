//! Post-solve contact events and the subscription table that gates their delivery.

use breakphys_core::{BodyId, ColliderId, SubscriptionId, Vec2};

/// Solver result for one manifold point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactPoint {
    pub world_point: Vec2,
    /// Offset from body A's center of mass, in body A's frame.
    pub local_anchor_a: Vec2,
    /// Offset from body B's center of mass, in body B's frame.
    pub local_anchor_b: Vec2,
    pub depth: f32,
    /// Accumulated normal impulse after the final solver iteration.
    pub normal_impulse: f32,
    pub tangent_impulse: f32,
}

/// One resolved contact between two fixtures, reported once per step.
#[derive(Clone, Debug, PartialEq)]
pub struct PostSolve {
    pub fixture_a: ColliderId,
    pub fixture_b: ColliderId,
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// World-space normal pointing from A to B.
    pub normal: Vec2,
    pub points: Vec<ContactPoint>,
}

impl PostSolve {
    #[inline] pub fn involves_fixture(&self, f: ColliderId) -> bool { self.fixture_a == f || self.fixture_b == f }
    #[inline] pub fn involves_body(&self, b: BodyId) -> bool { self.body_a == b || self.body_b == b }
}

/// Receives post-solve events during `World::step_with`.
///
/// The world is mutably borrowed for the whole step, so a listener can record
/// what it sees but has no way to create or destroy bodies while the solver runs.
pub trait PostSolveListener {
    fn post_solve(&mut self, sub: SubscriptionId, contact: &PostSolve);
}

impl PostSolveListener for () {
    fn post_solve(&mut self, _sub: SubscriptionId, _contact: &PostSolve) {}
}

/// Active post-solve subscriptions in creation order. Ids are never reused.
#[derive(Debug, Default)]
pub struct Subscriptions {
    next: u32,
    active: Vec<SubscriptionId>,
}

impl Subscriptions {
    pub fn subscribe(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next);
        self.next += 1;
        self.active.push(id);
        id
    }

    /// False if `id` was never issued or is already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        match self.active.binary_search(&id) {
            Ok(i) => { self.active.remove(i); true }
            Err(_) => false,
        }
    }

    #[inline] pub fn is_active(&self, id: SubscriptionId) -> bool { self.active.binary_search(&id).is_ok() }
    #[inline] pub fn active(&self) -> &[SubscriptionId] { &self.active }
    #[inline] pub fn len(&self) -> usize { self.active.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.active.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test] fn ids_are_fresh_after_unsubscribe() {
        let mut s = Subscriptions::default();
        let a = s.subscribe();
        let b = s.subscribe();
        assert!(s.unsubscribe(a));
        assert!(!s.unsubscribe(a));
        let c = s.subscribe();
        assert_ne!(c, a);
        assert_eq!(s.active(), &[b, c]);
    }

    #[test] fn unknown_id_is_rejected() {
        let mut s = Subscriptions::default();
        assert!(!s.unsubscribe(SubscriptionId(7)));
        assert!(s.is_empty());
    }
}
