use std::collections::BTreeMap;

use breakphys_core::SubscriptionId;
use breakphys_world::{PostSolve, PostSolveListener, World};
use tracing::{trace, warn};

use crate::breakable::{BreakableBody, Fracture};
use crate::error::FractureError;

/// Stable handle of a breakable inside a [`Breakables`] registry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BreakableKey(pub u32);

/// A breakable that broke this tick, moved out of the live set.
#[derive(Debug)]
pub struct Fractured {
    pub key: BreakableKey,
    pub breakable: BreakableBody,
    pub fracture: Fracture,
}

/// A breakable whose tick handler failed, moved out of the live set unchanged.
#[derive(Debug)]
pub struct Failed {
    pub key: BreakableKey,
    pub breakable: BreakableBody,
    pub error: FractureError,
}

/// Outcome of one [`Breakables::update`].
#[derive(Debug, Default)]
pub struct RegistryUpdate {
    pub fractured: Vec<Fractured>,
    pub failed: Vec<Failed>,
}

/// Live breakables, routing post-solve events to the instance that owns each subscription.
#[derive(Debug, Default)]
pub struct Breakables {
    slots: Vec<Option<BreakableBody>>,
    routes: BTreeMap<SubscriptionId, usize>,
}

impl Breakables {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, b: BreakableBody) -> BreakableKey {
        let idx = self.slots.len();
        if let Some(sub) = b.subscription() {
            self.routes.insert(sub, idx);
        }
        self.slots.push(Some(b));
        BreakableKey(idx as u32)
    }

    #[inline]
    pub fn get(&self, key: BreakableKey) -> Option<&BreakableBody> {
        self.slots.get(key.0 as usize).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, key: BreakableKey) -> Option<&mut BreakableBody> {
        self.slots.get_mut(key.0 as usize).and_then(Option::as_mut)
    }

    /// Live (not yet broken) instances.
    pub fn len(&self) -> usize { self.slots.iter().filter(|s| s.is_some()).count() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn iter(&self) -> impl Iterator<Item = (BreakableKey, &BreakableBody)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|b| (BreakableKey(i as u32), b)))
    }

    /// Tick every live breakable in insertion order.
    ///
    /// Instances that broke, and instances whose handler returned an error, leave the live set
    /// and are handed back. One failure never stops the others from ticking.
    pub fn update(&mut self, world: &mut World) -> RegistryUpdate {
        let mut out = RegistryUpdate::default();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let Some(b) = slot.as_mut() else { continue };
            let key = BreakableKey(i as u32);
            let sub = b.subscription();
            let result = b.update(world);
            if matches!(result, Ok(None)) {
                continue;
            }

            if let Some(sub) = sub {
                self.routes.remove(&sub);
            }
            let Some(breakable) = slot.take() else { continue };
            match result {
                Ok(Some(fracture)) => out.fractured.push(Fractured { key, breakable, fracture }),
                Err(error) => {
                    warn!(key = key.0, %error, "breakable dropped from the registry");
                    out.failed.push(Failed { key, breakable, error });
                }
                Ok(None) => {}
            }
        }
        out
    }
}

impl PostSolveListener for Breakables {
    fn post_solve(&mut self, sub: SubscriptionId, contact: &PostSolve) {
        let Some(&idx) = self.routes.get(&sub) else {
            trace!(%sub, "post-solve for a subscription this registry does not own");
            return;
        };
        if let Some(b) = self.slots.get_mut(idx).and_then(Option::as_mut) {
            b.post_solve(sub, contact);
        }
    }
}
