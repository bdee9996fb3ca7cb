use breakphys_core::{BodyId, ColliderId};

/// One piece of a breakable: the fixture it is made of and the body that currently owns it.
///
/// Before the break every part points at the composite body. Afterwards each one
/// points at its own fragment body and the fixture recreated on it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BodyPart {
    pub fixture: ColliderId,
    pub body: BodyId,
    /// Random lifetime in [1, 5), drawn from the world rng. Nothing consumes it yet.
    pub life: f32,
    pub destroying: bool,
}

impl BodyPart {
    pub fn new(fixture: ColliderId, body: BodyId, life: f32) -> Self {
        Self { fixture, body, life, destroying: false }
    }
}
