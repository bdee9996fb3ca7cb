use breakphys_core::{BodyId, ColliderId};
use breakphys_world::WorldError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FractureError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("composite body {0} was removed from the world before it could break")]
    MainBodyMissing(BodyId),
    #[error("part fixture {0} no longer belongs to the composite body")]
    PartDetached(ColliderId),
    #[error("break strength must be positive and finite, got {0}")]
    InvalidStrength(f32),
}
