use breakphys_core::{BodyId, ColliderId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("{0} does not exist or was destroyed")]
    BodyNotFound(BodyId),
    #[error("{0} does not exist or was destroyed")]
    FixtureNotFound(ColliderId),
    #[error("cannot apply an impulse to non-dynamic {0}")]
    StaticBodyImpulse(BodyId),
}
