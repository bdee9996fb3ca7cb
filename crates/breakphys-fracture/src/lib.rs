//! Breakable composite bodies.
//!
//! A [`BreakableBody`] is one dynamic body carrying several fixtures. It watches
//! post-solve contact events, and when a hit exceeds its strength it is split on
//! the following [`BreakableBody::update`] into one independent body per fixture.

mod breakable;
mod error;
mod part;
mod registry;
mod scene;

pub use breakable::{
    AnchorGate, BreakState, BreakableBody, BreakableDesc, Fracture, DEFAULT_STRENGTH,
};
pub use error::FractureError;
pub use part::BodyPart;
pub use registry::{BreakableKey, Breakables, Failed, Fractured, RegistryUpdate};
pub use scene::{FractureScene, TickReport};
