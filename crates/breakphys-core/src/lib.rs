pub mod ids;
pub mod types;
pub mod hash;
pub mod time;
pub mod schedule;
pub mod rng;

/// Engine-wide float type.
pub type Scalar = f32;

pub use ids::{BodyId, ColliderId, SubscriptionId};
pub use types::{Vec2, Isometry, Velocity, vec2, iso, cross, cross_sv, cross_vs};
pub use hash::{StepHasher, hash_vec2, hash_iso};
pub use time::StepStats;
pub use schedule::{StepStage, schedule_digest};
pub use rng::XorShift64;
