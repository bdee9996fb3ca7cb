pub mod aabb;
pub mod shape;
pub mod mass;

pub use aabb::Aabb;
pub use shape::{Shape, Polygon, aabb_of};
pub use mass::{MassData, Material};
