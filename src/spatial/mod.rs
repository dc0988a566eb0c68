pub mod gridref;
pub mod resolver;

pub use resolver::{PathEstimate, SpaceRequest, SpatialResolver};
